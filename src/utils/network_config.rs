//! Network Configuration
//!
//! Node endpoint list and client tuning, loaded from JSON:
//!
//! ```json
//! {
//!   "endpoints": [{ "host": "electrum1.example.org", "port": 50001 }],
//!   "max_retries": 3,
//!   "retry_delay_ms": 1000,
//!   "request_timeout_ms": 10000,
//!   "call_timeout_ms": 60000
//! }
//! ```
//!
//! Every field except `endpoints` has a default.

use crate::error::{LanaError, LanaResult};
use crate::types::NodeEndpoint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Tried in order on every call
    #[serde(default)]
    pub endpoints: Vec<NodeEndpoint>,
    /// Full sweeps over the endpoint list before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause between sweeps
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-connection budget (connect, write, read one line)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Budget for a whole `call`, retries included
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Longest response line accepted from a server
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub utxo_cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub utxo_cache_capacity: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_call_timeout_ms() -> u64 {
    60_000
}

fn default_max_response_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    256
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            utxo_cache_ttl_secs: default_cache_ttl_secs(),
            utxo_cache_capacity: default_cache_capacity(),
        }
    }
}

impl NetworkConfig {
    pub fn with_endpoints(endpoints: Vec<NodeEndpoint>) -> Self {
        Self {
            endpoints,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> LanaResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LanaError::config_error(format!("Invalid network config: {}", e)))
    }

    /// Read and parse a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> LanaResult<Self> {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            LanaError::config_error(format!(
                "Cannot read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Endpoints from the request take precedence over configured ones
    pub fn overridden_by(&self, endpoints: &[NodeEndpoint]) -> Self {
        if endpoints.is_empty() {
            return self.clone();
        }
        Self {
            endpoints: endpoints.to_vec(),
            ..self.clone()
        }
    }

    /// Reject configurations the client cannot work with; returns warnings
    /// for suspicious but usable ones.
    pub fn validate(&self) -> LanaResult<Vec<String>> {
        let mut warnings = Vec::new();

        if self.endpoints.is_empty() {
            return Err(LanaError::config_error("No node endpoints configured"));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.host.trim().is_empty() {
                return Err(LanaError::config_error("Endpoint host must not be empty"));
            }
            if endpoint.port == 0 {
                return Err(LanaError::config_error(format!(
                    "Endpoint {} has port 0",
                    endpoint.host
                )));
            }
            if !seen.insert(endpoint.clone()) {
                warnings.push(format!("Endpoint {} is listed more than once", endpoint));
            }
        }

        if self.request_timeout_ms == 0 || self.call_timeout_ms == 0 {
            return Err(LanaError::config_error("Timeouts must be non-zero"));
        }
        if self.max_retries == 0 {
            return Err(LanaError::config_error("max_retries must be at least 1"));
        }
        if self.max_response_bytes < 1024 {
            return Err(LanaError::config_error("max_response_bytes must be at least 1024"));
        }
        if self.call_timeout_ms < self.request_timeout_ms {
            warnings.push(
                "call_timeout_ms is shorter than request_timeout_ms; only one attempt may fit"
                    .to_string(),
            );
        }

        Ok(warnings)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = NetworkConfig::from_json_str(
            r#"{"endpoints":[{"host":"127.0.0.1","port":50001}]}"#,
        )
        .unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.endpoints.len(), 1);
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_endpoints() {
        let err = NetworkConfig::default().validate().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }

    #[test]
    fn test_validate_warns_on_duplicates() {
        let ep = NodeEndpoint::new("node.example.org", 50001);
        let config = NetworkConfig::with_endpoints(vec![ep.clone(), ep]);
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_override_keeps_tuning() {
        let mut base = NetworkConfig::with_endpoints(vec![NodeEndpoint::new("a", 1)]);
        base.max_retries = 7;
        let overridden = base.overridden_by(&[NodeEndpoint::new("b", 2)]);
        assert_eq!(overridden.endpoints, vec![NodeEndpoint::new("b", 2)]);
        assert_eq!(overridden.max_retries, 7);
        assert_eq!(base.overridden_by(&[]), base);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = NetworkConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }
}
