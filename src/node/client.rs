//! Node Client
//!
//! Calls are tried against each configured endpoint in order. Failures
//! whose code `is_retryable` move on to the next endpoint; after a full
//! sweep the client waits `retry_delay` and sweeps again, up to
//! `max_retries` sweeps. A reply that arrives but is malformed or carries an
//! `error` is returned at once.
//! The whole call, retries included, is bounded by `call_timeout`.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::broadcast::interpret_broadcast;
use super::protocol::{
    parse_response, RpcRequest, RpcResponse, METHOD_BROADCAST, METHOD_GET_TRANSACTION,
    METHOD_LIST_UNSPENT,
};
use super::transport::{TcpTransport, Transport, TransportError};
use crate::error::{LanaError, LanaResult};
use crate::types::{checked_total, NodeEndpoint, Utxo};
use crate::utils::NetworkConfig;
use crate::{log_debug, log_warn};

pub struct NodeClient {
    config: NetworkConfig,
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
}

impl NodeClient {
    /// TCP client for a validated configuration
    pub fn new(config: NetworkConfig) -> LanaResult<Self> {
        Self::with_transport(config, Arc::new(TcpTransport))
    }

    pub fn with_transport(
        config: NetworkConfig,
        transport: Arc<dyn Transport>,
    ) -> LanaResult<Self> {
        for warning in config.validate()? {
            log_warn!("node", "Config warning", detail = warning);
        }
        Ok(Self {
            config,
            transport,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// One request, with endpoint fallback and retries; the reply is
    /// parsed but its `error` field is left for the caller to interpret.
    pub async fn call_raw(&self, method: &str, params: Vec<Value>) -> LanaResult<RpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = RpcRequest::new(id, method, params).to_line()?;

        let sweep = self.sweep(method, &line, id);
        match tokio::time::timeout(self.config.call_timeout(), sweep).await {
            Ok(result) => result,
            Err(_) => Err(LanaError::timeout(format!(
                "{} did not complete within {} ms",
                method, self.config.call_timeout_ms
            ))),
        }
    }

    /// `result` of a successful call; an `error` reply becomes `RemoteError`
    pub async fn call(&self, method: &str, params: Vec<Value>) -> LanaResult<Value> {
        self.call_raw(method, params).await?.into_result()
    }

    async fn sweep(&self, method: &str, line: &str, id: u64) -> LanaResult<RpcResponse> {
        let mut last_failure = String::from("no endpoint attempted");

        for round in 0..self.config.max_retries {
            if round > 0 {
                tokio::time::sleep(self.config.retry_delay()).await;
            }

            for endpoint in &self.config.endpoints {
                match self.attempt(endpoint, method, line, id).await {
                    Ok(response) => return Ok(response),
                    Err(e) if e.code.is_retryable() => {
                        log_warn!(
                            "node",
                            "Endpoint failed",
                            method = method,
                            endpoint = endpoint,
                            error = e.message,
                        );
                        last_failure = e.message;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Err(LanaError::no_reachable_node(format!(
            "No node answered {} after {} sweep(s) of {} endpoint(s)",
            method,
            self.config.max_retries,
            self.config.endpoints.len()
        ))
        .with_details(last_failure))
    }

    /// One exchange with one endpoint, bounded by `request_timeout`
    async fn attempt(
        &self,
        endpoint: &NodeEndpoint,
        method: &str,
        line: &str,
        id: u64,
    ) -> LanaResult<RpcResponse> {
        let exchange = self
            .transport
            .exchange(endpoint, line, self.config.max_response_bytes);

        let reply = match tokio::time::timeout(self.config.request_timeout(), exchange).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(TransportError::NotUtf8)) => {
                return Err(LanaError::protocol_error(format!(
                    "{} sent a reply that is not UTF-8",
                    endpoint
                )));
            }
            Ok(Err(e)) => {
                return Err(LanaError::no_reachable_node(format!("{}: {}", endpoint, e)));
            }
            Err(_) => {
                return Err(LanaError::timeout(format!(
                    "{}: no reply within {} ms",
                    endpoint, self.config.request_timeout_ms
                )));
            }
        };

        log_debug!(
            "node",
            "Reply received",
            method = method,
            endpoint = endpoint,
            bytes = reply.len(),
        );
        parse_response(&reply, id)
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    pub async fn list_unspent(&self, address: &str) -> LanaResult<Vec<Utxo>> {
        let result = self.call(METHOD_LIST_UNSPENT, vec![json!(address)]).await?;
        let utxos: Vec<Utxo> = serde_json::from_value(result).map_err(|e| {
            LanaError::protocol_error(format!("Unexpected listunspent reply: {}", e))
        })?;
        for utxo in &utxos {
            utxo.validate().map_err(|e| {
                LanaError::protocol_error(format!("Node returned a bad output: {}", e.message))
            })?;
        }
        if checked_total(utxos.iter().map(|u| u.value_lanoshi)).is_none() {
            return Err(LanaError::protocol_error("Listed output values overflow a 64-bit total"));
        }
        Ok(utxos)
    }

    /// Raw transaction hex; accepts a bare string or an object with `hex`
    pub async fn get_transaction(&self, txid: &str) -> LanaResult<String> {
        let result = self.call(METHOD_GET_TRANSACTION, vec![json!(txid)]).await?;
        let raw = match &result {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("hex").and_then(Value::as_str).ok_or_else(|| {
                LanaError::protocol_error("Transaction object has no hex field")
            })?,
            _ => return Err(LanaError::protocol_error("Unexpected transaction reply type")),
        };
        let raw = raw.trim();
        if raw.is_empty() || raw.len() % 2 != 0 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LanaError::protocol_error("Transaction reply is not hex"));
        }
        Ok(raw.to_ascii_lowercase())
    }

    /// Submit a signed transaction; returns the txid the node reports
    pub async fn broadcast(
        &self,
        raw_hex: &str,
        expected_txid: Option<&str>,
    ) -> LanaResult<String> {
        let response = self.call_raw(METHOD_BROADCAST, vec![json!(raw_hex)]).await?;
        interpret_broadcast(&response, expected_txid)
    }
}
