//! Shared types for Lana Core
//!
//! All data structures that cross module boundaries (and the JSON shapes
//! exchanged with the external UI/orchestration layer) are defined here.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::chain::DUST_THRESHOLD;
use crate::error::{LanaError, LanaResult};

// =============================================================================
// UTXO Types
// =============================================================================

/// Unspent output as reported by the node
///
/// Accepts both the camelCase shape used by the UI layer and the
/// `tx_hash`/`tx_pos`/`height`/`value` shape of Electrum-style servers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    #[serde(alias = "tx_hash")]
    pub tx_hash: String,
    #[serde(alias = "tx_pos")]
    pub output_index: u32,
    #[serde(alias = "height", default, deserialize_with = "height_or_zero")]
    pub block_height: u32,
    #[serde(alias = "value")]
    pub value_lanoshi: u64,
}

impl Utxo {
    pub fn new(
        tx_hash: impl Into<String>,
        output_index: u32,
        block_height: u32,
        value_lanoshi: u64,
    ) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
            block_height,
            value_lanoshi,
        }
    }

    /// Outpoint key for indexing
    pub fn key(&self) -> String {
        format!("{}:{}", self.tx_hash, self.output_index)
    }

    /// Dust classification depends on value alone
    pub fn is_dust(&self) -> bool {
        self.value_lanoshi < DUST_THRESHOLD
    }

    /// Structural check on the reference before it is spent
    pub fn validate(&self) -> LanaResult<()> {
        if self.tx_hash.len() != 64 || !self.tx_hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LanaError::invalid_input(format!(
                "UTXO tx hash must be 64 hex characters, got '{}'",
                self.tx_hash
            )));
        }
        Ok(())
    }
}

/// Sum of output values, `None` on overflow
pub fn checked_total<I>(values: I) -> Option<u64>
where
    I: IntoIterator<Item = u64>,
{
    values.into_iter().try_fold(0u64, |acc, v| acc.checked_add(v))
}

/// Unconfirmed outputs are reported with height 0 or -1
fn height_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let height = i64::deserialize(deserializer)?;
    Ok(height.clamp(0, u32::MAX as i64) as u32)
}

// =============================================================================
// Node Types
// =============================================================================

/// A node server reachable over plain TCP
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeEndpoint {
    pub host: String,
    pub port: u16,
}

impl NodeEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` form accepted by `TcpStream::connect`
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.socket_addr())
    }
}

impl FromStr for NodeEndpoint {
    type Err = LanaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid =
            |problem: &str| LanaError::config_error(format!("Endpoint '{}' {}", trimmed, problem));
        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| invalid("must be host:port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid("has an empty host"));
        }
        let port: u16 = port.parse().map_err(|_| invalid("has an invalid port"))?;
        if port == 0 {
            return Err(invalid("has port 0"));
        }
        Ok(NodeEndpoint::new(host, port))
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// WIF string supplied by the caller for the duration of one operation
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct WifSecret(String);

impl WifSecret {
    pub fn new(wif: impl Into<String>) -> Self {
        Self(wif.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WifSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WifSecret([REDACTED])")
    }
}

// =============================================================================
// Requests and Responses
// =============================================================================

/// Payment destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
    pub amount: u64,
}

/// Sweep a chosen set of outputs back into the sender address
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationRequest {
    pub sender_address: String,
    pub selected_utxos: Vec<Utxo>,
    #[serde(rename = "privateKeyWIF")]
    pub private_key_wif: WifSecret,
    #[serde(default)]
    pub node_endpoints: Vec<NodeEndpoint>,
}

/// Pay one or more recipients from the sender's unspent outputs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub sender_address: String,
    pub recipients: Vec<Recipient>,
    #[serde(rename = "privateKeyWIF")]
    pub private_key_wif: WifSecret,
    #[serde(default)]
    pub node_endpoints: Vec<NodeEndpoint>,
}

/// Result handed back for consolidation and payment requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResponse {
    pub fn ok(txid: impl Into<String>, total_value: u64, fee: u64) -> Self {
        Self {
            success: true,
            txid: Some(txid.into()),
            total_value: Some(total_value),
            fee: Some(fee),
            error: None,
        }
    }

    pub fn failed(error: &LanaError) -> Self {
        Self {
            success: false,
            txid: None,
            total_value: None,
            fee: None,
            error: Some(error.reason()),
        }
    }
}

impl From<LanaResult<OperationResponse>> for OperationResponse {
    fn from(result: LanaResult<OperationResponse>) -> Self {
        result.unwrap_or_else(|e| OperationResponse::failed(&e))
    }
}

/// Public identity derived from an imported key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub address: String,
    pub public_key_hex: String,
}

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<LanaError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: LanaError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"code":"internal","message":"Serialization failed"}}"#
                .to_string()
        })
    }
}
