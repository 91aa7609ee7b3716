//! Unified error types for Lana Core
//!
//! All errors flow through this module so that every failure reaches the
//! caller as a structured code plus a reason string. Messages must never
//! carry key material.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all Lana operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanaError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LanaError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn invalid_private_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPrivateKey, msg)
    }

    pub fn invalid_length(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidLength, msg)
    }

    pub fn invalid_version_byte(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidVersionByte, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn script_fetch_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ScriptFetchFailed, msg)
    }

    pub fn invalid_transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransaction, msg)
    }

    pub fn broadcast_rejected(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BroadcastRejected, msg)
    }

    pub fn no_reachable_node(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoReachableNode, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, msg)
    }

    pub fn remote_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RemoteError, msg)
    }

    pub fn protocol_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProtocolError, msg)
    }

    pub fn invalid_nonce(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidNonce, msg)
    }

    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSignature, msg)
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Reason string handed to external collaborators
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LanaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for LanaError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input validation errors
    InvalidInput,
    InvalidAddress,
    InvalidPrivateKey,
    InvalidCharacter,
    ChecksumMismatch,
    InvalidVersionByte,
    InvalidLength,

    // Network errors
    NoReachableNode,
    Timeout,

    // Remote protocol errors
    RemoteError,
    ProtocolError,

    // Economic errors
    InsufficientFunds,

    // Transaction errors
    ScriptFetchFailed,
    InvalidTransaction,
    BroadcastRejected,

    // Crypto errors
    InvalidNonce,
    InvalidSignature,

    // Parse errors
    JsonError,
    HexError,

    // Internal
    ConfigError,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::InvalidAddress => "invalid_address",
            ErrorCode::InvalidPrivateKey => "invalid_private_key",
            ErrorCode::InvalidCharacter => "invalid_character",
            ErrorCode::ChecksumMismatch => "checksum_mismatch",
            ErrorCode::InvalidVersionByte => "invalid_version_byte",
            ErrorCode::InvalidLength => "invalid_length",
            ErrorCode::NoReachableNode => "no_reachable_node",
            ErrorCode::Timeout => "timeout",
            ErrorCode::RemoteError => "remote_error",
            ErrorCode::ProtocolError => "protocol_error",
            ErrorCode::InsufficientFunds => "insufficient_funds",
            ErrorCode::ScriptFetchFailed => "script_fetch_failed",
            ErrorCode::InvalidTransaction => "invalid_transaction",
            ErrorCode::BroadcastRejected => "broadcast_rejected",
            ErrorCode::InvalidNonce => "invalid_nonce",
            ErrorCode::InvalidSignature => "invalid_signature",
            ErrorCode::JsonError => "json_error",
            ErrorCode::HexError => "hex_error",
            ErrorCode::ConfigError => "config_error",
            ErrorCode::Internal => "internal",
        }
    }

    /// Network failures are the only class worth retrying against another
    /// endpoint.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::NoReachableNode | ErrorCode::Timeout)
    }
}

/// Result type alias for Lana operations
pub type LanaResult<T> = Result<T, LanaError>;

// Conversions from common error types

impl From<serde_json::Error> for LanaError {
    fn from(e: serde_json::Error) -> Self {
        LanaError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for LanaError {
    fn from(e: hex::FromHexError) -> Self {
        LanaError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<std::io::Error> for LanaError {
    fn from(e: std::io::Error) -> Self {
        LanaError::new(ErrorCode::Internal, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = LanaError::insufficient_funds("Not enough LANA")
            .with_details("Required: 120000, Available: 65700");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("insufficient_funds"));
        assert!(json.contains("Not enough LANA"));
    }

    #[test]
    fn test_display_includes_code_and_details() {
        let err =
            LanaError::script_fetch_failed("prior transaction missing").with_details("index 2");
        assert_eq!(
            err.to_string(),
            "[script_fetch_failed] prior transaction missing (index 2)"
        );
    }

    #[test]
    fn test_retry_classification() {
        assert!(ErrorCode::Timeout.is_retryable());
        assert!(ErrorCode::NoReachableNode.is_retryable());
        assert!(!ErrorCode::RemoteError.is_retryable());
        assert!(!ErrorCode::ProtocolError.is_retryable());
    }
}
