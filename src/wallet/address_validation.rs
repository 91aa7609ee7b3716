//! Address Validation
//!
//! Structural checks on a candidate P2PKH address, in a fixed order:
//! 1. empty after trimming
//! 2. length 26..=35
//! 3. Base58 alphabet (offending character and 1-based position reported)
//! 4. Base58Check checksum
//! 5. decoded payload length (21 bytes)
//! 6. version byte `0x30`
//!
//! `validate_address` never fails; it returns a `{valid, error?}` report
//! for interactive feedback.

use serde::{Deserialize, Serialize};

use super::base58::{self, Base58Error};
use crate::chain::{ADDRESS_VERSION, MAX_ADDRESS_LEN, MIN_ADDRESS_LEN};
use crate::error::{LanaError, LanaResult};

/// Version byte plus 20-byte key hash
const ADDRESS_PAYLOAD_LEN: usize = 21;

/// Validation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AddressValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }
}

pub fn validate_address(address: &str) -> AddressValidation {
    match check_address(address) {
        Ok(_) => AddressValidation::ok(),
        Err(reason) => AddressValidation::invalid(reason),
    }
}

/// Trimmed address, or `InvalidAddress` with the validation reason
pub fn require_valid_address(address: &str) -> LanaResult<String> {
    check_address(address)
        .map(|_| address.trim().to_string())
        .map_err(LanaError::invalid_address)
}

/// 20-byte key hash for building a P2PKH output script
pub fn address_to_pubkey_hash(address: &str) -> LanaResult<[u8; 20]> {
    check_address(address).map_err(LanaError::invalid_address)
}

fn check_address(address: &str) -> Result<[u8; 20], String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err("Address is empty".to_string());
    }

    let len = trimmed.chars().count();
    if len < MIN_ADDRESS_LEN || len > MAX_ADDRESS_LEN {
        return Err(format!(
            "Address length must be between {} and {} characters, got {}",
            MIN_ADDRESS_LEN, MAX_ADDRESS_LEN, len
        ));
    }

    // Positions are reported against the caller's string, leading
    // whitespace included
    let leading = address.chars().take_while(|c| c.is_whitespace()).count();
    let payload = base58::decode(trimmed).map_err(|e| match e {
        Base58Error::InvalidCharacter { character, position } => format!(
            "Invalid character '{}' at position {}",
            character,
            leading + position + 1
        ),
        Base58Error::ChecksumMismatch => "Address checksum mismatch".to_string(),
        Base58Error::TooShort => "Address is too short".to_string(),
    })?;

    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return Err(format!(
            "Decoded address must be {} bytes, got {}",
            ADDRESS_PAYLOAD_LEN,
            payload.len()
        ));
    }
    if payload[0] != ADDRESS_VERSION {
        return Err(format!(
            "Address version byte must be 0x{:02x}, got 0x{:02x}",
            ADDRESS_VERSION, payload[0]
        ));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const ADDRESS_ONE: &str = "LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubdM";

    #[test]
    fn test_valid_address() {
        assert_eq!(validate_address(ADDRESS_ONE), AddressValidation::ok());
        assert!(validate_address("  LT7aChmDuQgrfFDwXQBrH5rQiUcq2ZSWe9 \n").valid);
    }

    #[test]
    fn test_empty_and_length() {
        let empty = validate_address("   ");
        assert!(!empty.valid);
        assert_eq!(empty.error.as_deref(), Some("Address is empty"));

        let short = validate_address("LYWKqJhtPe");
        assert!(short.error.unwrap().contains("length"));

        let long = validate_address(&"L".repeat(36));
        assert!(long.error.unwrap().contains("got 36"));
    }

    #[test]
    fn test_invalid_character_position_is_one_based() {
        let bad = "LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubd0";
        let report = validate_address(bad);
        assert!(!report.valid);
        assert_eq!(
            report.error.as_deref(),
            Some("Invalid character '0' at position 34")
        );

        let padded = validate_address("  LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubd0");
        assert_eq!(
            padded.error.as_deref(),
            Some("Invalid character '0' at position 36")
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        let report = validate_address("LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubdN");
        assert_eq!(report.error.as_deref(), Some("Address checksum mismatch"));
    }

    #[test]
    fn test_wrong_version() {
        // Bitcoin mainnet P2PKH for the same key hash
        let mut payload = vec![0x00];
        let hash = hex::decode("91b24bf9f5288532960ac687abb035127b1d28a5").unwrap();
        payload.extend_from_slice(&hash);
        let btc = base58::encode(&payload);
        let report = validate_address(&btc);
        assert!(report.error.unwrap().contains("version byte"));
    }

    #[test]
    fn test_wrong_payload_length() {
        let payload = vec![ADDRESS_VERSION; 20];
        let report = validate_address(&base58::encode(&payload));
        assert!(report.error.unwrap().contains("must be 21 bytes"));
    }

    #[test]
    fn test_pubkey_hash_extraction() {
        let hash = address_to_pubkey_hash(ADDRESS_ONE).unwrap();
        assert_eq!(hex::encode(hash), "91b24bf9f5288532960ac687abb035127b1d28a5");

        let err = require_valid_address("nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_report_json_shape() {
        let json = serde_json::to_string(&validate_address(ADDRESS_ONE)).unwrap();
        assert_eq!(json, r#"{"valid":true}"#);
    }
}
