//! Base58 and Base58Check
//!
//! Bitcoin alphabet (no `0`, `O`, `I`, `l`). One leading `1` per leading
//! zero byte. Inputs of any length are handled through `BigUint`.

use num_bigint::BigUint;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::crypto::hash::sha256d;
use crate::error::{ErrorCode, LanaError};

pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Base58Error {
    /// `position` is the zero-based character index
    #[error("Invalid character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Decoded data is shorter than the checksum")]
    TooShort,
}

impl From<Base58Error> for LanaError {
    fn from(e: Base58Error) -> Self {
        let code = match e {
            Base58Error::InvalidCharacter { .. } => ErrorCode::InvalidCharacter,
            Base58Error::ChecksumMismatch => ErrorCode::ChecksumMismatch,
            Base58Error::TooShort => ErrorCode::InvalidLength,
        };
        LanaError::new(code, e.to_string())
    }
}

fn digit_value(c: char) -> Option<u8> {
    if !c.is_ascii() {
        return None;
    }
    ALPHABET.iter().position(|&a| a == c as u8).map(|i| i as u8)
}

/// Plain Base58, no checksum
pub fn encode_raw(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();
    let mut out = String::with_capacity(data.len() * 138 / 100 + 1);
    out.extend(std::iter::repeat('1').take(zeros));

    let rest = &data[zeros..];
    if rest.is_empty() {
        return out;
    }
    for digit in BigUint::from_bytes_be(rest).to_radix_be(58) {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

pub fn decode_raw(s: &str) -> Result<Vec<u8>, Base58Error> {
    let mut digits = Vec::with_capacity(s.len());
    for (position, character) in s.chars().enumerate() {
        let value = digit_value(character)
            .ok_or(Base58Error::InvalidCharacter { character, position })?;
        digits.push(value);
    }

    let zeros = digits.iter().take_while(|&&d| d == 0).count();
    let mut out = vec![0u8; zeros];

    let rest = &digits[zeros..];
    if !rest.is_empty() {
        // Every digit is below 58, so the radix conversion cannot fail
        if let Some(value) = BigUint::from_radix_be(rest, 58) {
            out.extend_from_slice(&value.to_bytes_be());
        }
    }
    Ok(out)
}

/// `payload ‖ sha256d(payload)[..4]`, Base58 encoded
pub fn encode(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&sha256d(payload)[..CHECKSUM_LEN]);
    encode_raw(&data)
}

/// Decode and verify; returns the payload without the checksum
pub fn decode(s: &str) -> Result<Vec<u8>, Base58Error> {
    let mut data = decode_raw(s)?;
    if data.len() < CHECKSUM_LEN {
        return Err(Base58Error::TooShort);
    }
    let split = data.len() - CHECKSUM_LEN;
    let expected = sha256d(&data[..split]);
    if !bool::from(data[split..].ct_eq(&expected[..CHECKSUM_LEN])) {
        return Err(Base58Error::ChecksumMismatch);
    }
    data.truncate(split);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_known_values() {
        assert_eq!(encode_raw(b""), "");
        assert_eq!(encode_raw(&[0, 0, 0]), "111");
        assert_eq!(encode_raw(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(encode_raw(&[0x00, 0x00, 0x28, 0x7f, 0xb4, 0xcd]), "11233QC4");
        assert_eq!(decode_raw("11233QC4").unwrap(), vec![0x00, 0x00, 0x28, 0x7f, 0xb4, 0xcd]);
        assert_eq!(decode_raw("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_check_roundtrip_with_version() {
        let mut payload = vec![0x30];
        payload.extend_from_slice(&[0u8; 20]);
        let encoded = encode(&payload);
        assert_eq!(encoded, "LKDxGDJq5fF4FohAB8zJH24mDDNHDNtqsE");
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn test_invalid_character_reported_with_position() {
        assert_eq!(
            decode_raw("abc0def"),
            Err(Base58Error::InvalidCharacter { character: '0', position: 3 })
        );
        assert!(matches!(
            decode_raw("ab\u{e9}"),
            Err(Base58Error::InvalidCharacter { character: '\u{e9}', position: 2 })
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        // last character of a valid address changed
        let err = decode("LKDxGDJq5fF4FohAB8zJH24mDDNHDNtqsF").unwrap_err();
        assert_eq!(err, Base58Error::ChecksumMismatch);
        assert_eq!(LanaError::from(err).code, ErrorCode::ChecksumMismatch);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(decode("1"), Err(Base58Error::TooShort));
        assert_eq!(LanaError::from(Base58Error::TooShort).code, ErrorCode::InvalidLength);
    }
}
