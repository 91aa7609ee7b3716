//! WIF Key Import
//!
//! Decodes a Base58Check WIF private key, checks the version byte and
//! scalar range, and derives the uncompressed public key and P2PKH address.
//! The scalar lives in a zeroizing wrapper and never appears in `Debug`
//! output or error messages.

use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::base58::{self, Base58Error};
use crate::chain::{ADDRESS_VERSION, WIF_VERSION};
use crate::crypto::curve::{order, public_point, Point, UNCOMPRESSED_LEN};
use crate::crypto::ecdsa::{self, Signature};
use crate::crypto::hash::hash160;
use crate::error::{ErrorCode, LanaError, LanaResult};
use crate::types::Identity;

/// Version byte plus 32-byte scalar
const WIF_PAYLOAD_LEN: usize = 33;
const COMPRESSION_FLAG: u8 = 0x01;

/// Raw secp256k1 private scalar
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; 32],
}

impl PrivateKey {
    /// Accepts exactly 32 big-endian bytes in `[1, N-1]`
    pub fn from_bytes(bytes: &[u8]) -> LanaResult<Self> {
        if bytes.len() != 32 {
            return Err(LanaError::invalid_length(format!(
                "Private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let scalar = BigUint::from_bytes_be(bytes);
        if scalar.is_zero() || &scalar >= order() {
            return Err(LanaError::invalid_private_key("Private key is outside the curve order"));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub(crate) fn scalar(&self) -> BigUint {
        BigUint::from_bytes_be(&self.bytes)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// Uncompressed public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    point: Point,
    bytes: [u8; UNCOMPRESSED_LEN],
}

impl PublicKey {
    pub fn from_private(key: &PrivateKey) -> LanaResult<Self> {
        let point = public_point(&key.scalar());
        let bytes = point.to_uncompressed()?;
        Ok(Self { point, bytes })
    }

    pub fn from_bytes(bytes: &[u8]) -> LanaResult<Self> {
        let point = Point::from_uncompressed(bytes)?;
        let mut encoded = [0u8; UNCOMPRESSED_LEN];
        encoded.copy_from_slice(bytes);
        Ok(Self { point, bytes: encoded })
    }

    pub fn as_bytes(&self) -> &[u8; UNCOMPRESSED_LEN] {
        &self.bytes
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160(&self.bytes)
    }

    pub fn address(&self) -> String {
        address_from_pubkey_hash(&self.pubkey_hash())
    }
}

/// Imported key with its derived public data
pub struct KeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
    address: String,
}

impl KeyPair {
    pub fn from_private_key(private_key: PrivateKey) -> LanaResult<Self> {
        let public_key = PublicKey::from_private(&private_key)?;
        let address = public_key.address();
        Ok(Self {
            private_key,
            public_key,
            address,
        })
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn identity(&self) -> Identity {
        Identity {
            address: self.address.clone(),
            public_key_hex: self.public_key.to_hex(),
        }
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> LanaResult<Signature> {
        ecdsa::sign_digest(digest, &self.private_key.scalar())
    }

    pub fn verify_digest(&self, digest: &[u8; 32], signature: &Signature) -> bool {
        ecdsa::verify(digest, signature, self.public_key.point())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &self.private_key)
            .field("address", &self.address)
            .finish()
    }
}

/// `Base58Check(0x30 ‖ hash160)`
pub fn address_from_pubkey_hash(hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(hash);
    base58::encode(&payload)
}

/// Decode a WIF private key.
///
/// A trailing compression flag is accepted, but the key is always used
/// with its uncompressed public key.
pub fn import_wif(wif: &str) -> LanaResult<KeyPair> {
    let mut payload = base58::decode(wif.trim()).map_err(wif_decode_error)?;

    let result = parse_wif_payload(&payload);
    payload.zeroize();
    KeyPair::from_private_key(result?)
}

fn parse_wif_payload(payload: &[u8]) -> LanaResult<PrivateKey> {
    if payload.len() < WIF_PAYLOAD_LEN {
        return Err(LanaError::invalid_length(format!(
            "WIF payload must be at least {} bytes, got {}",
            WIF_PAYLOAD_LEN,
            payload.len()
        )));
    }
    if payload[0] != WIF_VERSION {
        return Err(LanaError::invalid_version_byte(format!(
            "WIF version byte must be 0x{:02x}, got 0x{:02x}",
            WIF_VERSION, payload[0]
        )));
    }
    match payload.len() {
        WIF_PAYLOAD_LEN => {}
        len if len == WIF_PAYLOAD_LEN + 1 && payload[WIF_PAYLOAD_LEN] == COMPRESSION_FLAG => {}
        len => {
            return Err(LanaError::invalid_length(format!(
                "Unexpected WIF payload length {}",
                len
            )))
        }
    }
    PrivateKey::from_bytes(&payload[1..WIF_PAYLOAD_LEN])
}

/// The offending character is left out so no part of the key is echoed
fn wif_decode_error(e: Base58Error) -> LanaError {
    match e {
        Base58Error::InvalidCharacter { position, .. } => LanaError::new(
            ErrorCode::InvalidCharacter,
            format!("WIF contains an invalid character at position {}", position + 1),
        ),
        Base58Error::ChecksumMismatch => {
            LanaError::new(ErrorCode::ChecksumMismatch, "WIF checksum mismatch")
        }
        Base58Error::TooShort => LanaError::invalid_length("WIF is too short"),
    }
}

/// Encode a private key as WIF (`0xb0` prefix)
pub fn encode_wif(key: &PrivateKey, compressed: bool) -> String {
    let mut payload = Vec::with_capacity(WIF_PAYLOAD_LEN + 1);
    payload.push(WIF_VERSION);
    payload.extend_from_slice(key.as_bytes());
    if compressed {
        payload.push(COMPRESSION_FLAG);
    }
    let encoded = base58::encode(&payload);
    payload.zeroize();
    encoded
}
