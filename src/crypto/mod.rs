//! Cryptographic primitives for Lana Core
//!
//! Self-contained secp256k1 arithmetic for legacy P2PKH signing:
//! - Modular big-integer helpers
//! - Affine curve points and scalar multiplication
//! - RFC 6979 deterministic nonces
//! - ECDSA signing, verification and strict DER

pub mod bigint;
pub mod curve;
pub mod ecdsa;
pub mod hash;
pub mod nonce;

pub use curve::{CurveError, Point};
pub use ecdsa::{decode_der, encode_der, sign_digest, verify, Signature};
pub use hash::{hash160, sha256, sha256d};
