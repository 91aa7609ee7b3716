//! Lana Core Library
//!
//! Rust backend for a Lanacoin wallet: legacy P2PKH addresses, UTXO
//! analysis, consolidation and payments signed locally and broadcast
//! through untrusted Electrum-style nodes.
//!
//! # Architecture
//!
//! This crate provides:
//! - **crypto**: secp256k1 arithmetic, RFC 6979 nonces, ECDSA and DER
//! - **wallet**: WIF import, Base58Check, address validation, UTXO analysis
//! - **tx**: wire codec, scripts, signature pre-images, signing builder
//! - **fees**: flat size-based fee estimation
//! - **node**: newline-delimited JSON client with endpoint fallback
//! - **operations**: the entry points used by the UI layer
//! - **ffi**: C-ABI exports taking and returning JSON
//!
//! # Security
//!
//! Private key scalars and WIF strings are zeroized on drop and never
//! logged. Every signature is verified before a transaction leaves the
//! crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use lana_core::operations;
//! use lana_core::types::WifSecret;
//!
//! let identity = operations::derive_identity(&WifSecret::new(wif))?;
//! println!("{}", identity.address);
//! ```

pub mod chain;
pub mod crypto;
pub mod error;
pub mod fees;
pub mod ffi;
pub mod node;
pub mod operations;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

pub use error::{ErrorCode, LanaError, LanaResult};
pub use types::*;

pub use ffi::{
    lana_analyze_address, lana_consolidate, lana_derive_address, lana_free_string,
    lana_send_payment, lana_validate_address,
};
