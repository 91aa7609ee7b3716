//! Wallet Module
//!
//! Key import, address encoding and validation, and UTXO analysis for a
//! single legacy P2PKH address.

pub mod address_validation;
pub mod base58;
pub mod keys;
pub mod utxo;

pub use address_validation::{
    address_to_pubkey_hash, require_valid_address, validate_address, AddressValidation,
};
pub use keys::{address_from_pubkey_hash, encode_wif, import_wif, KeyPair, PrivateKey, PublicKey};
pub use utxo::{
    partition_into_batches, summarize, AnalysisOutcome, Batch, BatchStatus, UtxoAnalysis,
    UtxoAnalyzer,
};
