//! Transaction Module
//!
//! Wire codec, scripts, signature pre-images and the signing builder for
//! legacy timestamped transactions.

pub mod builder;
pub mod codec;
pub mod preimage;
pub mod script;

pub use builder::{
    build_signed_transaction, fetch_prev_scripts, plan_outputs, OutputPlan, SignedTransaction,
    UnsignedTransaction,
};
pub use codec::{
    decode_transaction, decode_transaction_hex, txid_of, OutPoint, Transaction, TxIn, TxOut,
};
pub use preimage::{signature_hash, signature_preimage};
pub use script::{build_script_sig, p2pkh_pubkey_hash, p2pkh_script, script_for_address};
