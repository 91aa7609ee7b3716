//! Legacy Signature Pre-Image
//!
//! For input `i` the whole transaction is reserialized with every scriptSig
//! emptied except input `i`, which carries the locking script of the output
//! it spends; the 4-byte SIGHASH_ALL type is appended and the result is
//! double SHA-256 hashed.
//!
//! Each pre-image is O(n) in the input count, so signing n inputs is O(n²).
//! This is what caps batches at `MAX_BATCH_SIZE` inputs.

use super::codec::{write_u32_le, Transaction};
use crate::chain::SIGHASH_ALL;
use crate::crypto::hash::sha256d;
use crate::error::{LanaError, LanaResult};

pub fn signature_preimage(
    tx: &Transaction,
    prev_scripts: &[Vec<u8>],
    index: usize,
) -> LanaResult<Vec<u8>> {
    if index >= tx.inputs.len() {
        return Err(LanaError::invalid_transaction(format!(
            "Input index {} out of range ({} inputs)",
            index,
            tx.inputs.len()
        )));
    }
    if prev_scripts.len() != tx.inputs.len() {
        return Err(LanaError::invalid_transaction(format!(
            "{} previous scripts for {} inputs",
            prev_scripts.len(),
            tx.inputs.len()
        )));
    }

    let mut copy = tx.clone();
    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.script_sig = if i == index {
            prev_scripts[i].clone()
        } else {
            Vec::new()
        };
    }

    let mut preimage = copy.serialize();
    write_u32_le(&mut preimage, SIGHASH_ALL as u32);
    Ok(preimage)
}

/// Digest that is signed for input `index`
pub fn signature_hash(
    tx: &Transaction,
    prev_scripts: &[Vec<u8>],
    index: usize,
) -> LanaResult<[u8; 32]> {
    Ok(sha256d(&signature_preimage(tx, prev_scripts, index)?))
}
