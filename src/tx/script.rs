//! Script templates
//!
//! Only the pay-to-public-key-hash pair is needed:
//! `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG` and the
//! matching `<sig+hashtype> <pubkey>` unlocking script.

use crate::chain::SIGHASH_ALL;
use crate::error::LanaResult;
use crate::wallet::address_to_pubkey_hash;

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;

pub const P2PKH_SCRIPT_LEN: usize = 25;

pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(20);
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// Locking script for a validated address
pub fn script_for_address(address: &str) -> LanaResult<Vec<u8>> {
    Ok(p2pkh_script(&address_to_pubkey_hash(address)?))
}

/// Key hash if `script` is exactly the P2PKH template
pub fn p2pkh_pubkey_hash(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() != P2PKH_SCRIPT_LEN
        || script[0] != OP_DUP
        || script[1] != OP_HASH160
        || script[2] != 20
        || script[23] != OP_EQUALVERIFY
        || script[24] != OP_CHECKSIG
    {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[3..23]);
    Some(hash)
}

/// Smallest push opcode for `data`
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// `<der ‖ SIGHASH_ALL> <pubkey>`
pub fn build_script_sig(der_signature: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut sig = Vec::with_capacity(der_signature.len() + 1);
    sig.extend_from_slice(der_signature);
    sig.push(SIGHASH_ALL);

    let mut script = Vec::with_capacity(sig.len() + public_key.len() + 2);
    push_data(&mut script, &sig);
    push_data(&mut script, public_key);
    script
}
