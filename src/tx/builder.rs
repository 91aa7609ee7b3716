//! Transaction Builder
//!
//! Plans outputs, fetches the locking scripts of the outputs being spent,
//! signs every input and assembles the final bytes. Everything that can be
//! checked is checked before the first signature is produced.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::codec::{decode_transaction_hex, txid_of, OutPoint, Transaction, TxIn, TxOut};
use super::preimage::signature_hash;
use super::script::{build_script_sig, p2pkh_pubkey_hash, script_for_address};
use crate::chain::{LOCK_TIME, MIN_CHANGE, SEQUENCE_FINAL, TX_VERSION};
use crate::crypto::ecdsa::encode_der;
use crate::error::{LanaError, LanaResult};
use crate::node::NodeClient;
use crate::types::{checked_total, Recipient, Utxo};
use crate::wallet::{require_valid_address, KeyPair};
use crate::{log_debug, log_info};

/// Outputs in payment order plus the fee actually paid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPlan {
    pub outputs: Vec<Recipient>,
    /// Value of the change output, if one was emitted
    pub change: Option<u64>,
    /// Requested fee plus any remainder too small to return as change
    pub effective_fee: u64,
}

/// Recipient outputs in caller order, then change if the remainder is
/// strictly above `MIN_CHANGE`; otherwise the remainder joins the fee.
pub fn plan_outputs(
    input_total: u64,
    recipients: &[Recipient],
    fee: u64,
    change_address: &str,
) -> LanaResult<OutputPlan> {
    if recipients.is_empty() {
        return Err(LanaError::invalid_input("At least one recipient is required"));
    }
    if fee == 0 {
        return Err(LanaError::invalid_input("Fee must be positive"));
    }

    let mut outputs = Vec::with_capacity(recipients.len() + 1);
    let mut send_total: u64 = 0;
    for recipient in recipients {
        if recipient.amount == 0 {
            return Err(LanaError::invalid_input("Recipient amount must be positive"));
        }
        let address = require_valid_address(&recipient.address)?;
        send_total = send_total
            .checked_add(recipient.amount)
            .ok_or_else(|| LanaError::invalid_input("Recipient amounts overflow"))?;
        outputs.push(Recipient {
            address,
            amount: recipient.amount,
        });
    }

    let required = send_total
        .checked_add(fee)
        .ok_or_else(|| LanaError::invalid_input("Amount plus fee overflows"))?;
    if input_total < required {
        return Err(LanaError::insufficient_funds(format!(
            "Inputs total {} lanoshi, need {} ({} to send + {} fee)",
            input_total, required, send_total, fee
        )));
    }

    let remainder = input_total - required;
    if remainder > MIN_CHANGE {
        let change_address = require_valid_address(change_address)?;
        outputs.push(Recipient {
            address: change_address,
            amount: remainder,
        });
        Ok(OutputPlan {
            outputs,
            change: Some(remainder),
            effective_fee: fee,
        })
    } else {
        Ok(OutputPlan {
            outputs,
            change: None,
            effective_fee: fee + remainder,
        })
    }
}

/// Inputs and outputs fixed, no scripts yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<Recipient>,
    /// Header timestamp, identical in every pre-image and the final bytes
    pub time: u32,
}

impl UnsignedTransaction {
    pub fn new(inputs: Vec<Utxo>, outputs: Vec<Recipient>, time: u32) -> LanaResult<Self> {
        if inputs.is_empty() {
            return Err(LanaError::invalid_input("No inputs to spend"));
        }
        if outputs.is_empty() {
            return Err(LanaError::invalid_input("No outputs to pay"));
        }
        for utxo in &inputs {
            utxo.validate()?;
        }
        let template = Self { inputs, outputs, time };
        let input_total = template.input_total()?;
        let output_total = template.output_total()?;
        if output_total >= input_total {
            return Err(LanaError::insufficient_funds(format!(
                "Outputs total {} leaves no fee from inputs total {}",
                output_total, input_total
            )));
        }
        Ok(template)
    }

    pub fn input_total(&self) -> LanaResult<u64> {
        checked_total(self.inputs.iter().map(|u| u.value_lanoshi))
            .ok_or_else(|| LanaError::invalid_input("Input values overflow"))
    }

    pub fn output_total(&self) -> LanaResult<u64> {
        checked_total(self.outputs.iter().map(|o| o.amount))
            .ok_or_else(|| LanaError::invalid_input("Output values overflow"))
    }

    /// Wire form with empty scriptSigs
    pub fn to_transaction(&self) -> LanaResult<Transaction> {
        let inputs = self
            .inputs
            .iter()
            .map(|utxo| {
                Ok(TxIn {
                    prev_out: OutPoint::from_display_hex(&utxo.tx_hash, utxo.output_index)?,
                    script_sig: Vec::new(),
                    sequence: SEQUENCE_FINAL,
                })
            })
            .collect::<LanaResult<Vec<_>>>()?;

        let outputs = self
            .outputs
            .iter()
            .map(|o| {
                Ok(TxOut {
                    value: o.amount,
                    script_pubkey: script_for_address(&o.address)?,
                })
            })
            .collect::<LanaResult<Vec<_>>>()?;

        Ok(Transaction {
            version: TX_VERSION,
            time: self.time,
            inputs,
            outputs,
            lock_time: LOCK_TIME,
        })
    }
}

/// Fully signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub hex: String,
    pub txid: String,
    pub input_total: u64,
    pub output_total: u64,
    pub fee: u64,
    pub time: u32,
    pub size_bytes: usize,
    pub input_count: usize,
    pub output_count: usize,
}

/// Locking script of each spent output, in input order.
///
/// Each fetched transaction must hash to the txid it was requested by, and
/// the output it holds must carry the value the input claims. A value
/// mismatch is `InvalidTransaction`; every other failure is
/// `ScriptFetchFailed` with the underlying reason in `details`.
pub async fn fetch_prev_scripts(
    client: &NodeClient,
    inputs: &[Utxo],
) -> LanaResult<Vec<Vec<u8>>> {
    let mut transactions: HashMap<String, Transaction> = HashMap::new();
    let mut scripts = Vec::with_capacity(inputs.len());

    for utxo in inputs {
        let key = utxo.tx_hash.to_ascii_lowercase();
        if !transactions.contains_key(&key) {
            let tx = fetch_verified_transaction(client, &key).await.map_err(|e| {
                LanaError::script_fetch_failed(format!(
                    "Could not fetch previous transaction {}",
                    key
                ))
                .with_details(e.reason())
            })?;
            transactions.insert(key.clone(), tx);
        }

        let out = transactions
            .get(&key)
            .and_then(|tx| tx.outputs.get(utxo.output_index as usize))
            .ok_or_else(|| {
                LanaError::script_fetch_failed(format!(
                    "Previous transaction {} has no output {}",
                    key, utxo.output_index
                ))
            })?;
        // Legacy signatures do not commit to input values
        if out.value != utxo.value_lanoshi {
            return Err(LanaError::invalid_transaction(format!(
                "Output {} holds {} lanoshi, listed as {}",
                utxo.key(),
                out.value,
                utxo.value_lanoshi
            )));
        }
        scripts.push(out.script_pubkey.clone());
    }

    log_debug!(
        "tx",
        "Previous scripts fetched",
        inputs = inputs.len(),
        transactions = transactions.len(),
    );
    Ok(scripts)
}

async fn fetch_verified_transaction(client: &NodeClient, txid: &str) -> LanaResult<Transaction> {
    let raw_hex = client.get_transaction(txid).await?;
    let tx = decode_transaction_hex(&raw_hex)?;
    let actual = tx.txid();
    if actual != txid {
        return Err(LanaError::invalid_transaction(format!(
            "Node returned transaction {} for {}",
            actual, txid
        )));
    }
    Ok(tx)
}

/// Sign every input with `key` and assemble the final transaction.
///
/// Each spent output must be a P2PKH script paying to `key`. Every signature
/// is checked against the public key before the bytes are returned.
pub fn build_signed_transaction(
    template: &UnsignedTransaction,
    prev_scripts: &[Vec<u8>],
    key: &KeyPair,
) -> LanaResult<SignedTransaction> {
    if prev_scripts.len() != template.inputs.len() {
        return Err(LanaError::invalid_transaction(format!(
            "{} previous scripts for {} inputs",
            prev_scripts.len(),
            template.inputs.len()
        )));
    }

    let own_hash = key.public_key().pubkey_hash();
    for (index, script) in prev_scripts.iter().enumerate() {
        if p2pkh_pubkey_hash(script) != Some(own_hash) {
            return Err(LanaError::invalid_transaction(format!(
                "Input {} ({}) is not a P2PKH output of this key",
                index,
                template.inputs[index].key()
            )));
        }
    }

    let unsigned = template.to_transaction()?;
    let public_key = key.public_key().as_bytes();

    let mut script_sigs = Vec::with_capacity(unsigned.inputs.len());
    for index in 0..unsigned.inputs.len() {
        let digest = signature_hash(&unsigned, prev_scripts, index)?;
        let signature = key.sign_digest(&digest)?;
        if !key.verify_digest(&digest, &signature) {
            return Err(LanaError::invalid_signature(format!(
                "Signature for input {} failed verification",
                index
            )));
        }
        script_sigs.push(build_script_sig(&encode_der(&signature), public_key));
    }

    let mut signed = unsigned;
    for (input, script_sig) in signed.inputs.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    let raw = signed.serialize();
    let input_total = template.input_total()?;
    let output_total = template.output_total()?;
    let fee = input_total
        .checked_sub(output_total)
        .filter(|fee| *fee > 0)
        .ok_or_else(|| LanaError::invalid_transaction("Outputs leave no fee"))?;
    let result = SignedTransaction {
        hex: hex::encode(&raw),
        txid: txid_of(&raw),
        input_total,
        output_total,
        fee,
        time: template.time,
        size_bytes: raw.len(),
        input_count: signed.inputs.len(),
        output_count: signed.outputs.len(),
    };

    log_info!(
        "tx",
        "Transaction signed",
        txid = result.txid,
        inputs = result.input_count,
        outputs = result.output_count,
        fee = result.fee,
        size = result.size_bytes,
    );
    Ok(result)
}
