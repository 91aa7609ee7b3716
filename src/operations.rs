//! Operations
//!
//! The entry points exposed to the UI layer. Each one validates everything it
//! can locally before touching the network, and the spend operations never
//! return or log key material: failures come back as reason strings.

use std::collections::HashSet;

use crate::chain::MAX_BATCH_SIZE;
use crate::error::{LanaError, LanaResult};
use crate::fees::{consolidation_fee, estimate_fee};
use crate::node::NodeClient;
use crate::tx::{
    build_signed_transaction, fetch_prev_scripts, plan_outputs, UnsignedTransaction,
};
use crate::types::{
    checked_total, ConsolidationRequest, Identity, OperationResponse, PaymentRequest, Recipient,
    Utxo, WifSecret,
};
use crate::utils::Clock;
use crate::wallet::utxo::select_largest_first;
use crate::wallet::{
    import_wif, require_valid_address, AddressValidation, AnalysisOutcome, KeyPair, UtxoAnalyzer,
};
use crate::{log_info, log_warn};

pub fn validate_address(address: &str) -> AddressValidation {
    crate::wallet::validate_address(address)
}

/// Address and public key of an imported WIF
pub fn derive_identity(wif: &WifSecret) -> LanaResult<Identity> {
    Ok(import_wif(wif.expose())?.identity())
}

pub async fn analyze_address(
    analyzer: &UtxoAnalyzer,
    address: &str,
) -> LanaResult<AnalysisOutcome> {
    analyzer.analyze(address).await
}

/// Sweep the selected outputs into a single output back to the sender.
pub async fn consolidate(
    client: &NodeClient,
    request: &ConsolidationRequest,
    clock: &dyn Clock,
) -> OperationResponse {
    let result = try_consolidate(client, request, clock).await;
    if let Err(e) = &result {
        log_warn!("operations", "Consolidation failed", code = e.code.as_str(), reason = e.message);
    }
    result.into()
}

async fn try_consolidate(
    client: &NodeClient,
    request: &ConsolidationRequest,
    clock: &dyn Clock,
) -> LanaResult<OperationResponse> {
    let sender = require_valid_address(&request.sender_address)?;
    let key = key_for_sender(&request.private_key_wif, &sender)?;

    let inputs = &request.selected_utxos;
    if inputs.is_empty() {
        return Err(LanaError::invalid_input("No outputs selected for consolidation"));
    }
    if inputs.len() > MAX_BATCH_SIZE {
        return Err(LanaError::invalid_input(format!(
            "{} outputs selected, at most {} per transaction",
            inputs.len(),
            MAX_BATCH_SIZE
        )));
    }
    check_distinct(inputs)?;

    let total = checked_total(inputs.iter().map(|u| u.value_lanoshi))
        .ok_or_else(|| LanaError::invalid_input("Selected output values overflow"))?;
    let fee = consolidation_fee(inputs.len());
    if total <= fee {
        return Err(LanaError::insufficient_funds(format!(
            "Selected outputs total {} lanoshi, fee is {}",
            total, fee
        )));
    }

    let outputs = vec![Recipient {
        address: sender.clone(),
        amount: total - fee,
    }];
    let template = UnsignedTransaction::new(inputs.clone(), outputs, header_time(clock)?)?;
    let prev_scripts = fetch_prev_scripts(client, &template.inputs).await?;
    let signed = build_signed_transaction(&template, &prev_scripts, &key)?;
    let txid = client.broadcast(&signed.hex, Some(&signed.txid)).await?;

    log_info!(
        "operations",
        "Consolidation broadcast",
        txid = txid,
        sender = sender,
        inputs = signed.input_count,
        fee = signed.fee,
    );
    Ok(OperationResponse::ok(txid, total, signed.fee))
}

/// Pay the recipients from the sender's unspent outputs, change back to the
/// sender.
pub async fn send_payment(
    client: &NodeClient,
    request: &PaymentRequest,
    clock: &dyn Clock,
) -> OperationResponse {
    let result = try_send_payment(client, request, clock).await;
    if let Err(e) = &result {
        log_warn!("operations", "Payment failed", code = e.code.as_str(), reason = e.message);
    }
    result.into()
}

async fn try_send_payment(
    client: &NodeClient,
    request: &PaymentRequest,
    clock: &dyn Clock,
) -> LanaResult<OperationResponse> {
    let sender = require_valid_address(&request.sender_address)?;
    let key = key_for_sender(&request.private_key_wif, &sender)?;

    // Recipient checks run again in plan_outputs; doing them here keeps bad
    // input from costing a network round-trip.
    if request.recipients.is_empty() {
        return Err(LanaError::invalid_input("At least one recipient is required"));
    }
    let mut send_total: u64 = 0;
    for recipient in &request.recipients {
        require_valid_address(&recipient.address)?;
        if recipient.amount == 0 {
            return Err(LanaError::invalid_input("Recipient amount must be positive"));
        }
        send_total = send_total
            .checked_add(recipient.amount)
            .ok_or_else(|| LanaError::invalid_input("Recipient amounts overflow"))?;
    }

    let available = client.list_unspent(&sender).await?;
    let output_count = request.recipients.len() + 1;
    let fee_for = |n| estimate_fee(n, output_count);
    let (inputs, fee) = select_largest_first(&available, send_total, fee_for).ok_or_else(|| {
        LanaError::insufficient_funds(format!(
            "Cannot cover {} lanoshi plus fee with at most {} of {} outputs",
            send_total,
            MAX_BATCH_SIZE,
            available.len()
        ))
    })?;

    let input_total = checked_total(inputs.iter().map(|u| u.value_lanoshi))
        .ok_or_else(|| LanaError::protocol_error("Listed output values overflow"))?;
    let plan = plan_outputs(input_total, &request.recipients, fee, &sender)?;
    let template = UnsignedTransaction::new(inputs, plan.outputs, header_time(clock)?)?;
    let prev_scripts = fetch_prev_scripts(client, &template.inputs).await?;
    let signed = build_signed_transaction(&template, &prev_scripts, &key)?;
    let txid = client.broadcast(&signed.hex, Some(&signed.txid)).await?;

    log_info!(
        "operations",
        "Payment broadcast",
        txid = txid,
        sender = sender,
        payees = request.recipients.len(),
        inputs = signed.input_count,
        fee = signed.fee,
    );
    Ok(OperationResponse::ok(txid, send_total, signed.fee))
}

/// Import the WIF and check it controls `sender`.
fn key_for_sender(wif: &WifSecret, sender: &str) -> LanaResult<KeyPair> {
    let key = import_wif(wif.expose())?;
    if key.address() != sender {
        return Err(LanaError::invalid_private_key(
            "Private key does not control the sender address",
        ));
    }
    Ok(key)
}

fn check_distinct(inputs: &[Utxo]) -> LanaResult<()> {
    let mut seen = HashSet::with_capacity(inputs.len());
    for utxo in inputs {
        if !seen.insert((utxo.tx_hash.to_ascii_lowercase(), utxo.output_index)) {
            return Err(LanaError::invalid_input(format!("Output {} selected twice", utxo.key())));
        }
    }
    Ok(())
}

fn header_time(clock: &dyn Clock) -> LanaResult<u32> {
    u32::try_from(clock.unix_time())
        .map_err(|_| LanaError::internal("Clock is outside the transaction time range"))
}
