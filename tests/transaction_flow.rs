//! Consolidation and payment end to end against a mock node
//!
//! The mock serves a funding transaction paying to the test key, accepts the
//! broadcast, and the test then checks every input signature with
//! libsecp256k1.

use lana_core::node::NodeClient;
use lana_core::operations;
use lana_core::tx::{
    decode_transaction_hex, p2pkh_script, signature_hash, OutPoint, Transaction, TxIn, TxOut,
};
use lana_core::types::{
    ConsolidationRequest, NodeEndpoint, PaymentRequest, Recipient, Utxo, WifSecret,
};
use lana_core::utils::{ManualClock, NetworkConfig};
use lana_core::wallet::{address_to_pubkey_hash, import_wif};
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

mod common;
use common::{spawn_server, Reply};

const WIF_ONE: &str = "6u823ozcyt2rjPH8Z2ErsSXJB5PPQwK7VVTwwN4mxLBFrao69XQ";
const ADDRESS_ONE: &str = "LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubdM";
const ADDRESS_TWO: &str = "LeodYX3rLdSYHJh1YRV8x4kJUGpigtMm6U";
const NOW: u64 = 1_700_000_000;

/// Funding transaction with one output per value, each paying `address`
fn funding_tx(address: &str, values: &[u64], salt: u8) -> Transaction {
    let script = p2pkh_script(&address_to_pubkey_hash(address).unwrap());
    Transaction {
        version: 1,
        time: 1_600_000_000,
        inputs: vec![TxIn {
            prev_out: OutPoint { txid: [salt; 32], vout: 0 },
            script_sig: vec![0x51],
            sequence: 0xffff_ffff,
        }],
        outputs: values
            .iter()
            .map(|&value| TxOut { value, script_pubkey: script.clone() })
            .collect(),
        lock_time: 0,
    }
}

/// Mock node state: known transactions, listing, and what was broadcast
struct Chain {
    transactions: HashMap<String, String>,
    unspent: Vec<Value>,
    broadcasts: Mutex<Vec<String>>,
}

impl Chain {
    fn new(funding: &[&Transaction]) -> Self {
        let mut transactions = HashMap::new();
        let mut unspent = Vec::new();
        for tx in funding {
            let txid = tx.txid();
            for (vout, out) in tx.outputs.iter().enumerate() {
                unspent.push(json!({
                    "tx_hash": txid,
                    "tx_pos": vout,
                    "height": 900,
                    "value": out.value
                }));
            }
            transactions.insert(txid, hex::encode(tx.serialize()));
        }
        Self {
            transactions,
            unspent,
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    fn answer(&self, request: &Value) -> Reply {
        let id = &request["id"];
        let param = request["params"][0].as_str().unwrap_or_default().to_string();
        let reply = match request["method"].as_str() {
            Some("blockchain.address.listunspent") => json!({"id": id, "result": self.unspent}),
            Some("blockchain.transaction.get") => match self.transactions.get(&param) {
                Some(raw) => json!({"id": id, "result": raw}),
                None => json!({"id": id, "error": {"code": 2, "message": "unknown transaction"}}),
            },
            Some("blockchain.transaction.broadcast") => {
                let txid = decode_transaction_hex(&param).unwrap().txid();
                self.broadcasts.lock().unwrap().push(param);
                json!({"id": id, "result": txid})
            }
            _ => json!({"id": id, "error": "unsupported"}),
        };
        Reply::Line(reply.to_string())
    }
}

async fn serve(chain: Arc<Chain>) -> NodeClient {
    let handler_chain = chain.clone();
    let (endpoint, _) = spawn_server(move |request| handler_chain.answer(request)).await;
    client_for(endpoint)
}

fn client_for(endpoint: NodeEndpoint) -> NodeClient {
    let mut config = NetworkConfig::with_endpoints(vec![endpoint]);
    config.retry_delay_ms = 10;
    config.request_timeout_ms = 2_000;
    NodeClient::new(config).unwrap()
}

/// Check each scriptSig against the pre-image of the unsigned transaction
fn assert_signatures_valid(signed: &Transaction, prev_scripts: &[Vec<u8>]) {
    let key = import_wif(WIF_ONE).unwrap();
    let secp = Secp256k1::verification_only();
    let public = PublicKey::from_slice(key.public_key().as_bytes()).unwrap();

    let mut unsigned = signed.clone();
    for input in &mut unsigned.inputs {
        input.script_sig.clear();
    }

    for (index, input) in signed.inputs.iter().enumerate() {
        let script = &input.script_sig;
        let sig_len = script[0] as usize;
        assert_eq!(script[sig_len], 0x01, "SIGHASH_ALL byte");
        assert_eq!(script[sig_len + 1], 65);
        assert_eq!(&script[sig_len + 2..], key.public_key().as_bytes());

        let signature = ecdsa::Signature::from_der(&script[1..sig_len]).unwrap();
        let mut normalized = signature;
        normalized.normalize_s();
        assert_eq!(normalized, signature, "signature must already be low-S");

        let digest = signature_hash(&unsigned, prev_scripts, index).unwrap();
        let message = Message::from_digest(digest);
        secp.verify_ecdsa(&message, &signature, &public).unwrap();
    }
}

fn utxo_from(tx: &Transaction, vout: u32) -> Utxo {
    Utxo::new(tx.txid(), vout, 900, tx.outputs[vout as usize].value)
}

#[tokio::test]
async fn consolidation_signs_and_broadcasts() {
    let funding = funding_tx(ADDRESS_ONE, &[60_000, 45_000], 0x11);
    let chain = Arc::new(Chain::new(&[&funding]));
    let client = serve(chain.clone()).await;

    let request = ConsolidationRequest {
        sender_address: ADDRESS_ONE.into(),
        selected_utxos: vec![utxo_from(&funding, 0), utxo_from(&funding, 1)],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::consolidate(&client, &request, &ManualClock::new(NOW)).await;

    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.total_value, Some(105_000));
    assert_eq!(response.fee, Some(65_700));

    let broadcasts = chain.broadcasts.lock().unwrap().clone();
    assert_eq!(broadcasts.len(), 1);
    let signed = decode_transaction_hex(&broadcasts[0]).unwrap();
    assert_eq!(Some(signed.txid()), response.txid);
    assert_eq!(signed.time, NOW as u32);
    assert_eq!(signed.inputs.len(), 2);
    assert_eq!(signed.outputs.len(), 1);
    assert_eq!(signed.outputs[0].value, 39_300);
    assert_eq!(signed.outputs[0].script_pubkey, funding.outputs[0].script_pubkey);

    let prev = vec![funding.outputs[0].script_pubkey.clone(); 2];
    assert_signatures_valid(&signed, &prev);
}

#[tokio::test]
async fn payment_selects_largest_and_returns_change() {
    let small = funding_tx(ADDRESS_ONE, &[15_000, 20_000], 0x21);
    let large = funding_tx(ADDRESS_ONE, &[200_000], 0x22);
    let chain = Arc::new(Chain::new(&[&small, &large]));
    let client = serve(chain.clone()).await;

    let request = PaymentRequest {
        sender_address: ADDRESS_ONE.into(),
        recipients: vec![Recipient { address: ADDRESS_TWO.into(), amount: 100_000 }],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::send_payment(&client, &request, &ManualClock::new(NOW)).await;

    assert!(response.success, "{:?}", response.error);
    // One input, recipient plus change: (180 + 2*34 + 10) * 150
    assert_eq!(response.fee, Some(38_700));

    let broadcasts = chain.broadcasts.lock().unwrap().clone();
    let signed = decode_transaction_hex(&broadcasts[0]).unwrap();
    assert_eq!(signed.inputs.len(), 1);
    assert_eq!(signed.inputs[0].prev_out.display_txid(), large.txid());
    assert_eq!(signed.outputs.len(), 2);
    assert_eq!(signed.outputs[0].value, 100_000);
    assert_eq!(
        signed.outputs[0].script_pubkey,
        p2pkh_script(&address_to_pubkey_hash(ADDRESS_TWO).unwrap())
    );
    assert_eq!(signed.outputs[1].value, 61_300);

    assert_signatures_valid(&signed, &[large.outputs[0].script_pubkey.clone()]);
}

#[tokio::test]
async fn payment_beyond_balance_is_insufficient_funds() {
    let funding = funding_tx(ADDRESS_ONE, &[50_000], 0x31);
    let chain = Arc::new(Chain::new(&[&funding]));
    let client = serve(chain.clone()).await;

    let request = PaymentRequest {
        sender_address: ADDRESS_ONE.into(),
        recipients: vec![Recipient { address: ADDRESS_TWO.into(), amount: 40_000 }],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::send_payment(&client, &request, &ManualClock::new(NOW)).await;

    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("[insufficient_funds]"));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_prior_transaction_stops_before_signing() {
    let funding = funding_tx(ADDRESS_ONE, &[90_000, 90_000], 0x41);
    let chain = Arc::new(Chain::new(&[]));
    let client = serve(chain.clone()).await;

    let request = ConsolidationRequest {
        sender_address: ADDRESS_ONE.into(),
        selected_utxos: vec![utxo_from(&funding, 0), utxo_from(&funding, 1)],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::consolidate(&client, &request, &ManualClock::new(NOW)).await;

    assert!(!response.success);
    let error = response.error.unwrap();
    assert!(error.starts_with("[script_fetch_failed]"), "{}", error);
    assert!(!error.contains(WIF_ONE));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn substituted_prior_transaction_is_rejected() {
    let funding = funding_tx(ADDRESS_ONE, &[90_000, 90_000], 0x51);
    let imposter = funding_tx(ADDRESS_ONE, &[90_000, 90_000], 0x52);
    let mut chain = Chain::new(&[]);
    chain
        .transactions
        .insert(funding.txid(), hex::encode(imposter.serialize()));
    let chain = Arc::new(chain);
    let client = serve(chain.clone()).await;

    let request = ConsolidationRequest {
        sender_address: ADDRESS_ONE.into(),
        selected_utxos: vec![utxo_from(&funding, 0), utxo_from(&funding, 1)],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::consolidate(&client, &request, &ManualClock::new(NOW)).await;

    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("[script_fetch_failed]"));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn outputs_of_another_key_are_not_signed() {
    let foreign = funding_tx(ADDRESS_TWO, &[120_000, 120_000], 0x61);
    let chain = Arc::new(Chain::new(&[&foreign]));
    let client = serve(chain.clone()).await;

    let request = ConsolidationRequest {
        sender_address: ADDRESS_ONE.into(),
        selected_utxos: vec![utxo_from(&foreign, 0), utxo_from(&foreign, 1)],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::consolidate(&client, &request, &ManualClock::new(NOW)).await;

    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("[invalid_transaction]"));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn understated_listing_value_is_not_signed() {
    let funding = funding_tx(ADDRESS_ONE, &[1_000_000_000], 0x71);
    let mut chain = Chain::new(&[&funding]);
    // Listed far below what the output holds
    chain.unspent[0]["value"] = json!(200_000);
    let chain = Arc::new(chain);
    let client = serve(chain.clone()).await;

    let request = PaymentRequest {
        sender_address: ADDRESS_ONE.into(),
        recipients: vec![Recipient { address: ADDRESS_TWO.into(), amount: 100_000 }],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::send_payment(&client, &request, &ManualClock::new(NOW)).await;

    assert!(!response.success);
    let error = response.error.unwrap();
    assert!(error.starts_with("[invalid_transaction]"), "{}", error);
    assert!(error.contains("1000000000"));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn overstated_consolidation_input_is_not_signed() {
    let funding = funding_tx(ADDRESS_ONE, &[60_000, 45_000], 0x72);
    let chain = Arc::new(Chain::new(&[&funding]));
    let client = serve(chain.clone()).await;

    let mut inflated = utxo_from(&funding, 1);
    inflated.value_lanoshi = 450_000;
    let request = ConsolidationRequest {
        sender_address: ADDRESS_ONE.into(),
        selected_utxos: vec![utxo_from(&funding, 0), inflated],
        private_key_wif: WifSecret::new(WIF_ONE),
        node_endpoints: vec![],
    };
    let response = operations::consolidate(&client, &request, &ManualClock::new(NOW)).await;

    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("[invalid_transaction]"));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}
