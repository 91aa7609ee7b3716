//! Broadcast reply interpretation
//!
//! Checked in order:
//! 1. an `error` field is a rejection
//! 2. a 64-hex-character result is the accepted txid
//! 3. a reply containing known rejection wording is a rejection
//! 4. anything else is an unexpected reply
//!
//! Step 3 matches servers that report rejection as a plain `result` string
//! (e.g. `"the transaction was rejected by network rules"`). Rejections are
//! terminal; the same bytes are never resubmitted.

use serde_json::Value;

use super::protocol::{describe_remote_error, excerpt, RpcResponse};
use crate::error::{LanaError, LanaResult};
use crate::{log_info, log_warn};

/// Lowercase fragments that mark a rejection in free-form replies
pub const REJECTION_MARKERS: &[&str] = &[
    "rejected",
    "error",
    "failed",
    "invalid",
    "missing inputs",
    "bad-txns",
    "non-final",
    "non-mandatory-script-verify-flag",
    "mandatory-script-verify-flag",
    "insufficient",
    "dust",
    "txn-mempool-conflict",
    "already in block chain",
    "min relay fee not met",
];

pub fn is_txid(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn contains_rejection(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    REJECTION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Accepted txid, or `BroadcastRejected`/`ProtocolError`
pub fn interpret_broadcast(
    response: &RpcResponse,
    expected_txid: Option<&str>,
) -> LanaResult<String> {
    if let Some(error) = &response.error {
        let reason = describe_remote_error(error);
        log_warn!("broadcast", "Node rejected transaction", reason = reason);
        return Err(LanaError::broadcast_rejected(format!("Node rejected transaction: {}", reason)));
    }

    if let Some(Value::String(result)) = &response.result {
        let candidate = result.trim();
        if is_txid(candidate) {
            let txid = candidate.to_ascii_lowercase();
            if let Some(expected) = expected_txid {
                if !expected.eq_ignore_ascii_case(&txid) {
                    log_warn!(
                        "broadcast",
                        "Node reported a different txid",
                        txid = txid,
                        expected = expected,
                    );
                }
            }
            log_info!("broadcast", "Transaction accepted", txid = txid);
            return Ok(txid);
        }
        if contains_rejection(candidate) {
            return Err(LanaError::broadcast_rejected(format!(
                "Node rejected transaction: {}",
                excerpt(candidate)
            )));
        }
    } else if contains_rejection(&response.raw) {
        return Err(LanaError::broadcast_rejected(format!(
            "Node rejected transaction: {}",
            excerpt(&response.raw)
        )));
    }

    Err(LanaError::protocol_error("Unexpected broadcast reply")
        .with_details(excerpt(&response.raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::node::protocol::parse_response;

    fn reply(line: &str) -> RpcResponse {
        parse_response(line, 1).unwrap()
    }

    #[test]
    fn test_txid_result_is_success() {
        let txid = "AB".repeat(32);
        let response = reply(&format!(r#"{{"id":1,"result":"{}"}}"#, txid));
        assert_eq!(interpret_broadcast(&response, None).unwrap(), "ab".repeat(32));
    }

    #[test]
    fn test_error_field_is_rejection() {
        let response = reply(r#"{"id":1,"error":{"code":1,"message":"bad-txns-inputs-spent"}}"#);
        let err = interpret_broadcast(&response, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::BroadcastRejected);
        assert!(err.message.contains("bad-txns-inputs-spent"));
    }

    #[test]
    fn test_rejection_wording_in_result() {
        let response =
            reply(r#"{"id":1,"result":"the transaction was rejected by network rules"}"#);
        let err = interpret_broadcast(&response, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::BroadcastRejected);
    }

    #[test]
    fn test_rejection_wording_in_object() {
        let response = reply(r#"{"id":1,"result":{"status":"Missing inputs"}}"#);
        assert_eq!(
            interpret_broadcast(&response, None).unwrap_err().code,
            ErrorCode::BroadcastRejected
        );
    }

    #[test]
    fn test_unexpected_reply() {
        let response = reply(r#"{"id":1,"result":"queued"}"#);
        assert_eq!(
            interpret_broadcast(&response, None).unwrap_err().code,
            ErrorCode::ProtocolError
        );
    }

    #[test]
    fn test_is_txid() {
        assert!(is_txid(&"0f".repeat(32)));
        assert!(!is_txid(&"0f".repeat(31)));
        assert!(!is_txid(&"zz".repeat(32)));
    }
}
