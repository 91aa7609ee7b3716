//! Node wire protocol
//!
//! Newline-delimited JSON over TCP. One request line out, one response line
//! back:
//!
//! ```text
//! {"id":1,"method":"blockchain.transaction.get","params":["<txid>"]}\n
//! {"id":1,"result":"0100..."}\n
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::error::{LanaError, LanaResult};

pub const METHOD_LIST_UNSPENT: &str = "blockchain.address.listunspent";
pub const METHOD_GET_TRANSACTION: &str = "blockchain.transaction.get";
pub const METHOD_BROADCAST: &str = "blockchain.transaction.broadcast";

/// Longest excerpt of a reply copied into an error message
const EXCERPT_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// JSON followed by `\n`
    pub fn to_line(&self) -> LanaResult<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Parsed reply; `error` is `None` when absent or null
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub id: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub raw: String,
}

impl RpcResponse {
    pub fn into_result(self) -> LanaResult<Value> {
        if let Some(error) = &self.error {
            return Err(LanaError::remote_error(describe_remote_error(error)));
        }
        self.result
            .ok_or_else(|| LanaError::protocol_error("Response has neither result nor error"))
    }
}

/// Parse one response line for request `expected_id`
pub fn parse_response(line: &str, expected_id: u64) -> LanaResult<RpcResponse> {
    let trimmed = line.trim();
    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        LanaError::protocol_error(format!("Malformed JSON response: {}", e))
            .with_details(excerpt(trimmed))
    })?;

    let object = value.as_object().ok_or_else(|| {
        LanaError::protocol_error("Response is not a JSON object").with_details(excerpt(trimmed))
    })?;

    let id = object.get("id").filter(|v| !v.is_null()).cloned();
    if let Some(id) = &id {
        if id.as_u64() != Some(expected_id) {
            return Err(LanaError::protocol_error(format!(
                "Response id {} does not match request id {}",
                id, expected_id
            )));
        }
    }

    Ok(RpcResponse {
        id,
        result: object.get("result").cloned(),
        error: object.get("error").filter(|v| !v.is_null()).cloned(),
        raw: trimmed.to_string(),
    })
}

/// Message text from `{"code":..,"message":..}`, a bare string, or anything else
pub fn describe_remote_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => match map.get("code") {
                Some(code) => format!("{} (code {})", message, code),
                None => message.to_string(),
            },
            None => excerpt(&error.to_string()),
        },
        other => excerpt(&other.to_string()),
    }
}

pub(crate) fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_LEN {
        text.to_string()
    } else {
        let cut: String = text.chars().take(EXCERPT_LEN).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_request_line() {
        let line = RpcRequest::new(7, METHOD_GET_TRANSACTION, vec![json!("ab")])
            .to_line()
            .unwrap();
        assert_eq!(
            line,
            "{\"id\":7,\"method\":\"blockchain.transaction.get\",\"params\":[\"ab\"]}\n"
        );
    }

    #[test]
    fn test_parse_result() {
        let response = parse_response("{\"id\":3,\"result\":[1,2]}\n", 3).unwrap();
        assert_eq!(response.into_result().unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_null_error_is_ignored() {
        let response = parse_response(r#"{"id":1,"result":"ok","error":null}"#, 1).unwrap();
        assert!(response.error.is_none());
    }

    #[test]
    fn test_error_field_is_remote_error() {
        let raw = r#"{"id":1,"error":{"code":-5,"message":"No such transaction"}}"#;
        let response = parse_response(raw, 1).unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteError);
        assert!(err.message.contains("No such transaction"));
    }

    #[test]
    fn test_malformed_json_is_protocol_error() {
        let err = parse_response("not json at all", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProtocolError);
        assert_eq!(parse_response("[1]", 1).unwrap_err().code, ErrorCode::ProtocolError);
    }

    #[test]
    fn test_id_mismatch() {
        let err = parse_response(r#"{"id":9,"result":1}"#, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProtocolError);
    }

    #[test]
    fn test_missing_result_and_error() {
        let response = parse_response(r#"{"id":1}"#, 1).unwrap();
        assert_eq!(response.into_result().unwrap_err().code, ErrorCode::ProtocolError);
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), EXCERPT_LEN + 3);
        assert_eq!(excerpt("short"), "short");
    }
}
