//! FFI Layer for Lana Core
//!
//! All C-ABI exports are defined here. Every function takes a JSON string
//! (null-terminated C string) and returns a JSON string that must be freed
//! with `lana_free_string`.
//!
//! Lookup calls answer `{success, data?, error?}`. The spend calls answer the
//! flat `OperationResponse` shape `{success, txid?, totalValue?, fee?, error?}`.
//!
//! Requests that reach the network may carry a `config` object (see
//! `NetworkConfig`) and/or `nodeEndpoints`; endpoints given on the request
//! replace the configured list.

use serde::Deserialize;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use crate::error::{LanaError, LanaResult};
use crate::log_debug;
use crate::node::NodeClient;
use crate::operations;
use crate::types::{
    ApiResponse, ConsolidationRequest, NodeEndpoint, OperationResponse, PaymentRequest, WifSecret,
};
use crate::utils::{NetworkConfig, SystemClock};
use crate::wallet::UtxoAnalyzer;

// =============================================================================
// Memory Management
// =============================================================================

/// Free a string returned by any lana_* function
///
/// # Safety
/// The pointer must have been returned by a lana_* function and not freed
/// before.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lana_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    drop(CString::from_raw(s));
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Borrow the C string as UTF-8
fn parse_input<'a>(input: *const c_char) -> LanaResult<&'a str> {
    if input.is_null() {
        return Err(LanaError::invalid_input("Null input pointer"));
    }
    // SAFETY: callers pass a valid NUL-terminated string that outlives the call
    let c_str = unsafe { CStr::from_ptr(input) };
    c_str
        .to_str()
        .map_err(|_| LanaError::invalid_input("Invalid UTF-8 string"))
}

fn parse_request<'a, T: Deserialize<'a>>(json: &'a str) -> LanaResult<T> {
    Ok(serde_json::from_str(json)?)
}

fn api_response<T: serde::Serialize>(result: LanaResult<T>) -> *mut c_char {
    let response = match result {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => ApiResponse::err(e),
    };
    string_to_ptr(response.to_json())
}

fn operation_response(response: OperationResponse) -> *mut c_char {
    let json = serde_json::to_string(&response).unwrap_or_else(|_| {
        r#"{"success":false,"error":"[internal] Serialization failed"}"#.to_string()
    });
    string_to_ptr(json)
}

/// Convert Rust string to C string pointer
fn string_to_ptr(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        // Serialized JSON never contains NUL; null tells the caller something
        // went badly wrong.
        Err(_) => std::ptr::null_mut(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkOverrides {
    #[serde(default)]
    config: Option<NetworkConfig>,
    #[serde(default)]
    node_endpoints: Vec<NodeEndpoint>,
}

impl NetworkOverrides {
    fn client(&self) -> LanaResult<NodeClient> {
        let config = self
            .config
            .clone()
            .unwrap_or_default()
            .overridden_by(&self.node_endpoints);
        NodeClient::new(config)
    }
}

/// Drive one async operation to completion on a fresh runtime
fn block_on<F: std::future::Future>(future: F) -> LanaResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| LanaError::internal(format!("Cannot start async runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

// =============================================================================
// Local Operations
// =============================================================================

#[derive(Deserialize)]
struct AddressRequest {
    address: String,
}

/// Validate a Lanacoin address
///
/// # Input
/// ```json
/// { "address": "L..." }
/// ```
///
/// # Output
/// ```json
/// { "success": true, "data": { "valid": false, "error": "Address checksum mismatch" } }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn lana_validate_address(input: *const c_char) -> *mut c_char {
    let result = parse_input(input)
        .and_then(parse_request::<AddressRequest>)
        .map(|request| operations::validate_address(&request.address));
    api_response(result)
}

#[derive(Deserialize)]
struct DeriveRequest {
    #[serde(rename = "privateKeyWIF")]
    private_key_wif: WifSecret,
}

/// Address and public key for a WIF private key
///
/// # Input
/// ```json
/// { "privateKeyWIF": "6u..." }
/// ```
///
/// # Output
/// ```json
/// { "success": true, "data": { "address": "L...", "publicKeyHex": "04..." } }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn lana_derive_address(input: *const c_char) -> *mut c_char {
    let result = parse_input(input)
        .and_then(parse_request::<DeriveRequest>)
        .and_then(|request| operations::derive_identity(&request.private_key_wif));
    api_response(result)
}

// =============================================================================
// Network Operations
// =============================================================================

/// List and analyze the unspent outputs of an address
///
/// # Input
/// ```json
/// { "address": "L...", "nodeEndpoints": [{"host": "...", "port": 50001}] }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn lana_analyze_address(input: *const c_char) -> *mut c_char {
    let result = (|| -> LanaResult<_> {
        let json = parse_input(input)?;
        let request: AddressRequest = parse_request(json)?;
        let overrides: NetworkOverrides = parse_request(json)?;
        let analyzer = UtxoAnalyzer::new(Arc::new(overrides.client()?));
        block_on(operations::analyze_address(&analyzer, &request.address))?
    })();
    api_response(result)
}

/// Consolidate selected outputs back into the sender address
///
/// # Input
/// ```json
/// {
///   "senderAddress": "L...",
///   "selectedUtxos": [
///     {"txHash": "...", "outputIndex": 0, "blockHeight": 1, "valueLanoshi": 50000}
///   ],
///   "privateKeyWIF": "6u...",
///   "nodeEndpoints": [{"host": "...", "port": 50001}]
/// }
/// ```
///
/// # Output
/// ```json
/// { "success": true, "txid": "...", "totalValue": 100000, "fee": 65700 }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn lana_consolidate(input: *const c_char) -> *mut c_char {
    let result = (|| -> LanaResult<_> {
        let json = parse_input(input)?;
        let request: ConsolidationRequest = parse_request(json)?;
        let overrides: NetworkOverrides = parse_request(json)?;
        let client = overrides.client()?;
        log_debug!("ffi", "Consolidation requested", inputs = request.selected_utxos.len());
        block_on(operations::consolidate(&client, &request, &SystemClock))
    })();
    operation_response(result.unwrap_or_else(|e| OperationResponse::failed(&e)))
}

/// Pay one or more recipients from the sender address
///
/// # Input
/// ```json
/// {
///   "senderAddress": "L...",
///   "recipients": [{"address": "L...", "amount": 100000}],
///   "privateKeyWIF": "6u...",
///   "nodeEndpoints": [{"host": "...", "port": 50001}]
/// }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn lana_send_payment(input: *const c_char) -> *mut c_char {
    let result = (|| -> LanaResult<_> {
        let json = parse_input(input)?;
        let request: PaymentRequest = parse_request(json)?;
        let overrides: NetworkOverrides = parse_request(json)?;
        let client = overrides.client()?;
        log_debug!("ffi", "Payment requested", payees = request.recipients.len());
        block_on(operations::send_payment(&client, &request, &SystemClock))
    })();
    operation_response(result.unwrap_or_else(|e| OperationResponse::failed(&e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: extern "C" fn(*const c_char) -> *mut c_char, json: &str) -> serde_json::Value {
        let input = CString::new(json).unwrap();
        let out = f(input.as_ptr());
        assert!(!out.is_null());
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        unsafe { lana_free_string(out) };
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_validate_address_ffi() {
        let value = call(
            lana_validate_address,
            r#"{"address":"LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubdM"}"#,
        );
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["valid"], true);

        let value = call(
            lana_validate_address,
            r#"{"address":"LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubd0"}"#,
        );
        assert_eq!(value["data"]["valid"], false);
        assert_eq!(value["data"]["error"], "Invalid character '0' at position 34");
    }

    #[test]
    fn test_derive_address_ffi() {
        let value = call(
            lana_derive_address,
            r#"{"privateKeyWIF":"6u823ozcyt2rjPH8Z2ErsSXJB5PPQwK7VVTwwN4mxLBFrao69XQ"}"#,
        );
        assert_eq!(value["data"]["address"], "LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubdM");
    }

    #[test]
    fn test_bad_json_and_null_input() {
        let value = call(lana_derive_address, "not json");
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "json_error");

        let out = lana_validate_address(std::ptr::null());
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        unsafe { lana_free_string(out) };
        assert!(text.contains("invalid_input"));
    }

    #[test]
    fn test_consolidate_without_endpoints_is_config_error() {
        let request = serde_json::json!({
            "senderAddress": "LYWKqJhtPeGyBAw7WC8R3F7ovxtzAiubdM",
            "selectedUtxos": [],
            "privateKeyWIF": "6u823ozcyt2rjPH8Z2ErsSXJB5PPQwK7VVTwwN4mxLBFrao69XQ"
        });
        let value = call(lana_consolidate, &request.to_string());
        assert_eq!(value["success"], false);
        let error = value["error"].as_str().unwrap();
        assert!(error.starts_with("[config_error]"));
        assert!(!error.contains("6u823"));
    }
}
