//! WebAssembly bindings for nginx2caddy
//!
//! Enables running the converter in the browser.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use nginx2caddy::service::{self, ConvertRequest, ConvertResponse, ResponseBody, MAX_PAYLOAD_BYTES};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Largest accepted input in bytes
#[wasm_bindgen]
pub fn get_max_payload_bytes() -> usize {
    MAX_PAYLOAD_BYTES
}

/// Result of conversion
#[derive(Serialize)]
struct ConvertResult {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    caddyfile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    warnings: Vec<Warning>,
}

/// Warning from conversion
#[derive(Serialize)]
struct Warning {
    severity: String,
    message: String,
    source_directive: String,
    suggestion: Option<String>,
}

/// Convert nginx configuration text to a Caddyfile
///
/// # Returns
/// A JavaScript object with:
/// - `status`: HTTP-style status (200, 400, 413 or 500)
/// - `caddyfile`: the generated Caddyfile (if successful)
/// - `error`: error message (if failed)
/// - `warnings`: array of warnings from conversion
#[wasm_bindgen]
pub fn convert(config: &str) -> JsValue {
    let response = service::handle(ConvertRequest::Text(config.to_string()));
    to_js(build_result(response))
}

/// Convert an uploaded `.conf` file
#[wasm_bindgen]
pub fn convert_upload(filename: &str, bytes: &[u8]) -> JsValue {
    let response = service::handle(ConvertRequest::Upload {
        filename: filename.to_string(),
        bytes: bytes.to_vec(),
    });
    to_js(build_result(response))
}

fn to_js(result: ConvertResult) -> JsValue {
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn build_result(response: ConvertResponse) -> ConvertResult {
    let warnings = response
        .diagnostics
        .warnings
        .iter()
        .map(|w| Warning {
            severity: w.severity.to_string(),
            message: w.message.clone(),
            source_directive: w.source_directive.clone(),
            suggestion: w.suggestion.clone(),
        })
        .collect();

    let (caddyfile, error) = match response.body {
        ResponseBody::Converted { caddyfile } => (Some(caddyfile), None),
        ResponseBody::Failed { error } => (None, Some(error)),
    };

    ConvertResult {
        status: response.status,
        caddyfile,
        error,
        warnings,
    }
}
