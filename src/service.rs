//! Transport-free request handling for conversion front ends
//!
//! An HTTP or browser front end hands either an uploaded file or raw text
//! to [`handle`] and forwards the returned status and JSON body as is.

use crate::diagnostics::Diagnostics;
use crate::{convert_with, ConversionResult, ConvertOptions};
use serde::Serialize;
use tracing::{debug, warn};

/// Largest accepted request payload (16 KiB)
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Required suffix for uploaded files
pub const CONFIG_SUFFIX: &str = ".conf";

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Input of a conversion request
#[derive(Debug, Clone)]
pub enum ConvertRequest {
    /// Uploaded file; ignored unless its name ends in `.conf`
    Upload { filename: String, bytes: Vec<u8> },
    /// Raw text field
    Text(String),
}

impl ConvertRequest {
    fn payload_len(&self) -> usize {
        match self {
            Self::Upload { filename, bytes } => filename.len() + bytes.len(),
            Self::Text(text) => text.len(),
        }
    }
}

/// JSON body of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Converted { caddyfile: String },
    Failed { error: String },
}

/// Status and body to hand back to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertResponse {
    pub status: u16,
    pub body: ResponseBody,
    /// Not part of the body; empty unless conversion ran
    pub diagnostics: Diagnostics,
}

impl ConvertResponse {
    fn converted(result: ConversionResult) -> Self {
        Self {
            status: STATUS_OK,
            body: ResponseBody::Converted {
                caddyfile: result.caddyfile,
            },
            diagnostics: result.diagnostics,
        }
    }

    fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Failed {
                error: error.into(),
            },
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Serialize the body
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.body)
    }
}

/// Handle a request with default conversion options
pub fn handle(request: ConvertRequest) -> ConvertResponse {
    handle_with(request, &ConvertOptions::default())
}

/// Handle a request
pub fn handle_with(request: ConvertRequest, options: &ConvertOptions) -> ConvertResponse {
    let size = request.payload_len();
    if size > MAX_PAYLOAD_BYTES {
        warn!(size, limit = MAX_PAYLOAD_BYTES, "rejecting oversized payload");
        return ConvertResponse::failed(
            STATUS_PAYLOAD_TOO_LARGE,
            format!("payload of {size} bytes exceeds the {MAX_PAYLOAD_BYTES} byte limit"),
        );
    }

    let source = match request {
        ConvertRequest::Upload { filename, bytes } if filename.ends_with(CONFIG_SUFFIX) => {
            match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    return ConvertResponse::failed(
                        STATUS_BAD_REQUEST,
                        format!("uploaded file `{filename}` is not valid UTF-8"),
                    )
                }
            }
        }
        ConvertRequest::Upload { filename, .. } => {
            debug!(filename = %filename, "ignoring upload without .conf suffix");
            String::new()
        }
        ConvertRequest::Text(text) => text,
    };

    if source.trim().is_empty() {
        return ConvertResponse::failed(STATUS_BAD_REQUEST, "no valid input provided");
    }

    match convert_with(&source, options) {
        Ok(result) => ConvertResponse::converted(result),
        Err(e) => ConvertResponse::failed(STATUS_INTERNAL_ERROR, e.to_string()),
    }
}
