//! nginx to Caddyfile converter
//!
//! Parses nginx configuration into a tree of blocks, translates each
//! directive, and renders an equivalent best-effort Caddyfile.

pub mod cli;
pub mod diagnostics;
pub mod emitter;
pub mod mapping;
pub mod nginx;
pub mod service;

pub use diagnostics::Diagnostics;
pub use emitter::{CaddyfileEmitter, EmitterOptions};
pub use nginx::{NginxParser, ParseOptions};

use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Structural error at line {line}: {message}")]
    Structure { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Convert nginx configuration text to Caddyfile text with default options
pub fn convert(source: &str) -> Result<String> {
    convert_with(source, &ConvertOptions::default()).map(|result| result.caddyfile)
}

/// Convert nginx configuration text, keeping the diagnostics
pub fn convert_with(source: &str, options: &ConvertOptions) -> Result<ConversionResult> {
    let parser = NginxParser::new(options.parse.clone());
    let output = parser.parse(source)?;
    debug!(
        directives = output.config.directives.len(),
        blocks = output.config.blocks.len(),
        "parsed nginx configuration"
    );

    let mut diagnostics = output.diagnostics;
    let emitter = CaddyfileEmitter::new(options.emitter.clone());
    let caddyfile = emitter.emit(&output.config, &mut diagnostics);

    Ok(ConversionResult {
        caddyfile,
        diagnostics,
    })
}

/// Convert an nginx configuration file
pub fn convert_file(path: &Path, options: &ConvertOptions) -> Result<ConversionResult> {
    let content = std::fs::read_to_string(path)?;
    convert_with(&content, options)
}

/// Options for conversion
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Parser options
    pub parse: ParseOptions,
    /// Emitter options
    pub emitter: EmitterOptions,
}

/// Complete conversion result
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Generated Caddyfile
    pub caddyfile: String,
    /// Conversion diagnostics
    pub diagnostics: Diagnostics,
}
