//! Conversion diagnostics and warnings

use serde::{Deserialize, Serialize};

/// Conversion diagnostics and warnings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Directives translated to an active Caddyfile directive
    pub converted: Vec<ConvertedItem>,
    /// Items that couldn't be fully converted
    pub warnings: Vec<ConversionWarning>,
    /// Items emitted only as comments, or dropped
    pub skipped: Vec<SkippedItem>,
}

impl Diagnostics {
    pub fn convert(&mut self, directive: impl Into<String>, target: impl Into<String>, line: Option<usize>) {
        self.converted.push(ConvertedItem {
            directive: directive.into(),
            target: target.into(),
            line,
        });
    }

    pub fn warn(
        &mut self,
        severity: Severity,
        source_directive: impl Into<String>,
        message: impl Into<String>,
        line: Option<usize>,
    ) {
        self.warnings.push(ConversionWarning {
            severity,
            line,
            source_directive: source_directive.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub fn skip(&mut self, directive: impl Into<String>, reason: impl Into<String>, line: Option<usize>) {
        self.skipped.push(SkippedItem {
            directive: directive.into(),
            reason: reason.into(),
            line,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.skipped.is_empty()
    }
}

/// Successfully converted item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedItem {
    pub directive: String,
    pub target: String,
    pub line: Option<usize>,
}

/// Conversion warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionWarning {
    pub severity: Severity,
    pub line: Option<usize>,
    pub source_directive: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ConversionWarning {
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Skipped item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub directive: String,
    pub reason: String,
    pub line: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_clean() {
        let mut report = Diagnostics::default();
        report.convert("root", "root", Some(3));
        assert!(report.is_clean());

        report.skip("autoindex", "no Caddyfile equivalent", Some(7));
        assert_eq!(report.converted.len(), 1);
        assert_eq!(report.skipped[0].directive, "autoindex");
        assert!(!report.is_clean());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
