//! nginx configuration model and parser

mod lexer;
mod parser;

pub use lexer::{tokenize, LexError, Token};
pub use parser::{parse, NginxParser, ParseOptions, ParseOutput};

use serde::Serialize;

/// Directive names that only mark the start of a recognized block
pub const MARKER_NAMES: &[&str] = &["http", "server", "location"];

/// Parsed nginx configuration
///
/// Directives outside every block belong to the implicit main context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NginxConfig {
    pub directives: Vec<Directive>,
    pub blocks: Vec<Block>,
}

impl NginxConfig {
    /// True when nothing but blank lines and comments was parsed
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty() && self.blocks.is_empty()
    }
}

/// Kind of a brace-delimited scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Pass-through grouping scope
    Http,
    /// Virtual host, becomes a Caddy site block
    Server,
    /// Path match, becomes a `handle` block
    Location,
    /// Anything else (`events`, `upstream`, `map`, `if`, ...)
    Other(String),
}

impl BlockKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "http" => Self::Http,
            "server" => Self::Server,
            "location" => Self::Location,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Http => "http",
            Self::Server => "server",
            Self::Location => "location",
            Self::Other(name) => name,
        }
    }

    /// Check if a directive name is one of the block markers
    pub fn is_marker(name: &str) -> bool {
        MARKER_NAMES.contains(&name)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single `name value` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    /// Empty for nameless entries kept inside pass-through blocks
    pub name: String,
    /// Raw value, opaque until translation
    pub value: String,
    pub line: usize,
}

impl Directive {
    pub fn new(name: impl Into<String>, value: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            line,
        }
    }

    /// Get the first whitespace-delimited token of the value
    pub fn first_arg(&self) -> Option<&str> {
        self.value.split_whitespace().next()
    }

    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.value.split_whitespace()
    }
}

/// One brace-delimited scope
///
/// Children are owned exclusively by their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    /// Header text after the kind identifier, e.g. `~* ^/api/`
    pub args: String,
    pub directives: Vec<Directive>,
    pub children: Vec<Block>,
    pub line: usize,
}

impl Block {
    pub fn new(kind: BlockKind, args: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            args: args.into(),
            directives: Vec::new(),
            children: Vec::new(),
            line,
        }
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    /// Find the last directive with a given name
    pub fn last_directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().rev().find(|d| d.name == name)
    }

    /// Find all directives with a given name
    pub fn find_all_directives(&self, name: &str) -> Vec<&Directive> {
        self.directives.iter().filter(|d| d.name == name).collect()
    }

    /// Header as written in the source, without the opening brace
    pub fn header(&self) -> String {
        if self.args.is_empty() {
            self.kind.name().to_string()
        } else {
            format!("{} {}", self.kind, self.args)
        }
    }
}
