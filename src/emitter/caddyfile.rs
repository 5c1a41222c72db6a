//! Caddyfile output generation

use crate::diagnostics::{ConversionWarning, Diagnostics, Severity};
use crate::mapping::{advisory, fold_lines, DirectiveTranslator, TranslationKind};
use crate::nginx::{Block, BlockKind, Directive, NginxConfig};
use std::collections::HashSet;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Port used when a server block has no `listen`
pub const DEFAULT_PORT: &str = "80";

/// Location modifiers that introduce a regular expression or exact match
const REGEX_MARKERS: &[&str] = &["~*", "~", "="];

/// Options for Caddyfile emission
#[derive(Debug, Clone)]
pub struct EmitterOptions {
    /// Spaces per nesting level
    pub indent_width: usize,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self { indent_width: 2 }
    }
}

/// Request matcher synthesized from a `location` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    /// Matches every request
    Any,
    /// `path <prefix>`
    Path(String),
    /// Named matcher evaluating a regular expression
    Regex { name: String, expression: String },
}

impl PathMatcher {
    /// Build a matcher from location arguments such as `~* \.php$`
    pub fn from_location(args: &str) -> Self {
        let mut parts = args.split_whitespace();
        let Some(first) = parts.next() else {
            return Self::Any;
        };

        if !REGEX_MARKERS.contains(&first) {
            return Self::Path(args.trim().to_string());
        }

        let pattern = parts.collect::<Vec<_>>().join(" ");
        if pattern.is_empty() {
            return Self::Any;
        }

        let expression = if first == "~*" {
            format!("(?i){pattern}")
        } else {
            pattern
        };
        Self::Regex {
            name: matcher_name(&expression),
            expression,
        }
    }

    /// Matcher token as written after `handle`
    pub fn token(&self) -> String {
        match self {
            Self::Any => "*".to_string(),
            Self::Path(path) => format!("path {path}"),
            Self::Regex { name, .. } => name.clone(),
        }
    }
}

/// Stable matcher name for an expression
pub fn matcher_name(expression: &str) -> String {
    format!("@re_{:016x}", xxh3_64(expression.as_bytes()))
}

/// Caddyfile emitter walking the parsed block forest
pub struct CaddyfileEmitter<'a> {
    options: EmitterOptions,
    translator: DirectiveTranslator<'a>,
}

/// Accumulated output of one emission
struct Output<'d> {
    lines: Vec<String>,
    /// Named matchers already defined in the current site block
    matchers: HashSet<String>,
    diagnostics: &'d mut Diagnostics,
}

impl Output<'_> {
    fn push(&mut self, indent: &str, text: impl AsRef<str>) {
        self.lines.push(format!("{indent}{}", text.as_ref()));
    }
}

impl CaddyfileEmitter<'static> {
    pub fn new(options: EmitterOptions) -> Self {
        Self::with_translator(options, DirectiveTranslator::default())
    }
}

impl Default for CaddyfileEmitter<'static> {
    fn default() -> Self {
        Self::new(EmitterOptions::default())
    }
}

impl<'a> CaddyfileEmitter<'a> {
    pub fn with_translator(options: EmitterOptions, translator: DirectiveTranslator<'a>) -> Self {
        Self {
            options,
            translator,
        }
    }

    /// Emit the Caddyfile text for a parsed configuration
    pub fn emit(&self, config: &NginxConfig, diagnostics: &mut Diagnostics) -> String {
        if config.is_empty() {
            return String::new();
        }

        let mut output = Output {
            lines: Vec::new(),
            matchers: HashSet::new(),
            diagnostics,
        };

        self.emit_directives(&config.directives, 0, &mut output);
        for block in &config.blocks {
            self.emit_block(block, 0, &mut output);
        }

        debug!(lines = output.lines.len(), "emitted Caddyfile");
        output.lines.join("\n")
    }

    fn indent(&self, level: usize) -> String {
        " ".repeat(level * self.options.indent_width)
    }

    fn emit_directives(&self, directives: &[Directive], level: usize, output: &mut Output<'_>) {
        let indent = self.indent(level);

        for directive in directives {
            if BlockKind::is_marker(&directive.name) {
                continue;
            }

            let translated = self.translator.translate(&directive.name, &directive.value);
            let line = Some(directive.line);
            match translated.kind {
                TranslationKind::Mapped => {
                    output.diagnostics.convert(&directive.name, &translated.name, line);
                }
                TranslationKind::Commented => {}
                TranslationKind::Unmapped => {
                    output.diagnostics.skip(
                        &directive.name,
                        "no Caddyfile equivalent, kept as comment",
                        line,
                    );
                    if let Some(suggestion) = advisory(&directive.name) {
                        output.diagnostics.warnings.push(
                            ConversionWarning {
                                severity: Severity::Warning,
                                line,
                                source_directive: format!("{} {}", directive.name, directive.value),
                                message: format!("`{}` is not supported", directive.name),
                                suggestion: None,
                            }
                            .with_suggestion(suggestion),
                        );
                    }
                }
            }

            output.lines.extend(translated.render(&indent));
        }
    }

    fn emit_block(&self, block: &Block, level: usize, output: &mut Output<'_>) {
        let indent = self.indent(level);

        match &block.kind {
            BlockKind::Http => {
                self.emit_directives(&block.directives, level, output);
                self.emit_children(block, level, output);
            }
            BlockKind::Server => {
                let outer = std::mem::take(&mut output.matchers);
                output.push(&indent, format!("{} {{", self.site_address(block)));
                self.emit_directives(&block.directives, level + 1, output);
                self.emit_children(block, level + 1, output);
                output.push(&indent, "}");
                output.matchers = outer;
            }
            BlockKind::Location => {
                let args = self.translator.variables().substitute(&block.args);
                let matcher = PathMatcher::from_location(&args);

                if let PathMatcher::Regex { name, expression } = &matcher {
                    if output.matchers.insert(name.clone()) {
                        output.push(&indent, format!("{name} {{"));
                        output.push(&self.indent(level + 1), format!("expression {expression}"));
                        output.push(&indent, "}");
                    }
                }

                output.push(&indent, format!("handle {} {{", matcher.token()));
                self.emit_directives(&block.directives, level + 1, output);
                self.emit_children(block, level + 1, output);
                output.push(&indent, "}");
            }
            BlockKind::Other(kind) => {
                debug!(kind = %kind, line = block.line, "passing block through as comment");
                output.diagnostics.skip(
                    block.header(),
                    "block has no Caddyfile equivalent, kept as comment",
                    Some(block.line),
                );
                self.emit_inert(block, &indent, 0, output);
            }
        }
    }

    fn emit_children(&self, block: &Block, level: usize, output: &mut Output<'_>) {
        for child in &block.children {
            self.emit_block(child, level, output);
        }
    }

    /// Site address from the last `listen` and `server_name`
    fn site_address(&self, block: &Block) -> String {
        let variables = self.translator.variables();

        let port = block
            .last_directive("listen")
            .and_then(Directive::first_arg)
            .unwrap_or(DEFAULT_PORT);
        let domains: Vec<&str> = block
            .last_directive("server_name")
            .map(|d| d.args().collect())
            .unwrap_or_default();

        let address = if domains.is_empty() {
            format!(":{port}")
        } else {
            format!("{}:{port}", domains.join(" "))
        };
        variables.substitute(&address).into_owned()
    }

    /// Comment out a block verbatim, nested levels indented inside the comment
    fn emit_inert(&self, block: &Block, indent: &str, nesting: usize, output: &mut Output<'_>) {
        let variables = self.translator.variables();
        let pad = self.indent(nesting);
        let inner = self.indent(nesting + 1);

        let header = block.header();
        let header = variables.substitute(&header);
        output.push(indent, format!("# {pad}{} {{", fold_lines(&header)));
        for directive in &block.directives {
            let value = variables.substitute(&directive.value);
            let value = fold_lines(&value);
            let entry = match (directive.name.as_str(), value.as_ref()) {
                (name, "") => name.to_string(),
                ("", value) => value.to_string(),
                (name, value) => format!("{name} {value}"),
            };
            output.push(indent, format!("# {inner}{entry};"));
        }
        for child in &block.children {
            self.emit_inert(child, indent, nesting + 1, output);
        }
        output.push(indent, format!("# {pad}}}"));
    }
}
