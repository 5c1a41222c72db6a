//! nginx configuration parser

use super::lexer::{leading_identifier, tokenize, Token};
use super::{Block, BlockKind, Directive, NginxConfig};
use crate::diagnostics::{Diagnostics, Severity};
use crate::{ConvertError, Result};
use tracing::{debug, warn};

/// Parser options
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Reject unbalanced braces instead of tolerating them
    pub strict_nesting: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict_nesting: true,
        }
    }
}

/// Result of parsing a configuration
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub config: NginxConfig,
    pub diagnostics: Diagnostics,
}

/// nginx configuration parser
#[derive(Debug, Clone, Default)]
pub struct NginxParser {
    options: ParseOptions,
}

impl NginxParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Parse nginx source text into a block forest
    pub fn parse(&self, input: &str) -> Result<ParseOutput> {
        let tokens = tokenize(input).map_err(|e| ConvertError::Parse {
            line: e.line,
            message: e.message,
        })?;

        let brace_ahead = brace_lookahead(&tokens);
        let mut state = ParseState::new(&self.options);
        for (i, (token, line)) in tokens.iter().enumerate() {
            let line = *line;
            match token {
                Token::Word(word) => state.push_word(word.clone(), line),
                Token::Unterminated(text) => state.abandon_statement(text, line),
                Token::Semicolon => state.end_statement(),
                // A header may put its brace on the next line
                Token::Newline if brace_ahead[i] => {}
                Token::Newline => state.end_statement(),
                Token::OpenBrace => state.open_block(line)?,
                Token::CloseBrace => {
                    state.end_statement();
                    state.close_block(line)?;
                }
                Token::Comment(_) => {}
            }
        }

        state.finish()
    }
}

/// Parse with default options
pub fn parse(input: &str) -> Result<NginxConfig> {
    NginxParser::default().parse(input).map(|output| output.config)
}

/// Transient state while walking the token stream
struct ParseState<'a> {
    options: &'a ParseOptions,
    config: NginxConfig,
    /// Currently open blocks, innermost last
    stack: Vec<Block>,
    /// Words of the statement being collected
    words: Vec<String>,
    /// Line of the first pending word
    line: usize,
    diagnostics: Diagnostics,
}

impl<'a> ParseState<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            config: NginxConfig::default(),
            stack: Vec::new(),
            words: Vec::new(),
            line: 0,
            diagnostics: Diagnostics::default(),
        }
    }

    fn push_word(&mut self, word: String, line: usize) {
        if self.words.is_empty() {
            self.line = line;
        }
        self.words.push(word);
    }

    /// Turn the pending words into a directive of the current block
    fn end_statement(&mut self) {
        if self.words.is_empty() {
            return;
        }
        let statement = std::mem::take(&mut self.words).join(" ");

        let directive = match split_directive(&statement) {
            Some((name, value)) => Directive::new(name, value, self.line),
            // Entries such as `'' close;` in a `map` survive in the commented copy
            None if self.in_inert_block() => Directive::new("", statement.as_str(), self.line),
            None => {
                debug!(line = self.line, statement = %statement, "dropping statement without a name");
                self.diagnostics.skip(
                    statement.as_str(),
                    "statement does not start with a directive name",
                    Some(self.line),
                );
                return;
            }
        };

        match self.stack.last_mut() {
            Some(block) => block.directives.push(directive),
            None => self.config.directives.push(directive),
        }
    }

    /// Drop the pending statement after a quote that never closes
    fn abandon_statement(&mut self, text: &str, line: usize) {
        self.push_word(text.to_string(), line);
        let statement = std::mem::take(&mut self.words).join(" ");

        warn!(line = self.line, "dropping statement with an unterminated quote");
        self.diagnostics.warn(
            Severity::Warning,
            statement,
            "unterminated quoted string, statement dropped",
            Some(self.line),
        );
    }

    /// True inside a block that is only passed through as a comment
    fn in_inert_block(&self) -> bool {
        self.stack
            .iter()
            .any(|block| matches!(block.kind, BlockKind::Other(_)))
    }

    fn open_block(&mut self, line: usize) -> Result<()> {
        let header_line = if self.words.is_empty() { line } else { self.line };
        let header = std::mem::take(&mut self.words).join(" ");

        let (args, kind) = leading_identifier(&header).map_err(|_| ConvertError::Parse {
            line: header_line,
            message: format!("cannot extract a block name from `{} {{`", header.trim()),
        })?;

        let block = Block::new(BlockKind::from_name(kind), args.trim(), header_line);
        debug!(line = header_line, kind = %block.kind, depth = self.stack.len(), "entering block");
        self.stack.push(block);
        Ok(())
    }

    fn close_block(&mut self, line: usize) -> Result<()> {
        match self.stack.pop() {
            Some(block) => {
                self.attach(block);
                Ok(())
            }
            None if self.options.strict_nesting => Err(ConvertError::Structure {
                line,
                message: "unexpected `}` with no open block".to_string(),
            }),
            None => {
                warn!(line, "ignoring unmatched `}}`");
                self.diagnostics.warn(
                    Severity::Warning,
                    "}",
                    "unmatched closing brace ignored",
                    Some(line),
                );
                Ok(())
            }
        }
    }

    fn attach(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(block),
            None => self.config.blocks.push(block),
        }
    }

    fn finish(mut self) -> Result<ParseOutput> {
        self.end_statement();

        if let Some(innermost) = self.stack.last() {
            if self.options.strict_nesting {
                return Err(ConvertError::Structure {
                    line: innermost.line,
                    message: format!("`{}` block is never closed", innermost.header()),
                });
            }

            warn!(open = self.stack.len(), "closing unterminated blocks at end of input");
            while let Some(block) = self.stack.pop() {
                self.diagnostics.warn(
                    Severity::Warning,
                    block.header(),
                    "block not closed before end of input",
                    Some(block.line),
                );
                self.attach(block);
            }
        }

        Ok(ParseOutput {
            config: self.config,
            diagnostics: self.diagnostics,
        })
    }
}

/// For each token, whether the next token that is not a newline or comment is `{`
fn brace_lookahead(tokens: &[(Token, usize)]) -> Vec<bool> {
    let mut ahead = vec![false; tokens.len()];
    let mut brace_next = false;
    for (i, (token, _)) in tokens.iter().enumerate().rev() {
        ahead[i] = brace_next;
        if !matches!(token, Token::Newline | Token::Comment(_)) {
            brace_next = *token == Token::OpenBrace;
        }
    }
    ahead
}

/// Split a statement into its directive name and raw value
fn split_directive(statement: &str) -> Option<(&str, &str)> {
    let (rest, name) = leading_identifier(statement).ok()?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((name, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient() -> NginxParser {
        NginxParser::new(ParseOptions {
            strict_nesting: false,
        })
    }

    #[test]
    fn test_parse_simple_directive() {
        let config = parse("worker_processes 4;").unwrap();

        assert_eq!(config.directives.len(), 1);
        assert_eq!(config.directives[0].name, "worker_processes");
        assert_eq!(config.directives[0].value, "4");
    }

    #[test]
    fn test_parse_block() {
        let input = r#"
            server {
                listen 80;
                server_name example.com www.example.com;
            }
        "#;
        let config = parse(input).unwrap();

        assert_eq!(config.blocks.len(), 1);
        let server = &config.blocks[0];
        assert_eq!(server.kind, BlockKind::Server);
        assert_eq!(server.line, 2);
        assert_eq!(server.directives.len(), 2);
        assert_eq!(server.directives[0].name, "listen");
        assert_eq!(server.directives[1].value, "example.com www.example.com");
    }

    #[test]
    fn test_parse_nested_blocks() {
        let input = r#"
            http {
                server {
                    location / {
                        proxy_pass http://backend;
                    }
                }
            }
        "#;
        let config = parse(input).unwrap();

        let http = &config.blocks[0];
        assert_eq!(http.kind, BlockKind::Http);

        let server = &http.children[0];
        assert_eq!(server.kind, BlockKind::Server);

        let location = &server.children[0];
        assert_eq!(location.kind, BlockKind::Location);
        assert_eq!(location.args, "/");
        assert_eq!(location.directives[0].name, "proxy_pass");
        assert_eq!(location.directives[0].value, "http://backend");
    }

    #[test]
    fn test_parse_single_line_blocks() {
        let config =
            parse("http { server { listen 80; location /api/ { proxy_pass http://b; } } }").unwrap();

        let server = &config.blocks[0].children[0];
        assert_eq!(server.directives[0].value, "80");
        assert_eq!(server.children[0].args, "/api/");
        assert_eq!(server.children[0].directives[0].value, "http://b");
    }

    #[test]
    fn test_brace_on_next_line() {
        let config = parse("location /static/\n# assets\n{\n    root /srv;\n}").unwrap();
        assert_eq!(config.blocks[0].kind, BlockKind::Location);
        assert_eq!(config.blocks[0].args, "/static/");
        assert_eq!(config.blocks[0].line, 1);
    }

    #[test]
    fn test_children_keep_source_order() {
        let config = parse("server {\nlocation /a {\n}\nlocation /b {\n}\n}").unwrap();
        let args: Vec<_> = config.blocks[0].children.iter().map(|b| b.args.as_str()).collect();
        assert_eq!(args, vec!["/a", "/b"]);
    }

    #[test]
    fn test_bare_directive_and_missing_terminator() {
        let config = parse("location / {\ndeny;\nroot /srv\n}").unwrap();
        let directives = &config.blocks[0].directives;

        assert_eq!(directives[0].name, "deny");
        assert_eq!(directives[0].value, "");
        assert_eq!(directives[1].name, "root");
        assert_eq!(directives[1].value, "/srv");
    }

    #[test]
    fn test_statement_without_name_is_skipped() {
        let output = NginxParser::default()
            .parse("server {\n'$remote_addr' x;\nlisten 80;\n}")
            .unwrap();

        assert_eq!(output.config.blocks[0].directives.len(), 1);
        assert_eq!(output.diagnostics.skipped.len(), 1);
        assert_eq!(output.diagnostics.skipped[0].line, Some(2));
    }

    #[test]
    fn test_malformed_header_is_parse_error() {
        let err = parse("server {\n~ ^/x {\n}\n}").unwrap_err();
        assert!(matches!(err, ConvertError::Parse { line: 2, .. }));

        let err = parse("{\n}").unwrap_err();
        assert!(matches!(err, ConvertError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_unterminated_block_is_structure_error() {
        let err = parse("http {\nserver {\nlisten 80;\n}").unwrap_err();
        match err {
            ConvertError::Structure { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("http"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_close_is_structure_error() {
        let err = parse("server {\n}\n}").unwrap_err();
        assert!(matches!(err, ConvertError::Structure { line: 3, .. }));
    }

    #[test]
    fn test_lenient_nesting() {
        let output = lenient().parse("}\nhttp {\nserver {\nlisten 80;").unwrap();

        assert_eq!(output.config.blocks.len(), 1);
        assert_eq!(output.config.blocks[0].children.len(), 1);
        assert_eq!(output.diagnostics.warnings.len(), 3);
    }

    #[test]
    fn test_comments_are_discarded() {
        let config = parse("# global\nhttp { # trailing\n  # inside\n  gzip on; # why\n}").unwrap();
        assert_eq!(config.blocks[0].directives.len(), 1);
        assert_eq!(config.blocks[0].directives[0].value, "on");
    }

    #[test]
    fn test_compact_location_body() {
        let config = parse("server {\n    location / {return 200;}\n}").unwrap();
        let server = &config.blocks[0];

        assert_eq!(server.children.len(), 1);
        assert_eq!(server.children[0].kind, BlockKind::Location);
        assert_eq!(server.children[0].args, "/");
        assert_eq!(server.children[0].directives[0].name, "return");
        assert_eq!(server.children[0].directives[0].value, "200");
    }

    #[test]
    fn test_unterminated_quote_drops_statement() {
        let output = NginxParser::default()
            .parse("server {\nadd_header X \"oops;\nlisten 8080;\n}")
            .unwrap();
        let server = &output.config.blocks[0];

        assert_eq!(server.directives.len(), 1);
        assert_eq!(server.directives[0].name, "listen");
        assert_eq!(output.diagnostics.warnings.len(), 1);
        assert_eq!(output.diagnostics.warnings[0].line, Some(2));
        assert_eq!(output.diagnostics.warnings[0].source_directive, "add_header X \"oops;");
    }

    #[test]
    fn test_nameless_entries_kept_in_inert_blocks() {
        let output = NginxParser::default()
            .parse("map $http_upgrade $conn {\ndefault upgrade;\n'' close;\n}\nserver {\n'' x;\n}")
            .unwrap();
        let map = &output.config.blocks[0];

        assert_eq!(map.directives.len(), 2);
        assert_eq!(map.directives[1].name, "");
        assert_eq!(map.directives[1].value, "'' close");
        assert!(output.config.blocks[1].directives.is_empty());
        assert_eq!(output.diagnostics.skipped.len(), 1);
    }

    #[test]
    fn test_brace_lookahead() {
        let tokens = tokenize("a\n# c\n\n{\nb;\n").unwrap();
        let ahead = brace_lookahead(&tokens);

        // a, newline, comment, newline, newline, {, newline, b, ;, newline
        assert_eq!(
            ahead,
            vec![true, true, true, true, true, false, false, false, false, false]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  \n\n # only a comment\n").unwrap().is_empty());
    }
}
