//! nginx configuration lexer

use nom::{
    bytes::complete::take_while,
    error::{Error, ErrorKind},
    IResult,
};
use thiserror::Error;

/// Token types for nginx config
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare or quoted word, quotes kept as written
    Word(String),
    /// Open brace {
    OpenBrace,
    /// Close brace }
    CloseBrace,
    /// Semicolon ;
    Semicolon,
    /// Comment
    Comment(String),
    /// Newline (ends a statement that has no terminator)
    Newline,
    /// Quoted string missing its closing quote, up to the end of the line
    Unterminated(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

impl LexError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Tokenize nginx configuration
pub fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, LexError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut remaining = input;

    while !remaining.is_empty() {
        // Skip whitespace (except newlines)
        let (rest, _) = skip_horizontal_whitespace(remaining)
            .map_err(|e| LexError::new(line, format!("whitespace error: {e}")))?;
        remaining = rest;

        if remaining.is_empty() {
            break;
        }

        if remaining.starts_with('\n') {
            tokens.push((Token::Newline, line));
            remaining = &remaining[1..];
            line += 1;
            continue;
        }

        if remaining.starts_with('#') {
            let (rest, comment) = parse_comment(remaining)
                .map_err(|e| LexError::new(line, format!("comment error: {e}")))?;
            tokens.push((Token::Comment(comment.to_string()), line));
            remaining = rest;
            continue;
        }

        if remaining.starts_with(';') {
            tokens.push((Token::Semicolon, line));
            remaining = &remaining[1..];
            continue;
        }

        if remaining.starts_with('"') || remaining.starts_with('\'') {
            match parse_quoted(remaining) {
                Ok((rest, quoted)) => {
                    tokens.push((Token::Word(quoted.to_string()), line));
                    line += quoted.matches('\n').count();
                    remaining = rest;
                }
                Err(_) => {
                    let (rest, text) = rest_of_line(remaining)
                        .map_err(|e| LexError::new(line, format!("quote error: {e}")))?;
                    tokens.push((Token::Unterminated(text.trim_end().to_string()), line));
                    remaining = rest;
                }
            }
            continue;
        }

        let (rest, word) = parse_word(remaining).map_err(|_| {
            LexError::new(
                line,
                format!("unexpected character {:?}", remaining.chars().next()),
            )
        })?;
        push_bare_word(&mut tokens, word, line);
        remaining = rest;
    }

    Ok(tokens)
}

/// Braces are structural when they stand as their own word, or when a single
/// `{` or `}` is glued to the edge of an otherwise brace-free word
/// (`server{`, `{return`, `200}`).
fn push_bare_word(tokens: &mut Vec<(Token, usize)>, word: &str, line: usize) {
    if word.chars().all(|c| c == '{' || c == '}') {
        for c in word.chars() {
            let token = if c == '{' {
                Token::OpenBrace
            } else {
                Token::CloseBrace
            };
            tokens.push((token, line));
        }
        return;
    }

    let brace_free = |part: &str| !part.contains(['{', '}']);

    if let Some(tail) = word.strip_prefix('{').filter(|tail| brace_free(tail)) {
        tokens.push((Token::OpenBrace, line));
        tokens.push((Token::Word(tail.to_string()), line));
    } else if let Some(head) = word.strip_suffix('{').filter(|head| brace_free(head)) {
        tokens.push((Token::Word(head.to_string()), line));
        tokens.push((Token::OpenBrace, line));
    } else if let Some(head) = word.strip_suffix('}').filter(|head| brace_free(head)) {
        tokens.push((Token::Word(head.to_string()), line));
        tokens.push((Token::CloseBrace, line));
    } else {
        tokens.push((Token::Word(word.to_string()), line));
    }
}

fn skip_horizontal_whitespace(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == ' ' || c == '\t' || c == '\r')(input)
}

fn parse_comment(input: &str) -> IResult<&str, &str> {
    let (rest, _) = nom::character::complete::char('#')(input)?;
    take_while(|c: char| c != '\n')(rest).map(|(rest, comment)| (rest, comment.trim_end()))
}

/// Recognize a quoted string, returning it with its quotes
fn parse_quoted(input: &str) -> IResult<&str, &str> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('"' | '\''))) => c,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            c if c == quote => {
                let end = i + c.len_utf8();
                return Ok((&input[end..], &input[..end]));
            }
            _ => {}
        }
    }

    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

fn rest_of_line(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != '\n')(input)
}

fn parse_word(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::take_while1(|c: char| !c.is_whitespace() && c != ';')(input)
}

/// Split a leading identifier (`[A-Za-z0-9_]+`) off a statement
pub(crate) fn leading_identifier(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let tokens = kinds("worker_processes 4;");
        assert_eq!(
            tokens,
            vec![
                Token::Word("worker_processes".to_string()),
                Token::Word("4".to_string()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_tokenize_block() {
        let tokens = kinds("server { listen 80; }");
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0], Token::Word("server".to_string()));
        assert_eq!(tokens[1], Token::OpenBrace);
        assert_eq!(tokens[4], Token::Semicolon);
        assert_eq!(tokens[5], Token::CloseBrace);
    }

    #[test]
    fn test_tokenize_attached_brace() {
        let tokens = kinds("server{\n}}");
        assert_eq!(
            tokens,
            vec![
                Token::Word("server".to_string()),
                Token::OpenBrace,
                Token::Newline,
                Token::CloseBrace,
                Token::CloseBrace,
            ]
        );
    }

    #[test]
    fn test_braces_inside_regex_are_literal() {
        let tokens = kinds(r"location ~ ^/img/\d{3}$ {");
        assert_eq!(tokens[2], Token::Word(r"^/img/\d{3}$".to_string()));
        assert_eq!(tokens[3], Token::OpenBrace);
    }

    #[test]
    fn test_tokenize_quoted_string() {
        let tokens = kinds(r#"add_header X-Note "a; {b} # c";"#);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[2], Token::Word(r#""a; {b} # c""#.to_string()));
        assert_eq!(tokens[3], Token::Semicolon);
    }

    #[test]
    fn test_tokenize_comment() {
        let tokens = kinds("# this is a comment\nworker_processes 4; # trailing");
        assert_eq!(tokens[0], Token::Comment(" this is a comment".to_string()));
        assert_eq!(tokens[1], Token::Newline);
        assert_eq!(tokens.last(), Some(&Token::Comment(" trailing".to_string())));
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a 1;\r\n\nb 2;").unwrap();
        let b = tokens
            .iter()
            .find(|(t, _)| *t == Token::Word("b".to_string()))
            .unwrap();
        assert_eq!(b.1, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = tokenize("root /srv;\nadd_header X \"oops; }\nlisten 80;").unwrap();
        assert_eq!(tokens[5], (Token::Word("X".to_string()), 2));
        assert_eq!(tokens[6], (Token::Unterminated("\"oops; }".to_string()), 2));
        assert_eq!(tokens[7], (Token::Newline, 2));
        assert_eq!(tokens[8], (Token::Word("listen".to_string()), 3));
    }

    #[test]
    fn test_braces_glued_to_words() {
        let tokens = kinds("location / {return 200;}");
        assert_eq!(
            tokens,
            vec![
                Token::Word("location".to_string()),
                Token::Word("/".to_string()),
                Token::OpenBrace,
                Token::Word("return".to_string()),
                Token::Word("200".to_string()),
                Token::Semicolon,
                Token::CloseBrace,
            ]
        );

        assert_eq!(
            kinds("deny all}"),
            vec![
                Token::Word("deny".to_string()),
                Token::Word("all".to_string()),
                Token::CloseBrace,
            ]
        );
        assert_eq!(kinds("${host}"), vec![Token::Word("${host}".to_string())]);
    }

    #[test]
    fn test_leading_identifier() {
        assert_eq!(leading_identifier("if($host"), Ok(("($host", "if")));
        assert!(leading_identifier("~ foo").is_err());
    }
}
