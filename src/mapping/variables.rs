//! nginx built-in variables and their Caddy placeholders

use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

/// nginx variable token → Caddy placeholder
pub const BUILTIN_VARIABLES: &[(&str, &str)] = &[
    ("$host", "{http.host}"),
    ("$remote_addr", "{http.request.remote}"),
    ("$request_uri", "{http.request.uri}"),
    ("$uri", "{http.request.uri.path}"),
    ("$document_root", "{http.root}"),
    ("$fastcgi_script_name", "{http.request.uri.path}"),
    ("$fastcgi_path_info", "{http.request.uri.path}"),
    ("$query_string", "{http.request.uri.query}"),
];

static BUILTIN: LazyLock<VariableMap> = LazyLock::new(|| {
    VariableMap::new(BUILTIN_VARIABLES).expect("escaped variable tokens always form a valid regex")
});

/// Single-pass substitution of variable tokens in directive values
#[derive(Debug, Clone)]
pub struct VariableMap {
    pattern: Option<Regex>,
    replacements: HashMap<&'static str, &'static str>,
}

impl VariableMap {
    pub fn new(entries: &[(&'static str, &'static str)]) -> Result<Self, regex::Error> {
        // Longest first, so alternation behaves leftmost-longest
        let mut tokens: Vec<&str> = entries.iter().map(|(token, _)| *token).collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        tokens.dedup();

        let pattern = if tokens.is_empty() {
            None
        } else {
            let alternation: Vec<String> = tokens.iter().map(|t| regex::escape(t)).collect();
            Some(Regex::new(&alternation.join("|"))?)
        };

        Ok(Self {
            pattern,
            replacements: entries.iter().copied().collect(),
        })
    }

    /// The process-wide table of nginx built-ins
    pub fn builtin() -> &'static VariableMap {
        &BUILTIN
    }

    /// Replace every known token in a value
    pub fn substitute<'v>(&self, value: &'v str) -> Cow<'v, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(value, |caps: &regex::Captures<'_>| {
                self.replacements
                    .get(&caps[0])
                    .copied()
                    .unwrap_or_default()
                    .to_string()
            }),
            None => Cow::Borrowed(value),
        }
    }
}
