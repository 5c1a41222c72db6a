//! nginx directive to Caddyfile directive mapping

mod variables;

pub use variables::{VariableMap, BUILTIN_VARIABLES};

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

/// How a directive's value is reshaped into its Caddyfile counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Kept only as a comment; the effect is consumed elsewhere or dropped
    Comment,
    /// Same value under a new name
    Rename(&'static str),
    /// Value with a fixed prefix under a new name
    Prefix {
        name: &'static str,
        prefix: &'static str,
    },
    /// First token of the value only
    FirstToken(&'static str),
    /// Fixed output, the value is discarded
    Constant {
        name: &'static str,
        value: &'static str,
    },
    /// `reverse_proxy to <upstream>`
    Upstream,
    /// Access log wrapped in a `log` sub-block
    AccessLog,
}

impl Rule {
    /// Apply this rule to an already substituted value
    pub fn apply(&self, name: &str, value: &str) -> Translated {
        match *self {
            Rule::Comment => {
                Translated::new(format!("# {name}"), fold_lines(value), TranslationKind::Commented)
            }
            Rule::Rename(target) => Translated::mapped(target, value),
            Rule::Prefix { name, prefix } => Translated::mapped(name, format!("{prefix}{value}")),
            Rule::FirstToken(target) => {
                Translated::mapped(target, value.split_whitespace().next().unwrap_or_default())
            }
            Rule::Constant { name, value } => Translated::mapped(name, value),
            Rule::Upstream => Translated::mapped("reverse_proxy", convert_upstream(value)),
            Rule::AccessLog => {
                let path = value.split_whitespace().next().unwrap_or_default();
                Translated::mapped("log", format!("access {{\n  output file {path}\n}}"))
            }
        }
    }
}

/// Directive name → rule
pub type RuleTable = HashMap<&'static str, Rule>;

static BUILTIN_RULES: LazyLock<RuleTable> = LazyLock::new(|| {
    HashMap::from([
        // Consumed by the site address synthesized for `server`
        ("listen", Rule::Comment),
        ("server_name", Rule::Comment),
        ("server_tokens", Rule::Comment),
        ("include", Rule::Comment),
        ("fastcgi_param", Rule::Comment),
        ("root", Rule::Prefix { name: "root", prefix: "* " }),
        ("proxy_pass", Rule::Upstream),
        ("fastcgi_pass", Rule::Rename("php_fastcgi")),
        ("deny", Rule::Constant { name: "respond", value: "403" }),
        ("error_log", Rule::FirstToken("errors")),
        ("access_log", Rule::AccessLog),
        ("index", Rule::Prefix { name: "file_server", prefix: "index " }),
        ("try_files", Rule::Rename("try_files")),
        ("add_header", Rule::Rename("header")),
        ("client_max_body_size", Rule::Prefix { name: "request_body", prefix: "max_size " }),
        ("fastcgi_hide_header", Rule::Prefix { name: "header", prefix: "-" }),
        ("gzip_static", Rule::Constant { name: "encode", value: "gzip" }),
    ])
});

/// Directives with no direct translation but a known Caddy alternative
pub const UNSUPPORTED_DIRECTIVES: &[(&str, &str)] = &[
    ("limit_req_zone", "use the rate_limit handler from the caddy-ratelimit plugin"),
    ("stub_status", "Caddy exposes metrics natively at the admin /metrics endpoint"),
];

/// Look up the advisory for an unsupported directive
pub fn advisory(name: &str) -> Option<&'static str> {
    UNSUPPORTED_DIRECTIVES
        .iter()
        .find(|(directive, _)| *directive == name)
        .map(|(_, suggestion)| *suggestion)
}

/// Outcome class of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationKind {
    /// Active Caddyfile directive
    Mapped,
    /// Deliberately neutered to a comment
    Commented,
    /// No rule; kept as an annotated comment
    Unmapped,
}

/// A translated directive, ready to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub name: String,
    /// May span several lines; continuation lines are relative to the directive
    pub value: String,
    pub kind: TranslationKind,
}

impl Translated {
    fn new(name: impl Into<String>, value: impl Into<String>, kind: TranslationKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }

    fn mapped(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, TranslationKind::Mapped)
    }

    /// Fallback for directives without a rule
    fn unmapped(name: &str, value: &str) -> Self {
        Self::new(format!("# {name}:"), fold_lines(value), TranslationKind::Unmapped)
    }

    /// Render as output lines under the given indentation
    pub fn render(&self, indent: &str) -> Vec<String> {
        let text = format!("{} {}", self.name, self.value);
        text.trim_end()
            .lines()
            .map(|line| format!("{indent}{line}"))
            .collect()
    }
}

/// Translates nginx directives into Caddyfile directives
#[derive(Debug, Clone, Copy)]
pub struct DirectiveTranslator<'a> {
    rules: &'a RuleTable,
    variables: &'a VariableMap,
}

impl<'a> DirectiveTranslator<'a> {
    pub fn new(rules: &'a RuleTable, variables: &'a VariableMap) -> Self {
        Self { rules, variables }
    }

    pub fn variables(&self) -> &'a VariableMap {
        self.variables
    }

    /// Translate one directive; never fails
    pub fn translate(&self, name: &str, raw_value: &str) -> Translated {
        let value = self.variables.substitute(raw_value);
        match self.rules.get(name) {
            Some(rule) => rule.apply(name, &value),
            None => Translated::unmapped(name, &value),
        }
    }
}

impl Default for DirectiveTranslator<'static> {
    fn default() -> Self {
        Self::new(&BUILTIN_RULES, VariableMap::builtin())
    }
}

/// Escape line breaks so text placed behind `#` stays on a single line
pub(crate) fn fold_lines(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r']) {
        Cow::Owned(value.replace("\r\n", "\\n").replace(['\n', '\r'], "\\n"))
    } else {
        Cow::Borrowed(value)
    }
}

/// Strip a trailing terminator from an upstream address
fn convert_upstream(value: &str) -> String {
    format!("to {}", value.trim_end_matches(';').trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(name: &str, value: &str) -> String {
        DirectiveTranslator::default()
            .translate(name, value)
            .render("")
            .join("\n")
    }

    #[test]
    fn test_root() {
        assert_eq!(translate("root", "/var/www/html"), "root * /var/www/html");
    }

    #[test]
    fn test_proxy_pass() {
        assert_eq!(translate("proxy_pass", "http://backend"), "reverse_proxy to http://backend");
        assert_eq!(translate("proxy_pass", "http://backend;"), "reverse_proxy to http://backend");
    }

    #[test]
    fn test_deny_ignores_value() {
        assert_eq!(translate("deny", "all"), "respond 403");
        assert_eq!(translate("deny", ""), "respond 403");
        assert_eq!(translate("deny", "192.168.1.0/24"), "respond 403");
    }

    #[test]
    fn test_logs_keep_only_path() {
        assert_eq!(translate("error_log", "/var/log/nginx/error.log warn"), "errors /var/log/nginx/error.log");
        assert_eq!(
            translate("access_log", "/var/log/nginx/access.log combined"),
            "log access {\n  output file /var/log/nginx/access.log\n}"
        );
    }

    #[test]
    fn test_reshaped_values() {
        assert_eq!(translate("client_max_body_size", "10m"), "request_body max_size 10m");
        assert_eq!(translate("fastcgi_hide_header", "X-Powered-By"), "header -X-Powered-By");
        assert_eq!(translate("index", "index.php index.html"), "file_server index index.php index.html");
        assert_eq!(translate("add_header", "X-Frame-Options DENY"), "header X-Frame-Options DENY");
        assert_eq!(translate("fastcgi_pass", "unix:/run/php.sock"), "php_fastcgi unix:/run/php.sock");
        assert_eq!(translate("gzip_static", "on"), "encode gzip");
    }

    #[test]
    fn test_neutered_directives() {
        assert_eq!(translate("listen", "80"), "# listen 80");
        assert_eq!(translate("server_name", "a.com b.com"), "# server_name a.com b.com");
        assert_eq!(translate("include", "fastcgi_params"), "# include fastcgi_params");
        assert_eq!(
            DirectiveTranslator::default().translate("server_tokens", "off").kind,
            TranslationKind::Commented
        );
    }

    #[test]
    fn test_default_rule() {
        let translated = DirectiveTranslator::default().translate("autoindex", "on");
        assert_eq!(translated.kind, TranslationKind::Unmapped);
        assert_eq!(translated.render("  "), vec!["  # autoindex: on"]);
        assert_eq!(translate("limit_req_zone", "$binary_remote_addr zone=one:10m"), "# limit_req_zone: $binary_remote_addr zone=one:10m");
    }

    #[test]
    fn test_substitution_applies_to_every_value() {
        assert_eq!(
            translate("try_files", "$uri $uri/ /index.php?$query_string"),
            "try_files {http.request.uri.path} {http.request.uri.path}/ /index.php?{http.request.uri.query}"
        );
        assert_eq!(translate("set", "$target $host"), "# set: $target {http.host}");
        // names are left alone
        assert_eq!(translate("fastcgi_param", "SCRIPT_FILENAME $document_root$fastcgi_script_name"),
            "# fastcgi_param SCRIPT_FILENAME {http.root}{http.request.uri.path}");
    }

    #[test]
    fn test_render_multiline_indent() {
        let lines = DirectiveTranslator::default()
            .translate("access_log", "/tmp/a.log")
            .render("    ");
        assert_eq!(lines, vec!["    log access {", "      output file /tmp/a.log", "    }"]);
    }

    #[test]
    fn test_advisory() {
        assert!(advisory("stub_status").is_some());
        assert!(advisory("limit_req_zone").unwrap().contains("rate_limit"));
        assert!(advisory("root").is_none());
    }

    #[test]
    fn test_custom_rule_table() {
        let mut rules = RuleTable::new();
        rules.insert("return", Rule::Rename("respond"));
        let translator = DirectiveTranslator::new(&rules, VariableMap::builtin());

        assert_eq!(translator.translate("return", "404").render(""), vec!["respond 404"]);
        assert_eq!(translator.translate("root", "/srv").kind, TranslationKind::Unmapped);
    }
}
