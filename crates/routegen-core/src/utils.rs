//! Identifier and literal helpers for emitted Go source

use once_cell::sync::Lazy;
use regex::Regex;

static NON_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("identifier regex is valid"));

/// Go keywords, which can never be used as an import alias
const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for ch in s.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else if ch.is_alphanumeric() {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        } else {
            // any separator collapses into a single underscore
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }

    out.trim_matches('_').to_string()
}

/// Convert a string to UpperCamelCase
pub fn to_upper_camel_case(s: &str) -> String {
    to_snake_case(s)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Turn an arbitrary string into a Go identifier.
///
/// Used for import aliases and package names: `go-redis` becomes
/// `go_redis`, `v2` becomes `pkg_v2`, keywords get a trailing underscore.
pub fn go_ident(s: &str) -> String {
    let cleaned = NON_IDENT.replace_all(s, "_");
    let mut ident = cleaned.trim_matches('_').to_string();

    if ident.is_empty() {
        return "pkg".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("pkg_{ident}");
    }
    if GO_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Quote a string as a Go interpreted string literal
pub fn go_quote(s: &str) -> String {
    // JSON string escaping is a subset of what Go accepts in "..." literals
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.escape_default()))
}

/// Last `/`-separated segment of an import path
pub fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
