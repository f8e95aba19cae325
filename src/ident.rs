//! Identifier qualification and quoting utilities
//! ----------------------------------------------
//! Catalog objects are named by a schema and an object name. This module owns
//! that pair, its ordering (schema first, then name), and the SQL rules for
//! parsing and rendering it.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const DEFAULT_SCHEMA: &str = "public";

/// Schema-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SqlIdentifier {
    pub schema: String,
    pub name: String,
}

impl SqlIdentifier {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self { schema: schema.into(), name: name.into() }
    }

    /// Parse `name`, `schema.name` or their double-quoted forms.
    /// Unquoted parts are folded to lowercase; a bare name lands in `public`.
    pub fn parse(input: &str) -> Option<Self> {
        let parts = split_qualified(input.trim())?;
        match parts.len() {
            1 => Some(Self::new(DEFAULT_SCHEMA, parts[0].clone())),
            2 => Some(Self::new(parts[0].clone(), parts[1].clone())),
            _ => None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.schema == "pg_catalog" || self.schema == "information_schema" || self.schema.starts_with("pg_toast")
    }
}

impl Display for SqlIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

/// Normalize an identifier according to SQL rules:
/// - If enclosed in double-quotes, strip quotes and preserve case
/// - Otherwise, convert to lowercase for case-insensitive matching
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Quote an identifier unless it is a plain lowercase name.
pub fn quote_ident(s: &str) -> String {
    let plain = s.chars().next().map(|c| c.is_ascii_lowercase() || c == '_').unwrap_or(false)
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');
    if plain { s.to_string() } else { format!("\"{}\"", s.replace('"', "\"\"")) }
}

// Split on dots that are not inside double quotes, normalizing each part.
fn split_qualified(s: &str) -> Option<Vec<String>> {
    let mut parts: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => { cur.push_str("\"\""); chars.next(); }
            '"' => { in_quotes = !in_quotes; cur.push('"'); }
            '.' if !in_quotes => { parts.push(normalize_identifier(&cur)); cur.clear(); }
            _ => cur.push(c),
        }
    }
    if in_quotes { return None; }
    parts.push(normalize_identifier(&cur));
    if parts.iter().any(|p| p.is_empty()) { return None; }
    Some(parts)
}
