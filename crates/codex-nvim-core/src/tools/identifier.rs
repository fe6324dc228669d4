//! Deriving parameter identifiers from schema field names
//!
//! Field names in a remote schema can be anything (`"1x"`, `"file-path"`,
//! `"type"`). Each one gets a local identifier that is a valid bare Rust
//! identifier: ASCII word characters only, not digit-leading, not
//! underscore-leading, and not a keyword.

use std::collections::HashSet;

use once_cell::sync::Lazy;

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // strict
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
        "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
        "trait", "true", "type", "unsafe", "use", "where", "while",
        // reserved
        "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
        "typeof", "unsized", "virtual", "yield",
        // weak
        "union",
    ]
    .into_iter()
    .collect()
});

/// Whether `word` is a keyword
pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(word)
}

/// Sanitize one field name, without collision handling
pub fn sanitize_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if ident.is_empty() {
        ident = "param".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("param_{}", ident);
    }
    if ident.starts_with('_') {
        ident = format!("param{}", ident);
    }
    if is_reserved(&ident) {
        ident.push('_');
    }
    ident
}

/// Hands out unique identifiers within one tool
///
/// Names must be allocated in parameter order: on a collision the later
/// field gets `_1`, `_2`, ...
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
    used: HashSet<String>,
}

impl IdentifierAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, wire_name: &str) -> String {
        let base = sanitize_identifier(wire_name);
        let mut candidate = base.clone();
        let mut counter = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}", base, counter);
            counter += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
