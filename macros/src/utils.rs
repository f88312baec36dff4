//! Utility functions for procedural macros

use std::collections::HashSet;

/// Label for a variant: the explicit one if given, otherwise the identifier
/// in `SCREAMING_SNAKE_CASE`
pub fn variant_label(ident: &syn::Ident, explicit: Option<&str>) -> String {
    explicit.map_or_else(|| to_screaming_snake(&ident.to_string()), str::to_string)
}

/// Convert a `CamelCase` identifier to `SCREAMING_SNAKE_CASE`
pub fn to_screaming_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        out.extend(ch.to_uppercase());
    }
    out
}

/// First label that appears more than once (case-insensitive)
pub fn first_duplicate(labels: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .find(|label| !seen.insert(label.to_ascii_uppercase()))
        .map(String::as_str)
}
