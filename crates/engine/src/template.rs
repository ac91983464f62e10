// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge-tag interpolation for email subjects and bodies.
//!
//! `{{field}}` resolves against the contact's merge vars; the
//! `{{field | fallback}}` form substitutes the fallback when the field is
//! missing or empty. Unresolved tags without a fallback become empty strings.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(?:\|([^{}]*))?\}\}")
        .expect("constant regex pattern is valid")
});

/// Interpolate `{{field}}` / `{{field | fallback}}` merge tags
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    TAG_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            match vars.get(&caps[1]) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => caps
                    .get(2)
                    .map(|fallback| fallback.as_str().trim().to_string())
                    .unwrap_or_default(),
            }
        })
        .to_string()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
