// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[parameterized(
    simple = { "Hi {{first_name}}!", "Hi Alice!" },
    spaced = { "Hi {{ first_name }}!", "Hi Alice!" },
    repeated = { "{{first_name}} {{first_name}}", "Alice Alice" },
    dotted = { "{{company.name}}", "" },
)]
fn renders_merge_tags(template: &str, expected: &str) {
    let vars = vars(&[("first_name", "Alice")]);
    assert_eq!(render(template, &vars), expected);
}

#[test]
fn unresolved_tags_become_empty() {
    assert_eq!(render("Hello {{nickname}}!", &vars(&[])), "Hello !");
}

#[test]
fn fallback_applies_when_missing_or_empty() {
    assert_eq!(render("Hi {{nickname | friend}}!", &vars(&[])), "Hi friend!");
    assert_eq!(
        render("Hi {{nickname | friend}}!", &vars(&[("nickname", "")])),
        "Hi friend!"
    );
    assert_eq!(
        render("Hi {{nickname | friend}}!", &vars(&[("nickname", "Al")])),
        "Hi Al!"
    );
}

#[test]
fn non_tag_braces_pass_through() {
    let template = "if (x) { y } and {{email}}";
    assert_eq!(
        render(template, &vars(&[("email", "a@x.test")])),
        "if (x) { y } and a@x.test"
    );
}
