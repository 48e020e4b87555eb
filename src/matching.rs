use crate::{
    document::{InteractionResponse, MatchingRule},
    http_client::ResponseData,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::{collections::HashMap, fmt};
use tracing::debug;

const MISSING: &str = "<missing>";

/// A single point of disagreement between the expected and the actual
/// response, addressed by a `$.`-rooted field path.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.path, self.expected, self.actual
        )
    }
}

/// Compares the provider's actual response against the consumer's recorded
/// expectation. Collects every mismatch rather than stopping at the first,
/// so one report can show all discrepancies for an interaction.
///
/// Matching is structural: headers and body keys absent from the
/// expectation are ignored on the actual side, and matching rules recorded
/// in the pact take precedence over literal equality at their node.
pub fn match_response(expected: &InteractionResponse, actual: &ResponseData) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    let rules = expected.matching_rules.as_ref();

    if actual.status_code != expected.status {
        mismatches.push(Mismatch {
            path: "$.status".to_string(),
            expected: expected.status.to_string(),
            actual: actual.status_code.to_string(),
        });
    }

    if let Some(expected_headers) = &expected.headers {
        match_headers(expected_headers, &actual.headers, rules, &mut mismatches);
    }

    if let Some(expected_body) = &expected.body {
        match_body(expected_body, &actual.body, rules, &mut mismatches);
    }

    mismatches
}

fn match_headers(
    expected: &HashMap<String, String>,
    actual: &HashMap<String, String>,
    rules: Option<&HashMap<String, MatchingRule>>,
    mismatches: &mut Vec<Mismatch>,
) {
    for (name, expected_value) in expected {
        let path = format!("$.headers.{}", name);
        let actual_value = actual
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value);

        match actual_value {
            None => mismatches.push(Mismatch {
                path,
                expected: expected_value.clone(),
                actual: MISSING.to_string(),
            }),
            Some(actual_value) => {
                if let Some(rule) = lookup_rule(rules, &path) {
                    if let Some(pattern) = &rule.regex {
                        if !regex_matches(pattern, actual_value) {
                            mismatches.push(Mismatch {
                                path,
                                expected: format!("a value matching /{}/", pattern),
                                actual: actual_value.clone(),
                            });
                        }
                    }
                } else if actual_value.trim() != expected_value.trim() {
                    mismatches.push(Mismatch {
                        path,
                        expected: expected_value.clone(),
                        actual: actual_value.clone(),
                    });
                }
            }
        }
    }
}

fn match_body(
    expected: &Value,
    actual_body: &str,
    rules: Option<&HashMap<String, MatchingRule>>,
    mismatches: &mut Vec<Mismatch>,
) {
    match expected {
        // a scalar text expectation means byte-for-byte body equality
        Value::String(expected_text) => {
            if actual_body != expected_text.as_str() {
                mismatches.push(Mismatch {
                    path: "$.body".to_string(),
                    expected: expected_text.clone(),
                    actual: actual_body.to_string(),
                });
            }
        }
        _ => match serde_json::from_str::<Value>(actual_body) {
            Ok(actual) => match_values("$.body", expected, &actual, rules, mismatches),
            Err(_) => mismatches.push(Mismatch {
                path: "$.body".to_string(),
                expected: display(expected),
                actual: format!("unparseable body {:?}", actual_body),
            }),
        },
    }
}

fn match_values(
    path: &str,
    expected: &Value,
    actual: &Value,
    rules: Option<&HashMap<String, MatchingRule>>,
    mismatches: &mut Vec<Mismatch>,
) {
    if let Some(rule) = lookup_rule(rules, path) {
        apply_rule(path, rule, expected, actual, mismatches);
        return;
    }

    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            // extra keys on the actual side are fine
            for (key, expected_value) in expected_map {
                let child_path = format!("{}.{}", path, key);
                match actual_map.get(key) {
                    Some(actual_value) => {
                        match_values(&child_path, expected_value, actual_value, rules, mismatches)
                    }
                    None => mismatches.push(Mismatch {
                        path: child_path,
                        expected: display(expected_value),
                        actual: MISSING.to_string(),
                    }),
                }
            }
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            if actual_items.len() < expected_items.len() {
                mismatches.push(Mismatch {
                    path: path.to_string(),
                    expected: format!("an array of at least {} elements", expected_items.len()),
                    actual: format!("an array of {} elements", actual_items.len()),
                });
            }
            for (index, (expected_item, actual_item)) in
                expected_items.iter().zip(actual_items).enumerate()
            {
                match_values(
                    &format!("{}[{}]", path, index),
                    expected_item,
                    actual_item,
                    rules,
                    mismatches,
                );
            }
        }
        _ => {
            if expected != actual {
                mismatches.push(Mismatch {
                    path: path.to_string(),
                    expected: display(expected),
                    actual: display(actual),
                });
            }
        }
    }
}

fn apply_rule(
    path: &str,
    rule: &MatchingRule,
    expected: &Value,
    actual: &Value,
    mismatches: &mut Vec<Mismatch>,
) {
    if let Some(pattern) = &rule.regex {
        if !regex_matches(pattern, &text_of(actual)) {
            mismatches.push(Mismatch {
                path: path.to_string(),
                expected: format!("a value matching /{}/", pattern),
                actual: display(actual),
            });
        }
        return;
    }

    match rule.match_kind.as_deref() {
        Some("type") => match (expected, actual) {
            (Value::Array(expected_items), Value::Array(actual_items)) => {
                if let Some(min) = rule.min {
                    if actual_items.len() < min {
                        mismatches.push(Mismatch {
                            path: path.to_string(),
                            expected: format!("an array of at least {} elements", min),
                            actual: format!("an array of {} elements", actual_items.len()),
                        });
                    }
                }
                if let Some(template) = expected_items.first() {
                    for (index, actual_item) in actual_items.iter().enumerate() {
                        if !same_json_type(template, actual_item) {
                            mismatches.push(Mismatch {
                                path: format!("{}[{}]", path, index),
                                expected: format!("a value of type {}", json_type(template)),
                                actual: json_type(actual_item).to_string(),
                            });
                        }
                    }
                }
            }
            _ => {
                if !same_json_type(expected, actual) {
                    mismatches.push(Mismatch {
                        path: path.to_string(),
                        expected: format!("a value of type {}", json_type(expected)),
                        actual: json_type(actual).to_string(),
                    });
                }
            }
        },
        // unknown rule kinds accept the actual value: stay permissive on
        // the provider side rather than guess stricter semantics
        other => debug!(path, rule = ?other, "ignoring unsupported matching rule"),
    }
}

fn lookup_rule<'a>(
    rules: Option<&'a HashMap<String, MatchingRule>>,
    path: &str,
) -> Option<&'a MatchingRule> {
    lazy_static! {
        static ref INDEX_REGEX: Regex = Regex::new(r"\[\d+\]").unwrap();
    }

    let rules = rules?;
    if let Some(rule) = rules.get(path) {
        return Some(rule);
    }

    // rules recorded against any element, e.g. $.body.items[*].id
    let wildcard = INDEX_REGEX.replace_all(path, "[*]");
    rules.get(wildcard.as_ref())
}

fn regex_matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern)
        .map(|regex| regex.is_match(value))
        .unwrap_or(false)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn same_json_type(expected: &Value, actual: &Value) -> bool {
    json_type(expected) == json_type(actual)
}

fn display(value: &Value) -> String {
    value.to_string()
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
