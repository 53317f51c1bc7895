//! `{{variable}}` placeholder substitution for outbound payloads and
//! message templates.
//!
//! Substitution recurses through nested maps and lists. A string that is
//! exactly one placeholder takes the variable's JSON value with its type
//! intact; placeholders embedded in longer strings are stringified in
//! place. Unknown placeholders are left as written so a misconfigured
//! template is visible at the receiving end instead of silently blanked.

use serde_json::{Map, Value};

use crate::execution::Variables;

/// Substitutes placeholders in `template` recursively.
#[must_use]
pub fn substitute(template: &Value, variables: &Variables) -> Value {
    match template {
        Value::String(s) => substitute_str(s, variables),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, variables))
                .collect(),
        ),
        Value::Object(entries) => {
            let mut out = Map::with_capacity(entries.len());
            for (key, value) in entries {
                out.insert(key.clone(), substitute(value, variables));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Substitutes placeholders in one string, preserving the variable's JSON
/// type when the string is exactly `{{name}}`.
#[must_use]
pub fn substitute_str(template: &str, variables: &Variables) -> Value {
    if let Some(name) = whole_placeholder(template) {
        if let Some(value) = variables.get(name) {
            return value.clone();
        }
        return Value::String(template.to_string());
    }
    Value::String(render(template, variables))
}

/// Renders a template to a plain string, stringifying every substituted
/// value.
#[must_use]
pub fn render(template: &str, variables: &Variables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let Some(close_rel) = rest[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + close_rel;
        out.push_str(&rest[..open]);
        let name = rest[open + 2..close].trim();
        match variables.get(name) {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str(&rest[open..close + 2]),
        }
        rest = &rest[close + 2..];
    }
    out.push_str(rest);
    out
}

/// `Some(name)` when the whole string is a single `{{name}}` placeholder.
fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("{{")?.strip_suffix("}}")?;
    let name = inner.trim();
    if name.is_empty() || name.contains('{') || name.contains('}') {
        return None;
    }
    Some(name)
}
