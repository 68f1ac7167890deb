//! Textual representation and member lookup for runtime values

use serde_json::Value as JsonValue;

use crate::runtime::program::PathStep;

/// Append the textual form of `value` to `out`.
///
/// Strings are written verbatim, `null` writes nothing, arrays and objects
/// are written as compact JSON.
pub fn write_value(out: &mut String, value: &JsonValue) {
    match value {
        JsonValue::Null => {}
        JsonValue::String(s) => out.push_str(s),
        JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonValue::Number(n) => out.push_str(&n.to_string()),
        JsonValue::Array(_) | JsonValue::Object(_) => out.push_str(&value.to_string()),
    }
}

/// Follow one path step; missing members and out-of-range indexes are `None`
pub fn step<'v>(value: &'v JsonValue, step: &PathStep) -> Option<&'v JsonValue> {
    match (value, step) {
        (JsonValue::Object(map), PathStep::Member(name) | PathStep::Key(name)) => {
            map.get(name).or_else(|| {
                map.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
        }
        (JsonValue::Array(items), PathStep::Index(i)) => items.get(*i),
        _ => None,
    }
}

/// Follow every step of a path from `root`
pub fn lookup<'v>(root: &'v JsonValue, steps: &[PathStep]) -> Option<&'v JsonValue> {
    steps.iter().try_fold(root, |value, s| step(value, s))
}
