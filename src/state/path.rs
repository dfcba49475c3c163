//! Defensive lookups into decoded state trees.
//!
//! Paths are dot-separated segments. A segment is an object key, an array
//! index, or `*` (first entry of an object or array). A missing key, an
//! out-of-range index or a type mismatch anywhere along the path yields
//! `None`; nothing here panics.
//!
//! ```
//! use serde_json::json;
//! use vidpeek::state::path;
//!
//! let v = json!({"note": {"noteDetailMap": {"abc": {"note": {"title": "T"}}}}});
//! assert_eq!(path::text(&v, "note.noteDetailMap.*.note.title"), "T");
//! assert_eq!(path::count(&v, "note.interactInfo.likedCount"), 0);
//! ```

use serde_json::Value;

use crate::record::clean_text;

/// Resolve `path` under `value`.
#[must_use]
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, step)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) if segment == "*" => map.values().next(),
        Value::Object(map) => map.get(segment),
        Value::Array(items) if segment == "*" => items.first(),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// First path that resolves to a non-null value.
#[must_use]
pub fn first<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|p| get(value, p))
        .find(|v| !v.is_null())
}

/// Cleaned text at `path`; empty when absent. Numbers are rendered as text.
#[must_use]
pub fn text(value: &Value, path: &str) -> String {
    get(value, path).map(scalar_text).unwrap_or_default()
}

/// First non-empty cleaned text among `paths`.
#[must_use]
pub fn first_text(value: &Value, paths: &[&str]) -> String {
    paths
        .iter()
        .map(|p| text(value, p))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Non-empty trimmed string at `path`, uncleaned (for URLs and ids).
#[must_use]
pub fn string(value: &Value, path: &str) -> Option<String> {
    let s = match get(value, path)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// First non-empty string among `paths`.
#[must_use]
pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|p| string(value, p))
}

/// Counter at `path`, 0 when absent or unparseable.
#[must_use]
pub fn count(value: &Value, path: &str) -> u64 {
    number(value, path).unwrap_or(0)
}

/// First counter present among `paths`, 0 if none.
#[must_use]
pub fn first_count(value: &Value, paths: &[&str]) -> u64 {
    paths
        .iter()
        .find_map(|p| number(value, p))
        .unwrap_or(0)
}

/// Non-negative number at `path`, tolerant of numeric strings.
#[must_use]
pub fn number(value: &Value, path: &str) -> Option<u64> {
    get(value, path).and_then(parse_count)
}

/// Signed integer at `path`.
#[must_use]
pub fn int(value: &Value, path: &str) -> Option<i64> {
    match get(value, path)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Array elements at `path`; empty when absent or not an array.
#[must_use]
pub fn items<'a>(value: &'a Value, path: &str) -> &'a [Value] {
    match get(value, path) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

/// Parse a counter the way the platforms emit them: plain numbers, numeric
/// strings, or abbreviated strings such as `1.2万`, `3亿`, `10w+`, `5k`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => {
            let s = s.trim().trim_end_matches('+').replace(',', "");
            let (digits, scale) = split_magnitude(&s);
            let parsed: f64 = digits.trim().parse().ok()?;
            (parsed >= 0.0).then(|| (parsed * scale).round() as u64)
        }
        _ => None,
    }
}

fn split_magnitude(s: &str) -> (&str, f64) {
    const SUFFIXES: &[(&str, f64)] = &[
        ("亿", 100_000_000.0),
        ("万", 10_000.0),
        ("w", 10_000.0),
        ("W", 10_000.0),
        ("千", 1_000.0),
        ("k", 1_000.0),
        ("K", 1_000.0),
    ];
    SUFFIXES
        .iter()
        .find_map(|(suffix, scale)| s.strip_suffix(suffix).map(|rest| (rest, *scale)))
        .unwrap_or((s, 1.0))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "note": {
                "noteDetailMap": {
                    "first": {"note": {"title": "  Hello\n world ", "likes": "1.2万"}},
                    "second": {"note": {"title": "Other"}}
                }
            },
            "list": [{"name": "a"}, {"name": "b"}],
            "n": 42,
            "neg": -3,
            "s": "not a number"
        })
    }

    #[test]
    fn walks_keys_indices_and_wildcards() {
        let v = sample();
        assert_eq!(text(&v, "note.noteDetailMap.*.note.title"), "Hello world");
        assert_eq!(text(&v, "list.1.name"), "b");
        assert_eq!(text(&v, "list.*.name"), "a");
        assert_eq!(get(&v, "").unwrap(), &v);
    }

    #[test]
    fn missing_or_mismatched_segments_yield_none() {
        let v = sample();
        assert!(get(&v, "note.missing.title").is_none());
        assert!(get(&v, "list.9.name").is_none());
        assert!(get(&v, "n.child").is_none());
        assert!(get(&v, "list.name").is_none());
        assert_eq!(text(&v, "nope"), "");
        assert_eq!(count(&v, "nope"), 0);
        assert!(items(&v, "n").is_empty());
    }

    #[test]
    fn counts_tolerate_strings_and_suffixes() {
        assert_eq!(parse_count(&json!(5)), Some(5));
        assert_eq!(parse_count(&json!(2.6)), Some(3));
        assert_eq!(parse_count(&json!("17")), Some(17));
        assert_eq!(parse_count(&json!("1.2万")), Some(12_000));
        assert_eq!(parse_count(&json!("3亿")), Some(300_000_000));
        assert_eq!(parse_count(&json!("10w+")), Some(100_000));
        assert_eq!(parse_count(&json!("1,234")), Some(1_234));
        assert_eq!(parse_count(&json!("5k")), Some(5_000));
        assert_eq!(parse_count(&json!(-3)), None);
        assert_eq!(parse_count(&json!("abc")), None);
        assert_eq!(parse_count(&json!(null)), None);
    }

    #[test]
    fn first_helpers_skip_absent_paths() {
        let v = sample();
        assert_eq!(first_text(&v, &["missing", "list.0.name"]), "a");
        assert_eq!(first_count(&v, &["missing", "n"]), 42);
        assert_eq!(first_count(&v, &["missing", "s"]), 0);
        assert_eq!(first_string(&v, &["missing", "n"]).as_deref(), Some("42"));
        assert!(first(&v, &["missing"]).is_none());
    }

    #[test]
    fn int_reads_signed_values() {
        let v = sample();
        assert_eq!(int(&v, "neg"), Some(-3));
        assert_eq!(int(&v, "n"), Some(42));
        assert_eq!(int(&v, "s"), None);
    }
}
