//! Best-effort deserializers for caller-supplied payloads.
//!
//! Payloads are produced upstream by an orchestrator and are frequently sloppy:
//! numbers arrive as strings, lists arrive as `null`, objects arrive as scalars.
//! None of these is an error; every field degrades to its documented default.
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

/// Interprets a JSON value as a finite number, if it can be read as one.
pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Interprets a JSON value as truthy, the way a permissive caller would mean it.
pub fn as_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "0" | "no" | "off"
        ),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// A number; absent, null or unparsable values become `0.0`.
pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(optional_number(deserializer)?.unwrap_or(0.0))
}

/// An optional number; null or unparsable values become `None`.
pub fn optional_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    Ok(as_number(&Value::deserialize(deserializer)?))
}

/// A boolean flag, see [`as_truthy`].
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(as_truthy(&Value::deserialize(deserializer)?))
}

/// An optional string; numbers are stringified, blank strings become `None`.
pub fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => return Ok(None),
    };
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// A list; anything that is not an array is an empty list, and items that cannot
/// be read as `T` are skipped.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => vec![],
    })
}

/// A nested mapping; anything that cannot be read as `T` is `T::default()`.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// An optional nested mapping; null or non-mapping values become `None`.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Deserializes `T` from a JSON mapping; any other JSON value is rejected.
pub fn mapping<'a, T: Deserialize<'a>>(value: &'a Value) -> Result<T, serde_json::Error> {
    if !value.is_object() {
        return Err(serde::de::Error::custom(format!(
            "expected a mapping, found {value}"
        )));
    }
    T::deserialize(value)
}

/// Normalizes a lookup key: trimmed and lower case.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}
