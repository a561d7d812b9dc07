//! JSON <-> Value conversion for command-line arguments

use serde_json::{Number, Value as Json};

use super::CliError;
use crate::Value;

/// Convert a JSON argument into a host value.
///
/// Arrays become lists and objects become maps with text keys.
pub fn json_to_value(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(b),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(f)) => Value::Float(f),
            (None, None) => Value::Text(n.to_string()),
        },
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::List(items.into_iter().map(json_to_value).collect()),
        Json::Object(entries) => Value::map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k), json_to_value(v))),
        ),
    }
}

/// Convert a native result back to JSON for the `--json` envelope.
///
/// Values with no JSON counterpart (nodes, functions, bytes) fall back to
/// their `repr` text.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Text(s) => Json::String(s.clone()),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
            Json::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.to_text(), value_to_json(v)))
                .collect(),
        ),
        other => Json::String(other.repr()),
    }
}

/// Split a `NAME=JSON` keyword argument.
pub fn parse_keyword(raw: &str) -> Result<(String, Value), CliError> {
    let Some((name, json)) = raw.split_once('=') else {
        return Err(CliError::InvalidKeyword(raw.to_string()));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidKeyword(raw.to_string()));
    }
    let value = serde_json::from_str(json)?;
    Ok((name.to_string(), json_to_value(value)))
}
