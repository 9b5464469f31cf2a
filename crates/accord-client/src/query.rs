//! Query string encoding.
//!
//! Plain mode flattens values into form pairs: nested objects become
//! `key[sub]=v`, arrays repeat their key, `null` is omitted.
//!
//! JSON mode sends every top-level value as JSON text so the server can parse
//! it back. Plain strings go out raw unless they would parse as something
//! else (`true`, `42`, `null`), in which case they are quoted.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Encode `query` as a URL query string (without the leading `?`).
pub fn encode_query(query: &Map<String, Value>, json_mode: bool) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        if json_mode {
            if let Some(text) = json_text(value) {
                serializer.append_pair(key, &text);
            }
        } else {
            append_plain(&mut serializer, key, value);
        }
    }
    serializer.finish()
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if serde_json::from_str::<Value>(s).is_err() => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn append_plain(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Bool(_) | Value::Number(_) => {
            serializer.append_pair(key, &value.to_string());
        }
        Value::Array(items) => {
            for item in items {
                append_plain(serializer, key, item);
            }
        }
        Value::Object(map) => {
            for (sub, child) in map {
                append_plain(serializer, &format!("{key}[{sub}]"), child);
            }
        }
    }
}
