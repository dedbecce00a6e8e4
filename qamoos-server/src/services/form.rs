//! Reading submitted fields.
//!
//! Multipart forms deliver every field as text, so structured fields such as
//! `translation` or `words` arrive JSON-encoded; JSON bodies deliver them
//! already structured. Both encodings are accepted.

use qamoos_core::{DictError, DictResult};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

/// A trimmed, non-empty text field.
pub fn text(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A structured field, decoded from either encoding. Absent, null and blank are `None`.
pub fn structured<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    name: &str,
) -> DictResult<Option<T>> {
    let parsed = match fields.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => serde_json::from_str(s),
        Some(other) => serde_json::from_value(other.clone()),
    };
    parsed.map(Some).map_err(|e| {
        DictError::bad_request(format!("Malformed '{name}' field"))
            .with_errors(json!({ name: e.to_string() }))
            .into_anyhow()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qamoos_core::{ErrorKind, Translations};

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn structured_accepts_both_encodings() {
        let encoded = fields(json!({ "translation": r#"{"english":"water"}"# }));
        let nested = fields(json!({ "translation": { "english": "water" } }));
        let a: Option<Translations> = structured(&encoded, "translation").unwrap();
        let b: Option<Translations> = structured(&nested, "translation").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.unwrap().english.as_deref(), Some("water"));
    }

    #[test]
    fn malformed_structured_field_is_bad_request() {
        let broken = fields(json!({ "words": "[{\"word\": " }));
        let err = structured::<Vec<Value>>(&broken, "words").unwrap_err();
        let dict = DictError::normalize(err);
        assert_eq!(dict.kind, ErrorKind::BadRequest);
        assert!(dict.errors.unwrap().get("words").is_some());
    }

    #[test]
    fn blank_text_is_absent() {
        let f = fields(json!({ "word": "   ", "category": "c1" }));
        assert_eq!(text(&f, "word"), None);
        assert_eq!(text(&f, "category").as_deref(), Some("c1"));
        assert_eq!(text(&f, "missing"), None);
    }
}
