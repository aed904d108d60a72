//! Input shape validation at the JSON boundary.
//!
//! The upstream search step hands over untyped JSON. A collection that is not
//! an array of event records is a contract violation and fails the whole run;
//! everything finer-grained (bad dates, duplicates) is handled per record by
//! [`crate::consolidate`].

use serde_json::Value;

use eventdigest_shared::{EventDigestError, RawEvent, Result};

/// Convert a JSON value into raw event records.
///
/// Fails with [`EventDigestError::InputShape`] when the value is not an
/// array, or when an element is not an object with string `title` and `url`
/// and correctly typed optional fields.
pub fn parse_raw_events(value: &Value) -> Result<Vec<RawEvent>> {
    let Value::Array(items) = value else {
        return Err(EventDigestError::input_shape(
            None,
            format!("expected a JSON array of events, found {}", type_name(value)),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(EventDigestError::input_shape(
                    Some(i),
                    format!("expected an event object, found {}", type_name(item)),
                ));
            }
            serde_json::from_value::<RawEvent>(item.clone())
                .map_err(|e| EventDigestError::input_shape(Some(i), e.to_string()))
        })
        .collect()
}

/// Parse JSON text, then validate its shape.
pub fn parse_raw_events_str(json: &str) -> Result<Vec<RawEvent>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| EventDigestError::parse(format!("invalid JSON input: {e}")))?;
    parse_raw_events(&value)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_array_of_records() {
        let value = json!([
            {"title": "AI Meetup", "url": "https://x.com/e", "start_date": "May 19"},
            {"title": "TBD Event", "url": "https://x.com/f", "start_date": "TBD"},
            {"title": "No date", "url": "https://x.com/g"}
        ]);
        let events = parse_raw_events(&value).unwrap();
        assert_eq!(events.len(), 3);
        assert!(events[2].start_date.is_none());
    }

    #[test]
    fn rejects_non_array() {
        let err = parse_raw_events(&json!({"events": []})).unwrap_err();
        assert!(matches!(err, EventDigestError::InputShape { index: None, .. }));
        assert!(err.to_string().contains("found an object"));
    }

    #[test]
    fn rejects_non_object_element() {
        let err = parse_raw_events(&json!([{"title": "a", "url": "b"}, "oops"])).unwrap_err();
        assert!(matches!(err, EventDigestError::InputShape { index: Some(1), .. }));
    }

    #[test]
    fn rejects_missing_title() {
        let err = parse_raw_events(&json!([{"url": "https://x.com"}])).unwrap_err();
        assert!(matches!(err, EventDigestError::InputShape { index: Some(0), .. }));
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn rejects_wrong_field_types() {
        let err = parse_raw_events(&json!([
            {"title": "a", "url": "b", "source_confidence": "high"}
        ]))
        .unwrap_err();
        assert!(matches!(err, EventDigestError::InputShape { index: Some(0), .. }));

        let err = parse_raw_events(&json!([{"title": "a", "url": "b", "start_date": 42}]))
            .unwrap_err();
        assert!(matches!(err, EventDigestError::InputShape { index: Some(0), .. }));
    }

    #[test]
    fn invalid_json_text_is_parse_error() {
        let err = parse_raw_events_str("[{").unwrap_err();
        assert!(matches!(err, EventDigestError::Parse { .. }));
    }
}
