// ── Log line to state transition decoding ──
//
// Bridges the loosely typed `statehist_api::LokiEntry` payload into the
// strongly typed `StateTransition`. State names are parsed against the
// closed `State` set and the values map is narrowed to `f64`. Any
// mismatch is a `DecodeError`; the store drops such entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use statehist_api::{LokiEntry, Sample};

use crate::model::state::{InvalidState, parse_formatted_state};
use crate::model::transition::StateTransition;

/// Why a single log line could not be turned into a transition.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed log line: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidState(#[from] InvalidState),

    #[error("unexpected nil value")]
    NilValue,

    #[error("unexpected value type for {key:?}: {found}")]
    UnexpectedValueType { key: String, found: &'static str },

    #[error("invalid numeric value for {key:?}: {value:?}")]
    InvalidNumber { key: String, value: String },
}

// ── Helpers ────────────────────────────────────────────────────────

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Narrow a JSON object of numbers into `HashMap<String, f64>`.
///
/// Numeric strings (`"1.5"`, `"NaN"`) are accepted since some writers
/// stringify non-finite values.
pub fn numeric_map(values: Option<&Value>) -> Result<HashMap<String, f64>, DecodeError> {
    let object = match values {
        None | Some(Value::Null) => return Err(DecodeError::NilValue),
        Some(Value::Object(object)) => object,
        Some(other) => {
            return Err(DecodeError::UnexpectedValueType {
                key: "values".into(),
                found: type_name(other),
            });
        }
    };

    object
        .iter()
        .map(|(key, value)| {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => Some(s.trim().parse::<f64>().map_err(|_| {
                    DecodeError::InvalidNumber {
                        key: key.clone(),
                        value: s.clone(),
                    }
                })?),
                _ => None,
            };
            number
                .map(|n| (key.clone(), n))
                .ok_or_else(|| DecodeError::UnexpectedValueType {
                    key: key.clone(),
                    found: type_name(value),
                })
        })
        .collect()
}

// ── Decoding ───────────────────────────────────────────────────────

/// Parse a raw log line into its JSON payload.
pub fn decode_entry(line: &str) -> Result<LokiEntry, DecodeError> {
    Ok(serde_json::from_str(line)?)
}

/// Build a `StateTransition` from a decoded entry.
///
/// An empty `previous` means the line recorded no prior state; that is
/// not an error.
pub fn decode_transition(
    entry: &LokiEntry,
    evaluated_at: DateTime<Utc>,
) -> Result<StateTransition, DecodeError> {
    let (state, state_reason) = parse_formatted_state(&entry.current)?;

    let (previous_state, previous_state_reason) = if entry.previous.trim().is_empty() {
        (None, String::new())
    } else {
        let (prev, reason) = parse_formatted_state(&entry.previous)?;
        (Some(prev), reason)
    };

    let values = numeric_map(entry.values.as_ref())?;

    Ok(StateTransition {
        state,
        state_reason,
        evaluated_at,
        values,
        labels: entry.instance_labels.clone(),
        previous_state,
        previous_state_reason,
    })
}

/// Decode one stream sample into its entry and transition.
pub fn decode_sample(sample: &Sample) -> Result<(LokiEntry, StateTransition), DecodeError> {
    let entry = decode_entry(&sample.line)?;
    let evaluated_at = DateTime::from_timestamp_nanos(sample.timestamp_ns);
    let transition = decode_transition(&entry, evaluated_at)?;
    Ok((entry, transition))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::State;

    fn entry(current: &str, previous: &str, values: Option<Value>) -> LokiEntry {
        LokiEntry {
            current: current.into(),
            previous: previous.into(),
            values,
            ..LokiEntry::default()
        }
    }

    // ── numeric_map ──

    #[test]
    fn numeric_map_rejects_missing_container() {
        let err = numeric_map(None).unwrap_err();
        assert!(err.to_string().contains("unexpected nil value"));

        let err = numeric_map(Some(&Value::Null)).unwrap_err();
        assert!(err.to_string().contains("unexpected nil value"));
    }

    #[test]
    fn numeric_map_rejects_null_member() {
        let err = numeric_map(Some(&json!({ "key1": null }))).unwrap_err();
        assert!(err.to_string().contains("unexpected value type"));
    }

    #[test]
    fn numeric_map_converts_numbers() {
        let map = numeric_map(Some(&json!({ "key1": 1.0, "key2": 2, "key3": "3.5" }))).unwrap();
        assert_eq!(
            map,
            HashMap::from([
                ("key1".to_owned(), 1.0),
                ("key2".to_owned(), 2.0),
                ("key3".to_owned(), 3.5),
            ])
        );
    }

    #[test]
    fn numeric_map_rejects_non_numeric_strings() {
        let err = numeric_map(Some(&json!({ "key1": 1.0, "key2": "not a float" }))).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { ref key, .. } if key == "key2"));
    }

    #[test]
    fn numeric_map_rejects_non_object_container() {
        let err = numeric_map(Some(&json!([1, 2]))).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedValueType { found: "array", .. }));
    }

    // ── decode_transition ──

    #[test]
    fn invalid_state_strings_fail() {
        let values = Some(json!({}));
        let current = entry("Invalid", "", values.clone());
        assert!(decode_transition(&current, DateTime::UNIX_EPOCH).is_err());
        let err = decode_transition(&entry("Normal", "Invalid", values), DateTime::UNIX_EPOCH)
            .unwrap_err();
        assert!(err.to_string().contains("invalid state value"));
    }

    #[test]
    fn non_numeric_values_fail() {
        let result = decode_transition(
            &entry("Normal", "", Some(json!({ "key1": "not a float" }))),
            DateTime::UNIX_EPOCH,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_previous_means_no_previous_state() {
        let transition =
            decode_transition(&entry("Alerting", "", Some(json!({}))), DateTime::UNIX_EPOCH)
                .unwrap();
        assert_eq!(transition.previous_state, None);
        assert!(transition.previous_state_reason.is_empty());
        assert_eq!(transition.formatted_previous(), "");
    }

    #[test]
    fn builds_transition_with_composite_previous() {
        let labels = HashMap::from([
            ("key1".to_owned(), "value1".to_owned()),
            ("key2".to_owned(), "value2".to_owned()),
        ]);
        let source = LokiEntry {
            current: "Normal".into(),
            previous: "Error (NoData)".into(),
            values: Some(json!({ "key1": 1.0, "key2": 2.0 })),
            instance_labels: labels.clone(),
            ..LokiEntry::default()
        };
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let expected = StateTransition {
            state: State::Normal,
            state_reason: String::new(),
            evaluated_at: at,
            values: HashMap::from([("key1".to_owned(), 1.0), ("key2".to_owned(), 2.0)]),
            labels,
            previous_state: Some(State::Error),
            previous_state_reason: "NoData".into(),
        };

        assert_eq!(decode_transition(&source, at).unwrap(), expected);
    }

    #[test]
    fn decode_sample_uses_sample_timestamp() {
        let sample = Sample::new(
            1_700_000_000_500_000_000,
            r#"{"current":"Pending (Error)","previous":"Normal","values":{"A":0}}"#,
        );
        let (_, transition) = decode_sample(&sample).unwrap();
        assert_eq!(transition.evaluated_at.timestamp_millis(), 1_700_000_000_500);
        assert_eq!(transition.formatted(), "Pending (Error)");
        assert_eq!(transition.previous_state, Some(State::Normal));
    }

    #[test]
    fn decode_sample_rejects_malformed_line() {
        let err = decode_sample(&Sample::new(0, "{not json")).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
