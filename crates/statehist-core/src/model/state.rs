// ── Alert evaluation state ──
//
// The closed set of states an alert instance can be in, plus the
// "State (Reason)" string form the historian writes into log lines.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result state of an alert rule evaluation.
///
/// Parsing is exact and case-sensitive (`"Alerting"`, not `"alerting"`),
/// matching what the state historian writes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum State {
    #[default]
    Normal,
    Alerting,
    Pending,
    NoData,
    Error,
}

/// Error returned when a state string names no known state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid state value {value:?}")]
pub struct InvalidState {
    pub value: String,
}

/// Parse a formatted state such as `"Alerting"` or `"Normal (MissingSeries)"`.
///
/// Returns the state and the reason found inside the parentheses (empty
/// when there is none). Anything after the state name other than a single
/// non-empty `(reason)` is rejected.
pub fn parse_formatted_state(raw: &str) -> Result<(State, String), InvalidState> {
    let raw = raw.trim();
    let invalid = || InvalidState {
        value: raw.to_owned(),
    };

    let (name, reason) = match raw.split_once(" (") {
        Some((name, rest)) => {
            let reason = rest.strip_suffix(')').ok_or_else(invalid)?;
            if reason.is_empty() || reason.contains(['(', ')']) {
                return Err(invalid());
            }
            (name, reason)
        }
        None => (raw, ""),
    };

    let state = name.parse::<State>().map_err(|_| invalid())?;
    Ok((state, reason.to_owned()))
}

/// Render a state and optional reason the way the historian stores it.
pub fn format_state(state: State, reason: &str) -> String {
    if reason.is_empty() {
        state.to_string()
    } else {
        format!("{state} ({reason})")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_state() {
        assert_eq!(
            parse_formatted_state("Alerting").unwrap(),
            (State::Alerting, String::new())
        );
        assert_eq!(
            parse_formatted_state("NoData").unwrap(),
            (State::NoData, String::new())
        );
    }

    #[test]
    fn parses_state_with_reason() {
        assert_eq!(
            parse_formatted_state("Error (NoData)").unwrap(),
            (State::Error, "NoData".to_owned())
        );
        assert_eq!(
            parse_formatted_state("Normal (MissingSeries)").unwrap(),
            (State::Normal, "MissingSeries".to_owned())
        );
    }

    #[test]
    fn rejects_unknown_and_empty_states() {
        assert!(parse_formatted_state("Invalid").is_err());
        assert!(parse_formatted_state("alerting").is_err());
        assert!(parse_formatted_state("").is_err());
    }

    #[test]
    fn rejects_malformed_reasons() {
        for raw in [
            "Alerting garbage",
            "Error (NoData",
            "Error NoData)",
            "Error ()",
            "Error (NoData) extra",
            "Error ((NoData))",
        ] {
            let err = parse_formatted_state(raw).unwrap_err();
            assert_eq!(err.value, raw, "accepted {raw:?}");
        }
    }

    #[test]
    fn format_round_trips_reason() {
        assert_eq!(format_state(State::Pending, ""), "Pending");
        assert_eq!(format_state(State::Error, "NoData"), "Error (NoData)");
    }
}
