// ── State transition domain type ──

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{State, format_state};

/// A single observed alert state change, reconstructed from one log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub state: State,
    pub state_reason: String,
    /// When the evaluation that produced this state ran.
    pub evaluated_at: DateTime<Utc>,
    pub values: HashMap<String, f64>,
    pub labels: HashMap<String, String>,
    /// `None` when the log line recorded no prior state.
    pub previous_state: Option<State>,
    pub previous_state_reason: String,
}

impl StateTransition {
    /// Current state in `"State (Reason)"` form.
    pub fn formatted(&self) -> String {
        format_state(self.state, &self.state_reason)
    }

    /// Previous state in `"State (Reason)"` form, empty when there is none.
    pub fn formatted_previous(&self) -> String {
        self.previous_state
            .map(|s| format_state(s, &self.previous_state_reason))
            .unwrap_or_default()
    }
}
