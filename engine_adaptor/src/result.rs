//! Uniform execution result.
//!
//! Wire shape:
//!
//! ```json
//! {"startedAt": "2024-01-01 00:00:00",
//!  "completedAt": "2024-01-02 01:30:45",
//!  "duration": {"days": 1, "hours": 25, "minutes": 1530,
//!               "seconds": 91845, "milliseconds": 91845500},
//!  "results": [{"name": "facts", "value": {...}}]}
//! ```

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the single aggregate result of a rule-set run.
pub const FACTS_RESULT_NAME: &str = "facts";

/// Timestamp format used on the wire.
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedResult {
    pub name: String,
    pub value: Value,
}

impl NamedResult {
    pub fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// Elapsed time between two instants.
///
/// Each field is the whole elapsed amount in its own unit, truncated toward
/// zero. They are not components of one another: 1 day 1h30m45.5s is
/// `days = 1, hours = 25, minutes = 1530, ...`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBreakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
}

impl DurationBreakdown {
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let elapsed = end - start;
        Self {
            days: elapsed.num_days(),
            hours: elapsed.num_hours(),
            minutes: elapsed.num_minutes(),
            seconds: elapsed.num_seconds(),
            milliseconds: elapsed.num_milliseconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(with = "wire_timestamp")]
    pub started_at: NaiveDateTime,
    #[serde(with = "wire_timestamp")]
    pub completed_at: NaiveDateTime,
    pub duration: DurationBreakdown,
    pub results: Vec<NamedResult>,
}

impl ExecutionResult {
    /// Value of the first result named `name`.
    pub fn result(&self, name: &str) -> Option<&Value> {
        self.results.iter().find(|r| r.name == name).map(|r| &r.value)
    }

    pub fn result_names(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.name.as_str())
    }

    /// `results` as a JSON array, timestamps excluded.
    pub fn results_value(&self) -> Value {
        Value::Array(
            self.results
                .iter()
                .map(|r| serde_json::json!({"name": r.name, "value": r.value}))
                .collect(),
        )
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} ms) [{}]",
            self.started_at.format(WIRE_TIMESTAMP_FORMAT),
            self.completed_at.format(WIRE_TIMESTAMP_FORMAT),
            self.duration.milliseconds,
            self.result_names().collect::<Vec<_>>().join(", ")
        )
    }
}

/// Second-precision timestamps; sub-second parts are dropped on the wire.
mod wire_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::WIRE_TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(WIRE_TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, WIRE_TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
