//! Result normalizer: engine-native output to `ExecutionResult`.
//!
//! Decision models yield one result per decision, in engine order.
//! Rule sets yield a single `"facts"` result holding the fact snapshot.
//! Values pass through untouched. Never fails.

use chrono::NaiveDateTime;

use engine_contract::domain::{ExecutionProfile, ProfileKind};
use engine_contract::operations::EngineResultSet;

use crate::result::{DurationBreakdown, ExecutionResult, NamedResult, FACTS_RESULT_NAME};

pub fn normalize(
    profile: &ExecutionProfile,
    started_at: NaiveDateTime,
    completed_at: NaiveDateTime,
    output: EngineResultSet,
) -> ExecutionResult {
    let results = match profile.kind {
        ProfileKind::DecisionModel { .. } => output
            .decisions
            .into_iter()
            .map(|d| NamedResult {
                name: d.name,
                value: d.value,
            })
            .collect(),
        ProfileKind::RuleSet { .. } => vec![NamedResult {
            name: FACTS_RESULT_NAME.to_string(),
            value: serde_json::Value::Object(output.facts.into_inner()),
        }],
    };

    ExecutionResult {
        started_at,
        completed_at,
        duration: DurationBreakdown::between(started_at, completed_at),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use engine_contract::domain::FactSet;
    use engine_contract::operations::DecisionOutcome;
    use serde_json::json;

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, s)
            .unwrap()
    }

    #[test]
    fn rule_set_yields_one_facts_result() {
        let output = EngineResultSet {
            facts: FactSet::new().with("age", json!(30)).with("name", json!("Ann")),
            decisions: Vec::new(),
        };
        let result = normalize(&ExecutionProfile::rule_set("p", "kb", "s"), at(0), at(2), output);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].name, "facts");
        assert_eq!(result.results[0].value, json!({"age": 30, "name": "Ann"}));
        assert_eq!(result.duration.seconds, 2);
    }

    #[test]
    fn decision_model_keeps_engine_order() {
        let output = EngineResultSet {
            facts: FactSet::new().with("ignored", json!(true)),
            decisions: vec![
                DecisionOutcome {
                    name: "Risk".to_string(),
                    value: json!("high"),
                },
                DecisionOutcome {
                    name: "Approved".to_string(),
                    value: json!(null),
                },
            ],
        };
        let profile = ExecutionProfile::decision_model("d", "kb", "ns", "m");
        let result = normalize(&profile, at(0), at(0), output);
        assert_eq!(result.result_names().collect::<Vec<_>>(), vec!["Risk", "Approved"]);
        assert_eq!(result.result("Approved"), Some(&json!(null)));
    }

    #[test]
    fn empty_decision_output_is_an_empty_result_list() {
        let profile = ExecutionProfile::decision_model("d", "kb", "ns", "m");
        let result = normalize(&profile, at(0), at(1), EngineResultSet::default());
        assert!(result.results.is_empty());
    }
}
