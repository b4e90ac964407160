//! Batch operations and engine-native output.
//!
//! Operations are pure data. They carry intent and payload only; how a
//! fact is matched or a model evaluated is the engine's business.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::FactSet;

/// One step of the batch sent to an engine session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Insert `value` into working memory under the identifier `name`.
    InsertFact { name: String, value: Value },
    /// Start the named workflow before rules fire.
    StartWorkflow { name: String },
    /// Terminal operation for rule-set profiles.
    FireAllRules,
    /// Terminal operation for decision-model profiles.
    EvaluateModel { namespace: String, name: String },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::InsertFact { .. } => "insert_fact",
            Operation::StartWorkflow { .. } => "start_workflow",
            Operation::FireAllRules => "fire_all_rules",
            Operation::EvaluateModel { .. } => "evaluate_model",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Operation::FireAllRules | Operation::EvaluateModel { .. }
        )
    }

    /// Diagnostic rendering, same shape as the serde encoding.
    pub fn to_dict(&self) -> Value {
        match self {
            Operation::InsertFact { name, value } => json!({
                "op": self.kind(),
                "name": name,
                "value": value,
            }),
            Operation::StartWorkflow { name } => json!({
                "op": self.kind(),
                "name": name,
            }),
            Operation::FireAllRules => json!({ "op": self.kind() }),
            Operation::EvaluateModel { namespace, name } => json!({
                "op": self.kind(),
                "namespace": namespace,
                "name": name,
            }),
        }
    }
}

/// Output of one decision in a model evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub name: String,
    pub value: Value,
}

/// Engine-native result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineResultSet {
    /// Fact snapshot keyed by the identifier each fact was inserted under,
    /// including any mutation applied by rules.
    pub facts: FactSet,
    /// Decision outputs in evaluation order (decision models only).
    pub decisions: Vec<DecisionOutcome>,
}
