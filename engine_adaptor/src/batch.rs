//! Fact batch builder.
//!
//! Batch layout, never reordered or deduplicated:
//!   1. one `InsertFact` per fact, in fact-set order
//!   2. `StartWorkflow` when the profile names one (rule sets only)
//!   3. one terminal operation: `FireAllRules` or `EvaluateModel`

use engine_contract::domain::{ExecutionProfile, FactSet, ProfileKind};
use engine_contract::operations::Operation;

pub fn build_batch(profile: &ExecutionProfile, facts: &FactSet) -> Vec<Operation> {
    let mut operations = Vec::with_capacity(facts.len() + 2);

    operations.extend(facts.iter().map(|(name, value)| Operation::InsertFact {
        name: name.clone(),
        value: value.clone(),
    }));

    if let Some(workflow) = profile.workflow_to_start() {
        operations.push(Operation::StartWorkflow {
            name: workflow.to_string(),
        });
    }

    operations.push(match &profile.kind {
        ProfileKind::RuleSet { .. } => Operation::FireAllRules,
        ProfileKind::DecisionModel {
            model_name,
            model_namespace,
        } => Operation::EvaluateModel {
            namespace: model_namespace.clone(),
            name: model_name.clone(),
        },
    });

    operations
}
