//! Determinism check: run a profile twice and compare result fingerprints.
//!
//! The fingerprint covers `results` only; timestamps and durations differ
//! between runs by nature and are excluded.

use serde::Serialize;

use engine_contract::domain::{ExecutionProfile, FactSet};
use engine_contract::engine::InferenceEngine;
use engine_contract::hashing::canonical_hash;

use crate::adaptor::ExecutionAdaptor;
use crate::error::AdaptorError;
use crate::result::ExecutionResult;

/// SHA-256 of the canonical JSON of `result.results`. Lowercase hex.
pub fn results_fingerprint(result: &ExecutionResult) -> String {
    canonical_hash(&result.results_value())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeterminismReport {
    pub profile: String,
    pub first: String,
    pub second: String,
}

impl DeterminismReport {
    pub fn is_deterministic(&self) -> bool {
        self.first == self.second
    }
}

/// Execute `profile` twice with the same facts and fingerprint both runs.
pub fn verify_determinism<E: InferenceEngine>(
    adaptor: &ExecutionAdaptor<E>,
    profile: &ExecutionProfile,
    facts: &FactSet,
) -> Result<DeterminismReport, AdaptorError> {
    let first = adaptor.execute(profile, facts)?;
    let second = adaptor.execute(profile, facts)?;
    Ok(DeterminismReport {
        profile: profile.id.clone(),
        first: results_fingerprint(&first),
        second: results_fingerprint(&second),
    })
}
