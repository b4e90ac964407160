//! Profile invariant checks.
//!
//! Every check returns `ConfigurationError::InvalidProfile` (or
//! `MissingCoordinate`) on failure. Runs before any engine interaction.

use crate::domain::{ContainerStrategy, ExecutionProfile, ProfileKind};
use crate::error::ConfigurationError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all profile checks. Returns the first failure.
pub fn validate_profile(profile: &ExecutionProfile) -> Result<(), ConfigurationError> {
    check_id(profile)?;
    check_knowledge_base(profile)?;
    check_coordinate(profile)?;
    check_session_name(profile)?;
    check_decision_model(profile)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn invalid(profile: &ExecutionProfile, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidProfile {
        profile: profile.id.clone(),
        reason: reason.to_string(),
    }
}

fn check_id(profile: &ExecutionProfile) -> Result<(), ConfigurationError> {
    if profile.id.trim().is_empty() {
        return Err(invalid(profile, "profile id is empty"));
    }
    Ok(())
}

fn check_knowledge_base(profile: &ExecutionProfile) -> Result<(), ConfigurationError> {
    if profile.knowledge_base_name.trim().is_empty() {
        return Err(invalid(profile, "knowledge base name is empty"));
    }
    Ok(())
}

/// Coordinate strategy needs a non-empty coordinate; classpath ignores it.
fn check_coordinate(profile: &ExecutionProfile) -> Result<(), ConfigurationError> {
    if profile.container_strategy == ContainerStrategy::Coordinate {
        profile.container_source()?;
    }
    Ok(())
}

/// Rule sets always name their session; decision models may use the
/// engine's default session.
fn check_session_name(profile: &ExecutionProfile) -> Result<(), ConfigurationError> {
    if let ProfileKind::RuleSet { .. } = profile.kind {
        if profile.session_name.trim().is_empty() {
            return Err(invalid(profile, "rule-set profile has no session name"));
        }
    }
    Ok(())
}

fn check_decision_model(profile: &ExecutionProfile) -> Result<(), ConfigurationError> {
    if let ProfileKind::DecisionModel {
        model_name,
        model_namespace,
    } = &profile.kind
    {
        if model_name.trim().is_empty() {
            return Err(invalid(profile, "decision model name is empty"));
        }
        if model_namespace.trim().is_empty() {
            return Err(invalid(profile, "decision model namespace is empty"));
        }
    }
    Ok(())
}
