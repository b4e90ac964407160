//! Error taxonomy shared by engines and the adaptor.
//!
//! - `ConfigurationError`: raised before any engine interaction.
//! - `EngineError`: raised by the engine, surfaced to callers unchanged.
//! - `ObserverError`: non-fatal, reported through diagnostics only.

use thiserror::Error;

use crate::domain::ObserverKind;

/// Unsupported strategy values, missing/unparseable keys, broken profiles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Unsupported container strategy: {0:?}")]
    UnsupportedContainerStrategy(String),
    #[error("Unsupported session strategy: {0:?}")]
    UnsupportedSessionStrategy(String),
    #[error("Profile {profile:?} uses the coordinate container strategy but has no coordinate")]
    MissingCoordinate { profile: String },
    #[error("Missing configuration key: {key}")]
    MissingKey { key: String },
    #[error("Invalid value {value:?} for configuration key {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("Invalid profile {profile:?}: {reason}")]
    InvalidProfile { profile: String, reason: String },
    #[error("No configuration source available to resolve profile {0:?}")]
    NoSource(String),
    #[error("Configuration source error: {0}")]
    Source(String),
}

/// Failure raised by the engine during container resolution, session
/// creation or batch execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Container {container} unavailable: {message}")]
    ContainerUnavailable { container: String, message: String },
    #[error("Knowledge base {0:?} not found in container")]
    UnknownKnowledgeBase(String),
    #[error("Session {name:?} could not be opened: {message}")]
    SessionUnavailable { name: String, message: String },
    #[error("Decision model {namespace}#{name} not found")]
    UnknownModel { namespace: String, name: String },
    #[error("Workflow {0:?} not found")]
    UnknownWorkflow(String),
    #[error("Session {0:?} already disposed")]
    SessionDisposed(String),
    #[error("Batch execution failed: {0}")]
    Execution(String),
}

/// Defect in an attached observer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} observer failed: {message}")]
pub struct ObserverError {
    pub kind: ObserverKind,
    pub message: String,
}

impl ObserverError {
    pub fn new(kind: ObserverKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
