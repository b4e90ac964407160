//! Engine collaborator interface.
//!
//! The adaptor depends on nothing beyond this surface:
//!   1. `resolve_container(source)`      knowledge container handle
//!   2. `open_session(container, spec)`  fresh session for one call
//!   3. `attach_observer` / `run`        observers, then one batch
//!   4. `dispose`                        stateful sessions only
//!
//! Containers are read-only once built and shared across calls
//! (`Send + Sync`). Sessions are owned by exactly one call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{ContainerSource, SessionStrategy};
use crate::error::EngineError;
use crate::observer::SessionObserver;
use crate::operations::{EngineResultSet, Operation};

/// Session request derived from a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub knowledge_base: String,
    pub session_name: String,
    pub strategy: SessionStrategy,
}

/// Compiled knowledge bundle the engine evaluates against.
pub trait KnowledgeContainer: Send + Sync {
    /// Address this container was resolved from.
    fn source(&self) -> &ContainerSource;

    /// Fails with `EngineError::UnknownKnowledgeBase` when the container
    /// does not carry the named knowledge base.
    fn check_knowledge_base(&self, name: &str) -> Result<(), EngineError>;
}

/// Runtime handle through which a batch is executed.
pub trait EngineSession: Send {
    fn attach_observer(&mut self, observer: Box<dyn SessionObserver>);

    /// Execute the batch in order and return the engine-native result.
    fn run(&mut self, operations: &[Operation]) -> Result<EngineResultSet, EngineError>;

    /// Release the session's working memory. Called once, stateful only.
    fn dispose(&mut self);
}

/// The inference engine itself.
pub trait InferenceEngine: Send + Sync {
    fn resolve_container(
        &self,
        source: &ContainerSource,
    ) -> Result<Arc<dyn KnowledgeContainer>, EngineError>;

    fn open_session(
        &self,
        container: &dyn KnowledgeContainer,
        spec: &SessionSpec,
    ) -> Result<Box<dyn EngineSession>, EngineError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Arc<E> {
    fn resolve_container(
        &self,
        source: &ContainerSource,
    ) -> Result<Arc<dyn KnowledgeContainer>, EngineError> {
        (**self).resolve_container(source)
    }

    fn open_session(
        &self,
        container: &dyn KnowledgeContainer,
        spec: &SessionSpec,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        (**self).open_session(container, spec)
    }
}
