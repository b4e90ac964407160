//! Session strategy selection and scoped session lifetime.
//!
//! A stateful session is disposed exactly once on every exit path:
//! explicit `close`, early return on error, or unwinding. Stateless
//! sessions are never disposed.

use tracing::{debug, instrument};

use engine_contract::domain::{ExecutionProfile, SessionStrategy};
use engine_contract::engine::{EngineSession, InferenceEngine, KnowledgeContainer, SessionSpec};
use engine_contract::error::EngineError;
use engine_contract::operations::{EngineResultSet, Operation};

use crate::observers::ObserverRegistry;

/// Owns one engine session for the duration of a call.
pub struct SessionGuard {
    session: Box<dyn EngineSession>,
    name: String,
    strategy: SessionStrategy,
    disposed: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn EngineSession>, name: &str, strategy: SessionStrategy) -> Self {
        Self {
            session,
            name: name.to_string(),
            strategy,
            disposed: false,
        }
    }

    pub fn run(&mut self, operations: &[Operation]) -> Result<EngineResultSet, EngineError> {
        self.session.run(operations)
    }

    /// Release the session now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.strategy != SessionStrategy::Stateful || self.disposed {
            return;
        }
        self.disposed = true;
        self.session.dispose();
        debug!(session = %self.name, "session disposed");
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

pub fn session_spec(profile: &ExecutionProfile) -> SessionSpec {
    SessionSpec {
        knowledge_base: profile.knowledge_base_name.clone(),
        session_name: profile.session_name.clone(),
        strategy: profile.session_strategy,
    }
}

/// Open a session for `profile` and attach its flagged observers before
/// anything runs.
#[instrument(level = "debug", skip_all, fields(profile = %profile.id, session = %profile.session_name, strategy = %profile.session_strategy))]
pub fn open_session<E: InferenceEngine + ?Sized>(
    engine: &E,
    container: &dyn KnowledgeContainer,
    profile: &ExecutionProfile,
    observers: &ObserverRegistry,
) -> Result<SessionGuard, EngineError> {
    let spec = session_spec(profile);
    let session = engine.open_session(container, &spec)?;
    let mut guard = SessionGuard::new(session, &spec.session_name, spec.strategy);

    observers.attach(&profile.observer_flags, &profile.id, guard.session.as_mut());
    debug!("session opened");
    Ok(guard)
}
