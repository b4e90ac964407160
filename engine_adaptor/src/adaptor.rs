//! Execution adaptor facade.
//!
//! Two-phase use: `resolve_profile(id)` then `execute(profile, facts)`;
//! `execute_by_name` chains both. Each call is self-contained: the
//! container is looked up, a fresh session is opened, used once and
//! released, and nothing survives the call apart from the result.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use engine_contract::domain::{ExecutionProfile, FactSet};
use engine_contract::engine::InferenceEngine;
use engine_contract::error::ConfigurationError;
use engine_contract::validation::validate_profile;

use crate::batch::build_batch;
use crate::clock::{Clock, SystemClock};
use crate::config::{self, ConfigSource};
use crate::container::select_container;
use crate::error::AdaptorError;
use crate::normalizer::normalize;
use crate::observers::ObserverRegistry;
use crate::result::ExecutionResult;
use crate::session::open_session;

pub struct ExecutionAdaptor<E> {
    engine: E,
    config: Option<Arc<dyn ConfigSource>>,
    observers: ObserverRegistry,
    clock: Arc<dyn Clock>,
}

impl<E: InferenceEngine> ExecutionAdaptor<E> {
    /// Adaptor over `engine` with no configuration source, tracing
    /// observers and the system clock.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: None,
            observers: ObserverRegistry::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config<C: ConfigSource + 'static>(self, config: C) -> Self {
        self.with_config_source(Arc::new(config))
    }

    pub fn with_config_source(mut self, config: Arc<dyn ConfigSource>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_observers(mut self, observers: ObserverRegistry) -> Self {
        self.observers = observers;
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Resolve a profile id through the configuration source.
    pub fn resolve_profile(&self, profile_id: &str) -> Result<ExecutionProfile, ConfigurationError> {
        let source = self
            .config
            .as_deref()
            .ok_or_else(|| ConfigurationError::NoSource(profile_id.to_string()))?;
        config::resolve_profile(source, profile_id)
    }

    pub fn execute_by_name(
        &self,
        profile_id: &str,
        facts: &FactSet,
    ) -> Result<ExecutionResult, AdaptorError> {
        let profile = self.resolve_profile(profile_id)?;
        self.execute(&profile, facts)
    }

    /// Run `facts` through the engine as described by `profile`.
    ///
    /// Configuration problems are reported before the engine is called.
    /// Engine failures are returned unchanged, after a stateful session has
    /// been disposed.
    #[instrument(level = "debug", skip_all, fields(profile = %profile.id, kind = profile.kind.label()))]
    pub fn execute(
        &self,
        profile: &ExecutionProfile,
        facts: &FactSet,
    ) -> Result<ExecutionResult, AdaptorError> {
        validate_profile(profile)?;

        let started_at = self.clock.now();
        let container = select_container(&self.engine, profile)?;
        let operations = build_batch(profile, facts);
        debug!(operations = operations.len(), facts = facts.len(), "batch built");

        let mut session = open_session(&self.engine, container.as_ref(), profile, &self.observers)?;
        let output = session.run(&operations)?;
        session.close();
        let completed_at = self.clock.now();

        let result = normalize(profile, started_at, completed_at, output);
        info!(profile = %profile.id, "execution completed: {}", result);
        Ok(result)
    }
}
