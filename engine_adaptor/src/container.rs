//! Container strategy selection.
//!
//! The profile's container address is checked before the engine is
//! touched: a coordinate strategy with no coordinate never reaches
//! `resolve_container`. Engine failures surface as-is, no retries.

use std::sync::Arc;

use tracing::{debug, instrument};

use engine_contract::domain::ExecutionProfile;
use engine_contract::engine::{InferenceEngine, KnowledgeContainer};

use crate::error::AdaptorError;

/// Resolve the knowledge container for `profile` and confirm it carries
/// the profile's knowledge base.
#[instrument(level = "debug", skip_all, fields(profile = %profile.id, strategy = %profile.container_strategy))]
pub fn select_container<E: InferenceEngine + ?Sized>(
    engine: &E,
    profile: &ExecutionProfile,
) -> Result<Arc<dyn KnowledgeContainer>, AdaptorError> {
    let source = profile.container_source()?;
    debug!(source = %source, "resolving container");

    let container = engine.resolve_container(&source)?;
    container.check_knowledge_base(&profile.knowledge_base_name)?;

    debug!(knowledge_base = %profile.knowledge_base_name, "container ready");
    Ok(container)
}
