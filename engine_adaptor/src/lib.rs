#![forbid(unsafe_code)]

//! Execution adaptor for rule-set and decision-model engines.
//!
//! Resolves a named profile, picks the container and session strategy,
//! builds the operation batch, attaches diagnostic observers and
//! normalizes the engine output into a timestamped `ExecutionResult`.
//!
//! No rule matching or decision evaluation lives here. All of that is
//! delegated to the engine through the `engine_contract` traits.

pub mod error;
pub mod config;
pub mod container;
pub mod session;
pub mod batch;
pub mod observers;
pub mod clock;
pub mod result;
pub mod normalizer;
pub mod adaptor;
pub mod determinism;

pub use adaptor::ExecutionAdaptor;
pub use error::AdaptorError;
pub use result::{DurationBreakdown, ExecutionResult, NamedResult};
