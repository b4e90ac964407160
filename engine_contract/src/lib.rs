#![forbid(unsafe_code)]

//! Engine contract for profile-driven rule-set and decision-model execution.
//!
//! Everything an engine and the execution adaptor agree on lives here:
//! profiles and facts, batch operations, the engine/session/observer
//! traits, the error taxonomy and canonical hashing.
//!
//! No rule matching or decision evaluation lives here. The scripted engine
//! is a deterministic test double, not an inference engine.

pub mod domain;
pub mod error;
pub mod operations;
pub mod observer;
pub mod engine;
pub mod validation;
pub mod hashing;
pub mod scripted;
