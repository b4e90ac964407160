//! Adaptor error type.
//!
//! Two failure families only. Configuration problems stop a call before
//! the engine is touched; engine failures pass through untouched.

use thiserror::Error;

pub use engine_contract::error::{ConfigurationError, EngineError, ObserverError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdaptorError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl AdaptorError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, AdaptorError::Configuration(_))
    }

    pub fn is_engine(&self) -> bool {
        matches!(self, AdaptorError::Engine(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_display_unchanged() {
        let inner = EngineError::Execution("rule blew up".to_string());
        let err = AdaptorError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert!(err.is_engine());
    }

    #[test]
    fn configuration_errors_are_prefixed() {
        let err = AdaptorError::from(ConfigurationError::MissingKey {
            key: "loan.kiebase.name".to_string(),
        });
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing configuration key: loan.kiebase.name"
        );
    }
}
