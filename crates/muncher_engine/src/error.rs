use muncher_core::InvariantViolation;
use thiserror::Error;

use crate::config::ConfigError;
use crate::persist::PersistError;

/// Failures that abort a conversion run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
