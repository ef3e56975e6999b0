//! Simulation errors

use thiserror::Error;

/// Simulation result type
pub type SimResult<T> = std::result::Result<T, SimError>;

/// Simulation errors
#[derive(Debug, Error)]
pub enum SimError {
    #[error("grid size must be positive, got {0}")]
    InvalidGridSize(usize),

    #[error("driving frequency must be <= 1 (or negative for slow driving), got {0}")]
    InvalidFrequency(f64),

    #[error("fill bias must lie in [0, 1], got {0}")]
    InvalidFillBias(f64),

    #[error("unknown boundary policy: {0}")]
    InvalidBoundary(String),

    #[error("invalid grain map: {0}")]
    InvalidMap(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("unsupported dynamics: {0}")]
    UnsupportedDynamics(String),

    #[error("simulation {0} has already run")]
    AlreadyRun(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// True for the errors raised while validating a run configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimError::InvalidGridSize(_)
                | SimError::InvalidFrequency(_)
                | SimError::InvalidFillBias(_)
                | SimError::InvalidBoundary(_)
                | SimError::InvalidMap(_)
                | SimError::InvalidSetting(_)
        )
    }
}
