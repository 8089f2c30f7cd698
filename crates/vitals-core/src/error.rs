//! Shared error type across vitals crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, VitalsError>;

/// Unified error type used by core and agent.
#[derive(Debug, Error)]
pub enum VitalsError {
    #[error("invalid percentile: {0}")]
    InvalidPercentile(f64),
    #[error("no samples recorded")]
    NoSamples,
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("collector {name} failed: {msg}")]
    Collector { name: &'static str, msg: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl VitalsError {
    /// Stable machine-readable code, used in logs and assertions.
    pub fn code(&self) -> &'static str {
        match self {
            VitalsError::InvalidPercentile(_) => "INVALID_PERCENTILE",
            VitalsError::NoSamples => "NO_SAMPLES",
            VitalsError::BadConfig(_) => "BAD_CONFIG",
            VitalsError::Io(_) => "IO",
            VitalsError::Json(_) => "JSON",
            VitalsError::Collector { .. } => "COLLECTOR",
            VitalsError::Internal(_) => "INTERNAL",
        }
    }
}
