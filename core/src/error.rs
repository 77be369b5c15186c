use thiserror::Error;

/// Engine failure taxonomy.
///
/// Only `AuthenticationFailure` ever reaches the carrier as a non-200
/// response; every other variant is absorbed into spoken markup.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("webhook signature rejected")]
    AuthenticationFailure,
    #[error("no active flow for line {0}")]
    ConfigurationMissing(String),
    #[error("step reference `{0}` could not be resolved")]
    StateResolutionAnomaly(String),
    #[error("cannot render step `{step}`: {reason}")]
    RenderingFailure { step: String, reason: String },
    #[error("interaction sink unavailable: {0}")]
    LoggingFailure(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    /// Whether the failure is surfaced to the carrier instead of being
    /// converted into a graceful call termination.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::AuthenticationFailure)
    }
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("failed to read flow catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid flow catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode interaction: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sink closed")]
    Closed,
}

impl From<SinkError> for EngineError {
    fn from(err: SinkError) -> Self {
        EngineError::LoggingFailure(err.to_string())
    }
}
