//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::application::rules::RuleName;
use crate::domain::DomainError;

/// Unexpected failure inside one sweep.
///
/// Expected absences (no main content root yet, unknown page) are not errors;
/// they surface as `SweepOutcome` variants instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("rule {rule} failed: {source}")]
    Rule {
        rule: RuleName,
        #[source]
        source: DomainError,
    },

    #[error("widening content column failed: {0}")]
    Layout(#[source] DomainError),
}

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("sweep failed: {0}")]
    Sweep(#[from] SweepError),

    #[error("watcher setup failed: {message}")]
    WatcherSetup { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
