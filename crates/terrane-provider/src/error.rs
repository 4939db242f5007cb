//! Provider framework error types

use std::time::Duration;
use thiserror::Error;

/// Errors from synthesizing or parsing composite identities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("malformed identity {raw:?}: expected exactly two non-empty components separated by ':'")]
    Malformed { raw: String },

    #[error("identity {component} component must not be empty")]
    EmptyComponent { component: &'static str },

    #[error("identity {component} component {value:?} must not contain ':'")]
    SeparatorInComponent {
        component: &'static str,
        value: String,
    },
}

/// Outcome of a retried operation that did not succeed.
#[derive(Error, Debug)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The first non-retryable error aborts the loop immediately.
    #[error(transparent)]
    Fatal(E),

    /// The wall-clock budget ran out while the error stayed retryable.
    #[error("retry budget of {ceiling:?} exhausted after {attempts} attempts: {source}")]
    Exhausted {
        ceiling: Duration,
        attempts: u32,
        source: E,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The underlying operation error, whichever way the loop ended.
    pub fn into_source(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { source, .. } => source,
        }
    }
}

/// Tracked-state file errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("state file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
