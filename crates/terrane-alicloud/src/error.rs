//! Alibaba Cloud provider error types

use terrane_provider::{IdentityError, RetryError};
use thiserror::Error;

/// Error code the KVStore API returns when the instance itself is gone.
const INSTANCE_NOT_FOUND_CODE: &str = "InvalidInstanceId.NotFound";

/// Error codes worth retrying as-is after a backoff delay.
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "Throttling.User",
    "Throttling.Api",
    "ServiceUnavailable",
    "SystemBusy",
];

#[derive(Error, Debug)]
pub enum AlicloudError {
    #[error("API error {code}: {message} (request id: {request_id})")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} with non-API body: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    MalformedIdentity(#[from] IdentityError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Security IP group {group} not visible on instance {instance} after write")]
    GroupNotVisible { instance: String, group: String },

    #[error("Retry budget exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<AlicloudError>,
    },
}

impl AlicloudError {
    /// Whether this error means the parent instance no longer exists.
    ///
    /// Absence of the instance is logical deletion for everything scoped
    /// under it, never a hard failure.
    pub fn is_instance_not_found(&self) -> bool {
        match self {
            AlicloudError::Api { code, .. } => code == INSTANCE_NOT_FOUND_CODE,
            _ => false,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AlicloudError::Api { code, .. } => THROTTLING_CODES.contains(&code.as_str()),
            AlicloudError::Http(err) => err.is_timeout() || err.is_connect(),
            AlicloudError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<RetryError<AlicloudError>> for AlicloudError {
    fn from(err: RetryError<AlicloudError>) -> Self {
        match err {
            RetryError::Fatal(source) => source,
            RetryError::Exhausted {
                attempts, source, ..
            } => AlicloudError::RetryExhausted {
                attempts,
                source: Box::new(source),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AlicloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: &str) -> AlicloudError {
        AlicloudError::Api {
            code: code.to_string(),
            message: "test".to_string(),
            request_id: "ABCD-1234".to_string(),
        }
    }

    #[test]
    fn test_instance_not_found_detection() {
        assert!(api_error("InvalidInstanceId.NotFound").is_instance_not_found());
        assert!(!api_error("InvalidParameter").is_instance_not_found());
        assert!(!AlicloudError::InvalidConfig("x".to_string()).is_instance_not_found());
    }

    #[test]
    fn test_throttling_is_retryable() {
        assert!(api_error("Throttling.User").is_retryable());
        assert!(api_error("SystemBusy").is_retryable());
        assert!(!api_error("InvalidParameter").is_retryable());
        assert!(!api_error("InvalidInstanceId.NotFound").is_retryable());
    }

    #[test]
    fn test_status_classification() {
        let gateway = AlicloudError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(gateway.is_retryable());

        let too_many = AlicloudError::Status {
            status: 429,
            body: String::new(),
        };
        assert!(too_many.is_retryable());

        let forbidden = AlicloudError::Status {
            status: 403,
            body: String::new(),
        };
        assert!(!forbidden.is_retryable());
    }

    #[test]
    fn test_retry_error_conversion() {
        let fatal: AlicloudError = RetryError::Fatal(api_error("InvalidParameter")).into();
        assert!(matches!(fatal, AlicloudError::Api { .. }));

        let exhausted: AlicloudError = RetryError::Exhausted {
            ceiling: std::time::Duration::from_secs(300),
            attempts: 7,
            source: api_error("Throttling"),
        }
        .into();
        match exhausted {
            AlicloudError::RetryExhausted { attempts, .. } => assert_eq!(attempts, 7),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
