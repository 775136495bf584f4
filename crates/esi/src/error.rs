//! Error types for ESI calls.

/// Errors returned by [`crate::EsiClient`].
///
/// Token and permission problems get their own variants because the
/// update engine treats them differently from transient upstream
/// failures: a `Forbidden` section is recorded as failed and skipped,
/// while a `ServerError` is retried and an `ErrorLimited` response
/// defers the whole character.
#[derive(Debug, thiserror::Error)]
pub enum EsiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Access token rejected")]
    Unauthorized,

    #[error("Access denied (missing scope or blocked entity)")]
    Forbidden,

    #[error("Resource not found")]
    NotFound,

    #[error("Error limited, retry in {retry_after}s")]
    ErrorLimited { retry_after: i64 },

    #[error("Upstream server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Unexpected API response ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("No access token: {0}")]
    Token(#[from] crate::token::TokenError),
}

impl EsiError {
    /// Whether a bounded retry with backoff is worth attempting.
    ///
    /// Gateway-flavored 5xx statuses and transport-level timeouts or
    /// connect failures qualify; auth errors, 404s and the error limit
    /// never resolve by retrying the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            EsiError::ServerError {
                status: 502 | 503 | 504,
                ..
            } => true,
            EsiError::Request(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Seconds to wait before the next attempt, when the server told us.
    pub fn retry_after(&self) -> Option<i64> {
        match self {
            EsiError::ErrorLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_are_retryable() {
        for status in [502, 503, 504] {
            let err = EsiError::ServerError {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "{status} should be retryable");
        }
    }

    #[test]
    fn other_errors_are_not_retryable() {
        let fixed: Vec<EsiError> = vec![
            EsiError::Unauthorized,
            EsiError::Forbidden,
            EsiError::NotFound,
            EsiError::ErrorLimited { retry_after: 42 },
            EsiError::ServerError {
                status: 500,
                body: String::new(),
            },
            EsiError::ApiError {
                status: 400,
                body: String::new(),
            },
        ];
        for err in fixed {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn retry_after_only_set_for_error_limit() {
        assert_eq!(
            EsiError::ErrorLimited { retry_after: 17 }.retry_after(),
            Some(17)
        );
        assert_eq!(EsiError::NotFound.retry_after(), None);
    }
}
