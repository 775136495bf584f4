//! Error type for engine operations.

use pilotwatch_core::types::DbId;
use pilotwatch_esi::EsiError;

/// Errors surfaced while updating a character section.
///
/// The orchestrator splits these into two classes: deferrable errors
/// (the error limit or upstream outages) park the section without
/// touching its stored freshness, everything else is recorded as a
/// failure on the status row.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("ESI request failed: {0}")]
    Esi(#[from] EsiError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Core(#[from] pilotwatch_core::error::CoreError),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Character {0} is not enrolled")]
    UnknownCharacter(DbId),
}

impl UpdateError {
    /// Seconds to park the section instead of recording a failure, if
    /// this error warrants deferral.
    ///
    /// Error-limit responses carry their own retry hint. Gateway
    /// errors and transport failures mean ESI itself is struggling, so
    /// the outage retry interval applies; retrying those sooner only
    /// feeds the error budget.
    pub fn defer_for(&self, outage_retry_secs: i64) -> Option<i64> {
        match self {
            UpdateError::Esi(EsiError::ErrorLimited { retry_after }) => Some(*retry_after),
            UpdateError::Esi(err) if err.is_retryable() => Some(outage_retry_secs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_limit_defers_with_its_own_hint() {
        let err = UpdateError::Esi(EsiError::ErrorLimited { retry_after: 42 });
        assert_eq!(err.defer_for(1800), Some(42));
    }

    #[test]
    fn gateway_errors_defer_with_outage_interval() {
        let err = UpdateError::Esi(EsiError::ServerError {
            status: 503,
            body: String::new(),
        });
        assert_eq!(err.defer_for(1800), Some(1800));
    }

    #[test]
    fn permanent_errors_are_not_deferred() {
        assert_eq!(UpdateError::Esi(EsiError::Forbidden).defer_for(1800), None);
        assert_eq!(UpdateError::Esi(EsiError::NotFound).defer_for(1800), None);
        assert_eq!(
            UpdateError::Esi(EsiError::ServerError {
                status: 500,
                body: String::new(),
            })
            .defer_for(1800),
            None
        );
        assert_eq!(UpdateError::UnknownCharacter(7).defer_for(1800), None);
    }
}
