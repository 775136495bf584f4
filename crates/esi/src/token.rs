//! Access-token plumbing for authenticated ESI calls.

use async_trait::async_trait;
use pilotwatch_core::EveId;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("no access token configured for character {0}")]
    Missing(EveId),

    #[error("token refresh failed: {0}")]
    Refresh(String),
}

/// Supplies a valid bearer token for a character.
///
/// The update engine asks for a token once per character pass and
/// hands it to every section fetch. `scopes` names the ESI scopes the
/// caller is about to use; providers backed by an SSO refresh flow
/// verify the stored grant covers them. Implementations own refresh; a
/// returned token must be good for immediate use.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(
        &self,
        character_id: EveId,
        scopes: &[&str],
    ) -> Result<String, TokenError>;
}

/// Reads static tokens from the environment.
///
/// Looks up `PILOTWATCH_TOKEN_<character_id>` first and falls back to
/// `PILOTWATCH_ACCESS_TOKEN`. Environment tokens carry whatever scopes
/// they were minted with, so the requested set is not checked here.
/// Suitable for development and single-user deployments; an
/// SSO-refreshing provider replaces this in production.
pub struct EnvTokenProvider;

#[async_trait]
impl AccessTokenProvider for EnvTokenProvider {
    async fn access_token(
        &self,
        character_id: EveId,
        _scopes: &[&str],
    ) -> Result<String, TokenError> {
        std::env::var(format!("PILOTWATCH_TOKEN_{character_id}"))
            .or_else(|_| std::env::var("PILOTWATCH_ACCESS_TOKEN"))
            .map_err(|_| TokenError::Missing(character_id))
    }
}

/// Fixed-token provider for tests.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(
        &self,
        _character_id: EveId,
        _scopes: &[&str],
    ) -> Result<String, TokenError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_token() {
        let provider = StaticTokenProvider::new("abc123");
        let token = provider
            .access_token(95_000_001, &["esi-assets.read_assets.v1"])
            .await
            .unwrap();
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn env_provider_reports_missing_token() {
        // Uses a character id no other test sets a variable for.
        let result = EnvTokenProvider.access_token(8_888_777, &[]).await;
        assert!(matches!(result, Err(TokenError::Missing(8_888_777))));
    }
}
