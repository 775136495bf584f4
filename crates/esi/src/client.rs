//! HTTP client for the ESI REST endpoints.
//!
//! Wraps [`reqwest`] with typed endpoint calls. Every request first
//! consults the shared [`ErrorLimiter`]; every response feeds its
//! error-limit headers back before the status is inspected, so even
//! failed calls keep the shared budget current. Transient failures are
//! retried with bounded backoff per the client's [`RetryPolicy`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pilotwatch_core::{EveId, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EsiError;
use crate::limiter::ErrorLimiter;
use crate::records::*;
use crate::retry::{self, RetryPolicy};

/// Public ESI root for the Tranquility cluster.
pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net/latest";

/// Bound on a single ESI call, connection setup included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wait hint handed out when a 420 response carries no usable reset
/// header.
const DEFAULT_ERROR_LIMITED_WAIT_SECS: i64 = 60;

/// HTTP client for one ESI deployment.
pub struct EsiClient {
    client: reqwest::Client,
    base_url: String,
    limiter: Arc<ErrorLimiter>,
    retry: RetryPolicy,
}

impl EsiClient {
    /// Create a client with its own connection pool.
    ///
    /// ESI etiquette requires an identifying user agent with contact
    /// information, so construction can fail if the builder rejects it.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        limiter: Arc<ErrorLimiter>,
    ) -> Result<Self, EsiError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url, limiter))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        limiter: Arc<ErrorLimiter>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy applied to transient failures.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    // ── Character ───────────────────────────────────────────────────────────

    /// Public character sheet (name, affiliation, biography).
    pub async fn character(&self, character_id: EveId) -> Result<EsiCharacter, EsiError> {
        self.get_public(&format!("/characters/{character_id}/"))
            .await
    }

    /// Full employment history, newest first.
    pub async fn corporation_history(
        &self,
        character_id: EveId,
    ) -> Result<Vec<EsiCorporationHistoryEntry>, EsiError> {
        self.get_public(&format!("/characters/{character_id}/corporationhistory/"))
            .await
    }

    // ── Assets ──────────────────────────────────────────────────────────────

    /// Every asset the character owns, across all pages.
    pub async fn assets(&self, character_id: EveId, token: &str) -> Result<Vec<EsiAsset>, EsiError> {
        self.get_paged(&format!("/characters/{character_id}/assets/"), token)
            .await
    }

    /// Player-assigned names for the given items. ESI accepts at most
    /// 1000 ids per call; the caller chunks.
    pub async fn asset_names(
        &self,
        character_id: EveId,
        token: &str,
        item_ids: &[EveId],
    ) -> Result<Vec<EsiAssetName>, EsiError> {
        self.post_authed(
            &format!("/characters/{character_id}/assets/names/"),
            token,
            item_ids,
        )
        .await
    }

    // ── Contacts ────────────────────────────────────────────────────────────

    pub async fn contacts(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiContact>, EsiError> {
        self.get_paged(&format!("/characters/{character_id}/contacts/"), token)
            .await
    }

    pub async fn contact_labels(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiContactLabel>, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/contacts/labels/"), token)
            .await
    }

    // ── Contracts ───────────────────────────────────────────────────────────

    pub async fn contracts(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiContract>, EsiError> {
        self.get_paged(&format!("/characters/{character_id}/contracts/"), token)
            .await
    }

    pub async fn contract_items(
        &self,
        character_id: EveId,
        contract_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiContractItem>, EsiError> {
        self.get_authed(
            &format!("/characters/{character_id}/contracts/{contract_id}/items/"),
            token,
        )
        .await
    }

    pub async fn contract_bids(
        &self,
        character_id: EveId,
        contract_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiContractBid>, EsiError> {
        self.get_authed(
            &format!("/characters/{character_id}/contracts/{contract_id}/bids/"),
            token,
        )
        .await
    }

    // ── Clones and implants ─────────────────────────────────────────────────

    pub async fn clones(&self, character_id: EveId, token: &str) -> Result<EsiClones, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/clones/"), token)
            .await
    }

    /// Implant type ids plugged into the active clone.
    pub async fn implants(&self, character_id: EveId, token: &str) -> Result<Vec<EveId>, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/implants/"), token)
            .await
    }

    // ── Presence ────────────────────────────────────────────────────────────

    pub async fn location(&self, character_id: EveId, token: &str) -> Result<EsiLocation, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/location/"), token)
            .await
    }

    pub async fn online(&self, character_id: EveId, token: &str) -> Result<EsiOnline, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/online/"), token)
            .await
    }

    // ── Loyalty ─────────────────────────────────────────────────────────────

    pub async fn loyalty_points(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiLoyaltyEntry>, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/loyalty/points/"), token)
            .await
    }

    // ── Mail ────────────────────────────────────────────────────────────────

    pub async fn mail_labels(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<EsiMailLabels, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/mail/labels/"), token)
            .await
    }

    pub async fn mailing_lists(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiMailingList>, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/mail/lists/"), token)
            .await
    }

    /// One page of up to 50 mail headers, newest first. Passing
    /// `last_mail_id` returns headers strictly older than that mail;
    /// the caller walks backwards until satisfied.
    pub async fn mail_headers(
        &self,
        character_id: EveId,
        token: &str,
        last_mail_id: Option<EveId>,
    ) -> Result<Vec<EsiMailHeader>, EsiError> {
        let path = format!("/characters/{character_id}/mail/");
        let response = self
            .fetch(&path, || {
                let mut request = self.get(&path).bearer_auth(token);
                if let Some(last_mail_id) = last_mail_id {
                    request = request.query(&[("last_mail_id", last_mail_id)]);
                }
                request
            })
            .await?;
        Ok(response.json().await?)
    }

    pub async fn mail_body(
        &self,
        character_id: EveId,
        mail_id: EveId,
        token: &str,
    ) -> Result<EsiMailBody, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/mail/{mail_id}/"), token)
            .await
    }

    // ── Skills ──────────────────────────────────────────────────────────────

    pub async fn skills(&self, character_id: EveId, token: &str) -> Result<EsiSkills, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/skills/"), token)
            .await
    }

    pub async fn skill_queue(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiSkillQueueEntry>, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/skillqueue/"), token)
            .await
    }

    // ── Wallet ──────────────────────────────────────────────────────────────

    /// Current wallet balance in ISK. The endpoint returns a bare JSON
    /// number.
    pub async fn wallet_balance(&self, character_id: EveId, token: &str) -> Result<f64, EsiError> {
        self.get_authed(&format!("/characters/{character_id}/wallet/"), token)
            .await
    }

    pub async fn wallet_journal(
        &self,
        character_id: EveId,
        token: &str,
    ) -> Result<Vec<EsiWalletJournalEntry>, EsiError> {
        self.get_paged(&format!("/characters/{character_id}/wallet/journal/"), token)
            .await
    }

    // ── Universe ────────────────────────────────────────────────────────────

    /// Resolve ids to names and categories. ESI accepts at most 1000
    /// ids per call and 404s the whole batch if any id is unknown; the
    /// caller chunks and bisects.
    pub async fn universe_names(&self, ids: &[EveId]) -> Result<Vec<EsiName>, EsiError> {
        self.post_public("/universe/names/", ids).await
    }

    pub async fn station(&self, station_id: EveId) -> Result<EsiStation, EsiError> {
        self.get_public(&format!("/universe/stations/{station_id}/"))
            .await
    }

    pub async fn solar_system(&self, system_id: EveId) -> Result<EsiSolarSystem, EsiError> {
        self.get_public(&format!("/universe/systems/{system_id}/"))
            .await
    }

    /// Player structures need a token, and 403 if the character has no
    /// docking access.
    pub async fn structure(
        &self,
        structure_id: EveId,
        token: &str,
    ) -> Result<EsiStructure, EsiError> {
        self.get_authed(&format!("/universe/structures/{structure_id}/"), token)
            .await
    }

    /// Market-wide adjusted and average prices for all item types.
    pub async fn market_prices(&self) -> Result<Vec<EsiMarketPrice>, EsiError> {
        self.get_public("/markets/prices/").await
    }

    // ---- private helpers ----

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    /// Run one request through the shared error budget: refuse to send
    /// while the budget is exhausted, and feed the response headers
    /// back regardless of status.
    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, EsiError> {
        if let Some(retry_after) = self.limiter.check(Utc::now()).await {
            return Err(EsiError::ErrorLimited { retry_after });
        }
        let response = request.send().await?;
        if let Some((remain, reset)) = parse_error_limit_headers(response.headers()) {
            let observed_at = response_time(response.headers());
            self.limiter.record(remain, reset, observed_at).await;
        }
        Ok(response)
    }

    /// Dispatch one logical request with bounded retries on transient
    /// failures. The builder closure produces a fresh request for each
    /// attempt, since a [`reqwest::RequestBuilder`] is consumed on send.
    async fn fetch<F>(&self, operation: &str, build: F) -> Result<reqwest::Response, EsiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        retry::with_retries(&self.retry, operation, || {
            let request = build();
            async move {
                let response = self.dispatch(request).await?;
                Self::ensure_success(response).await
            }
        })
        .await
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, EsiError> {
        let response = self.fetch(path, || self.get(path)).await?;
        Ok(response.json().await?)
    }

    async fn get_authed<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, EsiError> {
        let response = self
            .fetch(path, || self.get(path).bearer_auth(token))
            .await?;
        Ok(response.json().await?)
    }

    /// Fetch every page of a paginated endpoint. ESI reports the total
    /// page count in `X-Pages` on each response.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<Vec<T>, EsiError> {
        let response = self
            .fetch(path, || {
                self.get(path).bearer_auth(token).query(&[("page", 1u32)])
            })
            .await?;
        let pages = page_count(response.headers());
        let mut items: Vec<T> = response.json().await?;

        for page in 2..=pages {
            let response = self
                .fetch(path, || {
                    self.get(path).bearer_auth(token).query(&[("page", page)])
                })
                .await?;
            items.extend(response.json::<Vec<T>>().await?);
        }
        Ok(items)
    }

    async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T, EsiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .fetch(path, || {
                self.client
                    .post(format!("{}{}", self.base_url, path))
                    .json(body)
            })
            .await?;
        Ok(response.json().await?)
    }

    async fn post_authed<B, T>(&self, path: &str, token: &str, body: &B) -> Result<T, EsiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .fetch(path, || {
                self.client
                    .post(format!("{}{}", self.base_url, path))
                    .bearer_auth(token)
                    .json(body)
            })
            .await?;
        Ok(response.json().await?)
    }

    /// Map a non-2xx response to the matching [`EsiError`] variant,
    /// preserving the body text for diagnostics. Returns the response
    /// unchanged on success.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EsiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_hint = parse_error_limit_headers(response.headers()).map(|(_, reset)| reset);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(status_error(status.as_u16(), retry_hint, body))
    }
}

/// Extract `X-Esi-Error-Limit-Remain` and `X-Esi-Error-Limit-Reset`.
/// Absent or malformed headers yield `None` and never fail the call.
fn parse_error_limit_headers(headers: &reqwest::header::HeaderMap) -> Option<(i32, i64)> {
    let remain = headers
        .get("x-esi-error-limit-remain")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let reset = headers
        .get("x-esi-error-limit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    Some((remain, reset))
}

/// Observation time for error-limit bookkeeping: the server's `Date`
/// header when present, the local clock otherwise. The reset countdown
/// is relative to the server's clock, not ours.
fn response_time(headers: &reqwest::header::HeaderMap) -> Timestamp {
    headers
        .get(reqwest::header::DATE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| chrono::DateTime::parse_from_rfc2822(v).ok())
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Total page count from `X-Pages`, defaulting to a single page when
/// the header is absent or unreadable.
fn page_count(headers: &reqwest::header::HeaderMap) -> u32 {
    headers
        .get("x-pages")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1)
}

fn status_error(status: u16, retry_hint: Option<i64>, body: String) -> EsiError {
    match status {
        401 => EsiError::Unauthorized,
        403 => EsiError::Forbidden,
        404 => EsiError::NotFound,
        420 => EsiError::ErrorLimited {
            retry_after: retry_hint.unwrap_or(DEFAULT_ERROR_LIMITED_WAIT_SECS),
        },
        500..=599 => EsiError::ServerError { status, body },
        _ => EsiError::ApiError { status, body },
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn auth_statuses_map_to_dedicated_variants() {
        assert_matches!(status_error(401, None, String::new()), EsiError::Unauthorized);
        assert_matches!(status_error(403, None, String::new()), EsiError::Forbidden);
        assert_matches!(status_error(404, None, String::new()), EsiError::NotFound);
    }

    #[test]
    fn error_limited_uses_reset_header_hint() {
        assert_matches!(
            status_error(420, Some(42), String::new()),
            EsiError::ErrorLimited { retry_after: 42 }
        );
    }

    #[test]
    fn error_limited_defaults_without_hint() {
        assert_matches!(
            status_error(420, None, String::new()),
            EsiError::ErrorLimited { retry_after: 60 }
        );
    }

    #[test]
    fn server_errors_keep_status_and_body() {
        let err = status_error(503, None, "downtime".to_string());
        assert_matches!(err, EsiError::ServerError { status: 503, body } if body == "downtime");
    }

    #[test]
    fn other_statuses_become_api_errors() {
        assert_matches!(
            status_error(400, None, String::new()),
            EsiError::ApiError { status: 400, .. }
        );
    }

    #[test]
    fn error_limit_headers_parse_when_present() {
        let map = headers(&[
            ("x-esi-error-limit-remain", "87"),
            ("x-esi-error-limit-reset", "42"),
        ]);
        assert_eq!(parse_error_limit_headers(&map), Some((87, 42)));
    }

    #[test]
    fn malformed_error_limit_headers_are_ignored() {
        let map = headers(&[
            ("x-esi-error-limit-remain", "lots"),
            ("x-esi-error-limit-reset", "42"),
        ]);
        assert_eq!(parse_error_limit_headers(&map), None);

        let map = headers(&[("x-esi-error-limit-remain", "87")]);
        assert_eq!(parse_error_limit_headers(&map), None);
    }

    #[test]
    fn response_time_prefers_the_date_header() {
        let map = headers(&[("date", "Tue, 01 Jul 2025 10:30:00 GMT")]);
        let expected = chrono::DateTime::parse_from_rfc2822("Tue, 01 Jul 2025 10:30:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(response_time(&map), expected);
    }

    #[test]
    fn response_time_falls_back_to_the_local_clock() {
        let observed = response_time(&HeaderMap::new());
        assert!((Utc::now() - observed).num_seconds().abs() < 5);
    }

    #[test]
    fn page_count_defaults_to_one() {
        assert_eq!(page_count(&HeaderMap::new()), 1);
        assert_eq!(page_count(&headers(&[("x-pages", "garbage")])), 1);
        assert_eq!(page_count(&headers(&[("x-pages", "7")])), 7);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let limiter = Arc::new(ErrorLimiter::new(
            Arc::new(crate::limiter::MemoryCache::new()),
            25,
            5,
        ));
        let client = EsiClient::with_client(
            reqwest::Client::new(),
            "https://esi.evetech.net/latest/",
            limiter,
        );
        assert_eq!(client.base_url, "https://esi.evetech.net/latest");
    }
}
