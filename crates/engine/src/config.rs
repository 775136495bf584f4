//! Engine configuration, read from the environment.
//!
//! Recognized variables:
//! - `PILOTWATCH_ESI_BASE_URL` (default `https://esi.evetech.net/latest`):
//!   ESI root to talk to.
//! - `PILOTWATCH_USER_AGENT` (default `pilotwatch/<version>`): user agent
//!   sent with every ESI request. Operators should include contact
//!   details per ESI etiquette.
//! - `PILOTWATCH_POLL_INTERVAL_SECS` (default `60`): scheduler poll
//!   interval.
//! - `PILOTWATCH_MAX_CONCURRENT_CHARACTERS` (default `4`): characters
//!   updated in parallel per poll.
//! - `PILOTWATCH_OUTAGE_RETRY_SECS` (default `1800`): how long to park a
//!   section when ESI looks down.
//! - `PILOTWATCH_MAX_MAILS` (default `250`): newest mail headers kept per
//!   character.
//! - `PILOTWATCH_ASSET_BATCH_SIZE` (default `500`): rows per asset
//!   insert batch.
//! - `PILOTWATCH_MARKET_REFRESH_SECS` (default `7200`): minimum age
//!   before market prices are refreshed.
//! - `PILOTWATCH_ERROR_LIMIT_THRESHOLD` (default `25`): remaining-error
//!   floor below which all fetching pauses.
//! - `PILOTWATCH_WINDOW_TOLERANCE_SECS` (default `5`): clock-skew
//!   tolerance when comparing error-limit windows.
//! - `PILOTWATCH_MAX_RETRIES` (default `3`): retry budget for transient
//!   ESI failures.
//! - `PILOTWATCH_STALE_MINUTES_<SECTION>` (e.g.
//!   `PILOTWATCH_STALE_MINUTES_WALLET_JOURNAL`): per-section staleness
//!   override in minutes, replacing the section's built-in default.

use std::collections::HashMap;
use std::time::Duration;

use pilotwatch_core::error_limit::{DEFAULT_ERROR_LIMIT_THRESHOLD, DEFAULT_WINDOW_TOLERANCE_SECS};
use pilotwatch_core::section::Section;
use pilotwatch_esi::client::DEFAULT_BASE_URL;
use pilotwatch_esi::RetryPolicy;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_MAX_CONCURRENT_CHARACTERS: usize = 4;
const DEFAULT_OUTAGE_RETRY_SECS: i64 = 1800;
const DEFAULT_MAX_MAILS: usize = 250;
const DEFAULT_ASSET_BATCH_SIZE: usize = 500;
const DEFAULT_MARKET_REFRESH_SECS: u64 = 7200;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_USER_AGENT: &str = concat!("pilotwatch/", env!("CARGO_PKG_VERSION"));

/// Tunables for the scheduler, the updaters and the ESI client.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub esi_base_url: String,
    pub user_agent: String,
    pub poll_interval: Duration,
    pub max_concurrent_characters: usize,
    /// Deferral interval applied when ESI reports an outage.
    pub outage_retry_secs: i64,
    /// Cap on mail headers kept per character, newest first.
    pub max_mails: usize,
    pub asset_batch_size: usize,
    pub market_refresh_interval: Duration,
    pub error_limit_threshold: i32,
    /// Clock-skew tolerance when comparing error-limit windows.
    pub window_tolerance_secs: i64,
    pub max_retries: u32,
    /// Per-section staleness overrides; sections not listed use their
    /// built-in default.
    pub stale_overrides: HashMap<Section, chrono::Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            esi_base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_concurrent_characters: DEFAULT_MAX_CONCURRENT_CHARACTERS,
            outage_retry_secs: DEFAULT_OUTAGE_RETRY_SECS,
            max_mails: DEFAULT_MAX_MAILS,
            asset_batch_size: DEFAULT_ASSET_BATCH_SIZE,
            market_refresh_interval: Duration::from_secs(DEFAULT_MARKET_REFRESH_SECS),
            error_limit_threshold: DEFAULT_ERROR_LIMIT_THRESHOLD,
            window_tolerance_secs: DEFAULT_WINDOW_TOLERANCE_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            stale_overrides: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from the environment, falling back to the
    /// defaults above for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut stale_overrides = HashMap::new();
        for section in Section::ALL {
            let var = format!("PILOTWATCH_STALE_MINUTES_{}", section.tag().to_uppercase());
            if let Some(minutes) = std::env::var(var).ok().and_then(|v| v.parse::<i64>().ok()) {
                stale_overrides.insert(section, chrono::Duration::minutes(minutes));
            }
        }

        Self {
            esi_base_url: std::env::var("PILOTWATCH_ESI_BASE_URL")
                .unwrap_or(defaults.esi_base_url),
            user_agent: std::env::var("PILOTWATCH_USER_AGENT").unwrap_or(defaults.user_agent),
            poll_interval: std::env::var("PILOTWATCH_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            max_concurrent_characters: std::env::var("PILOTWATCH_MAX_CONCURRENT_CHARACTERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_characters),
            outage_retry_secs: std::env::var("PILOTWATCH_OUTAGE_RETRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.outage_retry_secs),
            max_mails: std::env::var("PILOTWATCH_MAX_MAILS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_mails),
            asset_batch_size: std::env::var("PILOTWATCH_ASSET_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.asset_batch_size),
            market_refresh_interval: std::env::var("PILOTWATCH_MARKET_REFRESH_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.market_refresh_interval),
            error_limit_threshold: std::env::var("PILOTWATCH_ERROR_LIMIT_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.error_limit_threshold),
            window_tolerance_secs: std::env::var("PILOTWATCH_WINDOW_TOLERANCE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.window_tolerance_secs),
            max_retries: std::env::var("PILOTWATCH_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            stale_overrides,
        }
    }

    /// Staleness threshold for one section, honoring any override.
    pub fn stale_after(&self, section: Section) -> chrono::Duration {
        self.stale_overrides
            .get(&section)
            .copied()
            .unwrap_or_else(|| section.default_stale_after())
    }

    /// Retry policy for the ESI client, with the configured budget.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_after_uses_section_default_without_override() {
        let config = EngineConfig::default();
        assert_eq!(
            config.stale_after(Section::Assets),
            Section::Assets.default_stale_after()
        );
    }

    #[test]
    fn stale_override_takes_precedence() {
        let mut config = EngineConfig::default();
        config
            .stale_overrides
            .insert(Section::Assets, chrono::Duration::minutes(15));
        assert_eq!(
            config.stale_after(Section::Assets),
            chrono::Duration::minutes(15)
        );
        // Other sections keep their defaults.
        assert_eq!(
            config.stale_after(Section::Mails),
            Section::Mails.default_stale_after()
        );
    }

    #[test]
    fn retry_policy_carries_configured_budget() {
        let config = EngineConfig {
            max_retries: 7,
            ..EngineConfig::default()
        };
        assert_eq!(config.retry_policy().max_retries, 7);
    }

    #[test]
    fn env_overrides_are_parsed() {
        std::env::set_var("PILOTWATCH_POLL_INTERVAL_SECS", "15");
        std::env::set_var("PILOTWATCH_STALE_MINUTES_WALLET_JOURNAL", "30");

        let config = EngineConfig::from_env();
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(
            config.stale_after(Section::WalletJournal),
            chrono::Duration::minutes(30)
        );

        std::env::remove_var("PILOTWATCH_POLL_INTERVAL_SECS");
        std::env::remove_var("PILOTWATCH_STALE_MINUTES_WALLET_JOURNAL");
    }
}
