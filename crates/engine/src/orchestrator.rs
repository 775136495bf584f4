//! Character update orchestration.
//!
//! [`CharacterUpdater`] drives one pass over a character: decide which
//! sections are due, dispatch them in [`Section::ALL`] order and record
//! every attempt on the status table. A section failure is recorded and
//! the pass moves on; a provider-wide condition (the shared error limit,
//! an ESI outage) defers the section without touching its stored
//! freshness and abandons the rest of the pass, since the remaining
//! sections would only hit the same wall.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use pilotwatch_core::freshness::{is_section_stale, SectionStatusSnapshot};
use pilotwatch_core::section::Section;
use pilotwatch_core::types::DbId;
use pilotwatch_db::models::character::Character;
use pilotwatch_db::repositories::character_repo::CharacterRepo;
use pilotwatch_db::repositories::update_status_repo::UpdateStatusRepo;
use pilotwatch_esi::token::AccessTokenProvider;
use pilotwatch_esi::EsiClient;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::UpdateError;
use crate::sections::{self, UpdateContext};

/// What happened to one section during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// Fetched and reconciled; the status row records a success.
    Completed,
    /// Nothing ran: the section was still fresh or already running in
    /// another pass.
    Skipped,
    /// A provider-wide condition stopped the update. The status row is
    /// left alone, so the section stays due and a later poll retries it
    /// once the limiter or the outage interval allows.
    Deferred { retry_after: i64 },
    /// The update failed; the error is recorded on the status row and
    /// the section reads as stale until an attempt succeeds.
    Failed,
}

/// Tally of one character pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct PassSummary {
    completed: usize,
    skipped: usize,
    failed: usize,
    deferred: bool,
}

impl PassSummary {
    fn absorb(&mut self, outcome: &SectionOutcome) {
        match outcome {
            SectionOutcome::Completed => self.completed += 1,
            SectionOutcome::Skipped => self.skipped += 1,
            SectionOutcome::Failed => self.failed += 1,
            SectionOutcome::Deferred { .. } => self.deferred = true,
        }
    }

    /// Whether any section actually ran, successfully or not.
    fn dispatched(&self) -> bool {
        self.completed + self.failed > 0
    }
}

/// Runs section updates for enrolled characters.
pub struct CharacterUpdater {
    pool: PgPool,
    esi: EsiClient,
    tokens: Arc<dyn AccessTokenProvider>,
    config: EngineConfig,
    /// (character, section) pairs currently running. A dispatch for a
    /// pair that is already in here is dropped.
    inflight: Mutex<HashSet<(DbId, Section)>>,
}

impl CharacterUpdater {
    pub fn new(
        pool: PgPool,
        esi: EsiClient,
        tokens: Arc<dyn AccessTokenProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            pool,
            esi,
            tokens,
            config,
            inflight: Mutex::new(HashSet::new()),
        }
    }

    /// Run every due section for one character. Returns `true` when at
    /// least one section was dispatched.
    pub async fn update_character(
        &self,
        character_id: DbId,
        force: bool,
    ) -> Result<bool, UpdateError> {
        let character = CharacterRepo::find_by_id(&self.pool, character_id)
            .await?
            .ok_or(UpdateError::UnknownCharacter(character_id))?;

        let statuses: HashMap<String, SectionStatusSnapshot> =
            UpdateStatusRepo::list_for_character(&self.pool, character.id)
                .await?
                .into_iter()
                .map(|row| {
                    let snapshot = row.snapshot();
                    (row.section, snapshot)
                })
                .collect();

        let token = self.resolve_token(&character, &Section::all_scopes()).await;
        let run_id = Uuid::new_v4();
        let now = Utc::now();

        let mut summary = PassSummary::default();
        for section in Section::ALL {
            let due = is_section_stale(
                statuses.get(section.tag()),
                self.config.stale_after(section),
                now,
                force,
            );
            if !due {
                continue;
            }
            let outcome = self
                .run_section(&character, section, token.as_deref(), run_id)
                .await?;
            summary.absorb(&outcome);
            if let SectionOutcome::Deferred { retry_after } = outcome {
                tracing::warn!(
                    character_id = character.character_id,
                    section = %section,
                    retry_after,
                    "Abandoning remaining sections of this pass"
                );
                break;
            }
        }

        if summary.dispatched() {
            let all_ok = UpdateStatusRepo::all_sections_ok(&self.pool, character.id).await?;
            tracing::info!(
                character_id = character.character_id,
                character_name = %character.character_name,
                completed = summary.completed,
                failed = summary.failed,
                all_ok,
                "Character pass finished"
            );
        } else {
            tracing::debug!(
                character_id = character.character_id,
                "No sections due for this character"
            );
        }
        Ok(summary.dispatched())
    }

    /// Refresh a single section, honoring its freshness unless forced.
    pub async fn update_section(
        &self,
        character_id: DbId,
        section: Section,
        force: bool,
    ) -> Result<SectionOutcome, UpdateError> {
        let character = CharacterRepo::find_by_id(&self.pool, character_id)
            .await?
            .ok_or(UpdateError::UnknownCharacter(character_id))?;

        let status = UpdateStatusRepo::find(&self.pool, character.id, section)
            .await?
            .map(|row| row.snapshot());
        let due = is_section_stale(
            status.as_ref(),
            self.config.stale_after(section),
            Utc::now(),
            force,
        );
        if !due {
            tracing::debug!(
                character_id = character.character_id,
                section = %section,
                "Section still fresh"
            );
            return Ok(SectionOutcome::Skipped);
        }

        let token = self
            .resolve_token(&character, section.required_scopes())
            .await;
        self.run_section(&character, section, token.as_deref(), Uuid::new_v4())
            .await
    }

    /// Whether every section this character has ever attempted currently
    /// reports success.
    pub async fn is_update_ok(&self, character_id: DbId) -> Result<bool, UpdateError> {
        Ok(UpdateStatusRepo::all_sections_ok(&self.pool, character_id).await?)
    }

    // ---- private helpers ----

    /// One access token per pass. A token failure is not fatal: public
    /// sections still run, authenticated ones record a token error.
    async fn resolve_token(&self, character: &Character, scopes: &[&str]) -> Option<String> {
        match self.tokens.access_token(character.character_id, scopes).await {
            Ok(token) => Some(token),
            Err(err) => {
                tracing::warn!(
                    character_id = character.character_id,
                    error = %err,
                    "No access token, only public sections can run"
                );
                None
            }
        }
    }

    /// Dispatch one due section under the in-flight guard.
    async fn run_section(
        &self,
        character: &Character,
        section: Section,
        token: Option<&str>,
        run_id: Uuid,
    ) -> Result<SectionOutcome, UpdateError> {
        {
            let mut inflight = self.inflight.lock().await;
            if !inflight.insert((character.id, section)) {
                tracing::debug!(
                    character_id = character.character_id,
                    section = %section,
                    "Dropping dispatch, section update already running"
                );
                return Ok(SectionOutcome::Skipped);
            }
        }
        let result = self.run_guarded(character, section, token, run_id).await;
        self.inflight.lock().await.remove(&(character.id, section));
        result
    }

    async fn run_guarded(
        &self,
        character: &Character,
        section: Section,
        token: Option<&str>,
        run_id: Uuid,
    ) -> Result<SectionOutcome, UpdateError> {
        UpdateStatusRepo::record_started(&self.pool, character.id, section, run_id, Utc::now())
            .await?;
        tracing::debug!(
            character_id = character.character_id,
            section = %section,
            "Updating section"
        );

        let ctx = UpdateContext {
            pool: &self.pool,
            esi: &self.esi,
            config: &self.config,
            character,
            token,
        };
        match sections::run(&ctx, section).await {
            Ok(()) => {
                UpdateStatusRepo::record_success(
                    &self.pool,
                    character.id,
                    section,
                    run_id,
                    Utc::now(),
                )
                .await?;
                Ok(SectionOutcome::Completed)
            }
            Err(err) => match err.defer_for(self.config.outage_retry_secs) {
                Some(retry_after) => {
                    tracing::warn!(
                        character_id = character.character_id,
                        section = %section,
                        error = %err,
                        retry_after,
                        "Section deferred"
                    );
                    Ok(SectionOutcome::Deferred { retry_after })
                }
                None => {
                    tracing::error!(
                        character_id = character.character_id,
                        section = %section,
                        error = %err,
                        "Section update failed"
                    );
                    UpdateStatusRepo::record_failure(
                        &self.pool,
                        character.id,
                        section,
                        run_id,
                        Utc::now(),
                        &err.to_string(),
                    )
                    .await?;
                    Ok(SectionOutcome::Failed)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_outcome_class() {
        let mut summary = PassSummary::default();
        summary.absorb(&SectionOutcome::Completed);
        summary.absorb(&SectionOutcome::Skipped);
        summary.absorb(&SectionOutcome::Failed);
        summary.absorb(&SectionOutcome::Completed);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.deferred);
        assert!(summary.dispatched());
    }

    #[test]
    fn skips_alone_do_not_count_as_a_dispatch() {
        let mut summary = PassSummary::default();
        summary.absorb(&SectionOutcome::Skipped);
        summary.absorb(&SectionOutcome::Skipped);
        assert!(!summary.dispatched());
    }

    #[test]
    fn a_failed_section_still_counts_as_dispatched() {
        let mut summary = PassSummary::default();
        summary.absorb(&SectionOutcome::Failed);
        assert!(summary.dispatched());
    }

    #[test]
    fn deferral_marks_the_pass_without_counting_a_dispatch() {
        let mut summary = PassSummary::default();
        summary.absorb(&SectionOutcome::Deferred { retry_after: 60 });
        assert!(summary.deferred);
        assert!(!summary.dispatched());
    }
}
