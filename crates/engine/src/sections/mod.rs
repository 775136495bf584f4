//! Per-section update implementations.
//!
//! Each submodule owns one audit section: fetch the remote copy, map it
//! onto row DTOs with a pure mapper, and reconcile the stored rows with
//! that section's merge semantics. Mappers are free functions so the
//! interesting logic stays testable without a database or network.

pub mod assets;
pub mod clones;
pub mod contacts;
pub mod contracts;
pub mod details;
pub mod loyalty;
pub mod mail;
pub mod presence;
pub mod skills;
pub mod wallet;

use pilotwatch_core::section::Section;
use pilotwatch_db::models::character::Character;
use pilotwatch_esi::token::TokenError;
use pilotwatch_esi::{EsiClient, EsiError};
use sqlx::PgPool;

use crate::config::EngineConfig;
use crate::error::UpdateError;

/// Everything a section update needs, borrowed from the orchestrator
/// for the duration of one character pass.
pub struct UpdateContext<'a> {
    pub pool: &'a PgPool,
    pub esi: &'a EsiClient,
    pub config: &'a EngineConfig,
    pub character: &'a Character,
    /// Access token for authenticated endpoints, `None` when the token
    /// provider could not produce one. Public sections still run.
    pub token: Option<&'a str>,
}

impl<'a> UpdateContext<'a> {
    /// The access token, or the error an authenticated section records
    /// when there is none.
    pub fn auth_token(&self) -> Result<&'a str, UpdateError> {
        self.token.ok_or_else(|| {
            UpdateError::Esi(EsiError::Token(TokenError::Missing(
                self.character.character_id,
            )))
        })
    }
}

/// Run one section update against the live context.
pub async fn run(ctx: &UpdateContext<'_>, section: Section) -> Result<(), UpdateError> {
    match section {
        Section::Assets => assets::update(ctx).await,
        Section::Contacts => contacts::update(ctx).await,
        Section::Contracts => contracts::update(ctx).await,
        Section::CorporationHistory => details::update_history(ctx).await,
        Section::Details => details::update_details(ctx).await,
        Section::Implants => clones::update_implants(ctx).await,
        Section::JumpClones => clones::update_jump_clones(ctx).await,
        Section::Location => presence::update_location(ctx).await,
        Section::Loyalty => loyalty::update(ctx).await,
        Section::Mails => mail::update(ctx).await,
        Section::OnlineStatus => presence::update_online_status(ctx).await,
        Section::Skills => skills::update_skills(ctx).await,
        Section::SkillQueue => skills::update_queue(ctx).await,
        Section::SkillSets => skills::update_skill_sets(ctx).await,
        Section::WalletBalance => wallet::update_balance(ctx).await,
        Section::WalletJournal => wallet::update_journal(ctx).await,
    }
}
