//! The fixed set of character data sections and their refresh cadence.
//!
//! Each section is an independently scheduled slice of a character's
//! audit data. The engine dispatches update work by matching on the
//! variant (a fixed table, no reflection), and the repository layer
//! stores the string [`tag`](Section::tag) in `character_update_status`.

use chrono::Duration;

use crate::error::CoreError;

/// One independently refreshed category of character data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Assets,
    Contacts,
    Contracts,
    CorporationHistory,
    Details,
    Implants,
    JumpClones,
    Location,
    Loyalty,
    Mails,
    OnlineStatus,
    Skills,
    SkillQueue,
    SkillSets,
    WalletBalance,
    WalletJournal,
}

impl Section {
    /// Every section, in a stable order.
    pub const ALL: [Section; 16] = [
        Section::Assets,
        Section::Contacts,
        Section::Contracts,
        Section::CorporationHistory,
        Section::Details,
        Section::Implants,
        Section::JumpClones,
        Section::Location,
        Section::Loyalty,
        Section::Mails,
        Section::OnlineStatus,
        Section::Skills,
        Section::SkillQueue,
        Section::SkillSets,
        Section::WalletBalance,
        Section::WalletJournal,
    ];

    /// Stable snake_case tag stored in `character_update_status.section`.
    pub fn tag(self) -> &'static str {
        match self {
            Section::Assets => "assets",
            Section::Contacts => "contacts",
            Section::Contracts => "contracts",
            Section::CorporationHistory => "corporation_history",
            Section::Details => "details",
            Section::Implants => "implants",
            Section::JumpClones => "jump_clones",
            Section::Location => "location",
            Section::Loyalty => "loyalty",
            Section::Mails => "mails",
            Section::OnlineStatus => "online_status",
            Section::Skills => "skills",
            Section::SkillQueue => "skill_queue",
            Section::SkillSets => "skill_sets",
            Section::WalletBalance => "wallet_balance",
            Section::WalletJournal => "wallet_journal",
        }
    }

    /// Human-readable name for logs and status displays.
    pub fn display_name(self) -> &'static str {
        match self {
            Section::Assets => "Assets",
            Section::Contacts => "Contacts",
            Section::Contracts => "Contracts",
            Section::CorporationHistory => "Corporation History",
            Section::Details => "Details",
            Section::Implants => "Implants",
            Section::JumpClones => "Jump Clones",
            Section::Location => "Location",
            Section::Loyalty => "Loyalty",
            Section::Mails => "Mails",
            Section::OnlineStatus => "Online Status",
            Section::Skills => "Skills",
            Section::SkillQueue => "Skill Queue",
            Section::SkillSets => "Skill Sets",
            Section::WalletBalance => "Wallet Balance",
            Section::WalletJournal => "Wallet Journal",
        }
    }

    /// Default minimum age before a successful update becomes due again.
    ///
    /// Fast-moving sections (location, online status) refresh in
    /// minutes; slow ones (corporation history) only daily. Each value
    /// can be overridden per deployment via
    /// `PILOTWATCH_STALE_MINUTES_<TAG>`.
    pub fn default_stale_after(self) -> Duration {
        Duration::minutes(self.default_stale_minutes())
    }

    fn default_stale_minutes(self) -> i64 {
        match self {
            Section::Location | Section::OnlineStatus => 5,
            Section::WalletBalance => 120,
            Section::Implants
            | Section::JumpClones
            | Section::Skills
            | Section::SkillQueue
            | Section::SkillSets
            | Section::WalletJournal => 240,
            Section::Mails => 360,
            Section::Assets
            | Section::Contacts
            | Section::Contracts
            | Section::Details
            | Section::Loyalty => 480,
            Section::CorporationHistory => 1440,
        }
    }

    /// Parse a stored tag back into a variant.
    pub fn from_tag(tag: &str) -> Result<Section, CoreError> {
        Section::ALL
            .into_iter()
            .find(|s| s.tag() == tag)
            .ok_or_else(|| CoreError::Validation(format!("Unknown section tag: \"{tag}\"")))
    }

    /// ESI OAuth scopes this section's endpoints require.
    ///
    /// Empty for sections served by public endpoints or computed from
    /// already-stored data. Location needs the structures scope on top
    /// of its own: a docked character can sit inside a player structure
    /// whose name is otherwise hidden.
    pub fn required_scopes(self) -> &'static [&'static str] {
        match self {
            Section::Assets => &["esi-assets.read_assets.v1"],
            Section::Contacts => &["esi-characters.read_contacts.v1"],
            Section::Contracts => &["esi-contracts.read_character_contracts.v1"],
            Section::CorporationHistory | Section::Details | Section::SkillSets => &[],
            Section::Implants => &["esi-clones.read_implants.v1"],
            Section::JumpClones => &["esi-clones.read_clones.v1"],
            Section::Location => {
                &["esi-location.read_location.v1", "esi-universe.read_structures.v1"]
            }
            Section::Loyalty => &["esi-characters.read_loyalty.v1"],
            Section::Mails => &["esi-mail.read_mail.v1"],
            Section::OnlineStatus => &["esi-location.read_online.v1"],
            Section::Skills => &["esi-skills.read_skills.v1"],
            Section::SkillQueue => &["esi-skills.read_skillqueue.v1"],
            Section::WalletBalance | Section::WalletJournal => {
                &["esi-wallet.read_character_wallet.v1"]
            }
        }
    }

    /// Deduplicated union of every section's scopes, for pass-level
    /// token requests that may run any section.
    pub fn all_scopes() -> Vec<&'static str> {
        let mut scopes: Vec<&'static str> = Section::ALL
            .into_iter()
            .flat_map(Section::required_scopes)
            .copied()
            .collect();
        scopes.sort_unstable();
        scopes.dedup();
        scopes
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_for_all_sections() {
        for section in Section::ALL {
            assert_eq!(Section::from_tag(section.tag()).unwrap(), section);
        }
    }

    #[test]
    fn tags_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for section in Section::ALL {
            assert!(seen.insert(section.tag()), "duplicate tag {}", section.tag());
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(Section::from_tag("medals").is_err());
        assert!(Section::from_tag("").is_err());
    }

    #[test]
    fn fast_sections_refresh_faster_than_slow_ones() {
        assert!(Section::Location.default_stale_after() < Section::Mails.default_stale_after());
        assert!(
            Section::Mails.default_stale_after()
                < Section::CorporationHistory.default_stale_after()
        );
    }

    #[test]
    fn all_thresholds_positive() {
        for section in Section::ALL {
            assert!(section.default_stale_after() > Duration::zero());
        }
    }

    #[test]
    fn display_matches_tag() {
        assert_eq!(Section::JumpClones.to_string(), "jump_clones");
    }

    #[test]
    fn public_sections_need_no_scopes() {
        assert!(Section::Details.required_scopes().is_empty());
        assert!(Section::CorporationHistory.required_scopes().is_empty());
        assert!(Section::SkillSets.required_scopes().is_empty());
    }

    #[test]
    fn wallet_sections_share_one_scope() {
        assert_eq!(
            Section::WalletBalance.required_scopes(),
            Section::WalletJournal.required_scopes()
        );
    }

    #[test]
    fn scopes_use_the_esi_prefix() {
        for section in Section::ALL {
            for scope in section.required_scopes() {
                assert!(scope.starts_with("esi-"), "bad scope {scope} on {section}");
            }
        }
    }

    #[test]
    fn scope_union_is_sorted_and_deduplicated() {
        let scopes = Section::all_scopes();
        let wallet = scopes
            .iter()
            .filter(|s| **s == "esi-wallet.read_character_wallet.v1")
            .count();
        assert_eq!(wallet, 1);
        let mut sorted = scopes.clone();
        sorted.sort_unstable();
        assert_eq!(scopes, sorted);
    }
}
