//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query
//! methods that accept `&PgPool` as the first argument. Writes that
//! must be atomic per section run inside a single transaction owned by
//! the repository method.

pub mod asset_repo;
pub mod cache_repo;
pub mod character_repo;
pub mod clones_repo;
pub mod contact_repo;
pub mod contract_repo;
pub mod details_repo;
pub mod entity_repo;
pub mod location_repo;
pub mod loyalty_repo;
pub mod mail_repo;
pub mod market_price_repo;
pub mod presence_repo;
pub mod skill_repo;
pub mod skill_set_repo;
pub mod update_status_repo;
pub mod wallet_repo;

pub use asset_repo::AssetRepo;
pub use cache_repo::CacheRepo;
pub use character_repo::CharacterRepo;
pub use clones_repo::ClonesRepo;
pub use contact_repo::ContactRepo;
pub use contract_repo::ContractRepo;
pub use details_repo::DetailsRepo;
pub use entity_repo::EveEntityRepo;
pub use location_repo::LocationRepo;
pub use loyalty_repo::LoyaltyRepo;
pub use mail_repo::MailRepo;
pub use market_price_repo::MarketPriceRepo;
pub use presence_repo::PresenceRepo;
pub use skill_repo::SkillRepo;
pub use skill_set_repo::SkillSetRepo;
pub use update_status_repo::UpdateStatusRepo;
pub use wallet_repo::WalletRepo;
