//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Plain `New*` structs the sync engine builds from remote data for
//!   inserts and upserts

pub mod asset;
pub mod cache;
pub mod character;
pub mod clones;
pub mod contact;
pub mod contract;
pub mod details;
pub mod loyalty;
pub mod mail;
pub mod presence;
pub mod skill;
pub mod skill_set;
pub mod status;
pub mod universe;
pub mod wallet;
