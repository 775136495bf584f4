//! Pure domain logic for the character audit engine.
//!
//! This crate has zero internal dependencies so it can be used by the
//! repository layer, the ESI client, the update engine, and any future
//! CLI tooling alike. Everything here is synchronous and side-effect
//! free: tree construction, staleness decisions, error-limit window
//! arithmetic, merge planning, and skill-set compliance checks.

pub mod asset_tree;
pub mod error;
pub mod error_limit;
pub mod freshness;
pub mod merge;
pub mod section;
pub mod skill_sets;
pub mod types;

pub use types::{DbId, EveId, Timestamp};
