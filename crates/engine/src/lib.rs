//! The update engine: decides which character sections are due,
//! fetches them from ESI and reconciles the database copy.
//!
//! [`orchestrator::CharacterUpdater`] runs all due sections for one
//! character; [`scheduler::UpdateScheduler`] polls the enrolled roster
//! and drives updaters concurrently. The `sections` module holds one
//! submodule per audit section with the fetch-and-store logic plus the
//! pure ESI-to-row mappers.

pub mod config;
pub mod error;
pub mod locations;
pub mod orchestrator;
pub mod prices;
pub mod resolver;
pub mod scheduler;
pub mod sections;

pub use config::EngineConfig;
pub use error::UpdateError;
pub use orchestrator::{CharacterUpdater, SectionOutcome};
pub use scheduler::UpdateScheduler;
