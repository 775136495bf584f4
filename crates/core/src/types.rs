/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// EVE-side identifiers (characters, types, items, locations, entities).
///
/// ESI mixes 32- and 64-bit id spaces; everything is widened to `i64`
/// here so signatures stay uniform across sections.
pub type EveId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
