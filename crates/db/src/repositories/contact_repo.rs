//! Repository for the `character_contacts` and
//! `character_contact_labels` tables.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::contact::{
    CharacterContact, CharacterContactLabel, NewContact, NewContactLabel,
};

/// Column list for `character_contacts` queries.
const CONTACT_COLUMNS: &str = "id, character_id, contact_id, contact_type, standing, \
    is_blocked, is_watched, label_ids, created_at, updated_at";

/// Column list for `character_contact_labels` queries.
const LABEL_COLUMNS: &str = "id, character_id, label_id, name, created_at, updated_at";

/// Provides diffed writes for the contact list and its labels.
pub struct ContactRepo;

impl ContactRepo {
    // ── Labels ───────────────────────────────────────────────────────

    /// Load all stored contact labels for a character.
    pub async fn list_labels(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterContactLabel>, sqlx::Error> {
        let query = format!(
            "SELECT {LABEL_COLUMNS} FROM character_contact_labels \
             WHERE character_id = $1 ORDER BY label_id"
        );
        sqlx::query_as::<_, CharacterContactLabel>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a label diff: upsert `upserts`, delete `obsolete`.
    pub async fn apply_labels(
        pool: &PgPool,
        character_id: DbId,
        upserts: &[NewContactLabel],
        obsolete: &[EveId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for label in upserts {
            sqlx::query(
                "INSERT INTO character_contact_labels (character_id, label_id, name)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (character_id, label_id) DO UPDATE
                     SET name = EXCLUDED.name",
            )
            .bind(character_id)
            .bind(label.label_id)
            .bind(&label.name)
            .execute(&mut *tx)
            .await?;
        }
        if !obsolete.is_empty() {
            sqlx::query(
                "DELETE FROM character_contact_labels \
                 WHERE character_id = $1 AND label_id = ANY($2)",
            )
            .bind(character_id)
            .bind(obsolete)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ── Contacts ─────────────────────────────────────────────────────

    /// Load all stored contacts for a character.
    pub async fn list_contacts(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterContact>, sqlx::Error> {
        let query = format!(
            "SELECT {CONTACT_COLUMNS} FROM character_contacts \
             WHERE character_id = $1 ORDER BY contact_id"
        );
        sqlx::query_as::<_, CharacterContact>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a contact diff: upsert `upserts`, delete `obsolete`.
    pub async fn apply_contacts(
        pool: &PgPool,
        character_id: DbId,
        upserts: &[NewContact],
        obsolete: &[EveId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for contact in upserts {
            sqlx::query(
                "INSERT INTO character_contacts
                    (character_id, contact_id, contact_type, standing,
                     is_blocked, is_watched, label_ids)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (character_id, contact_id) DO UPDATE
                     SET contact_type = EXCLUDED.contact_type,
                         standing = EXCLUDED.standing,
                         is_blocked = EXCLUDED.is_blocked,
                         is_watched = EXCLUDED.is_watched,
                         label_ids = EXCLUDED.label_ids",
            )
            .bind(character_id)
            .bind(contact.contact_id)
            .bind(&contact.contact_type)
            .bind(contact.standing)
            .bind(contact.is_blocked)
            .bind(contact.is_watched)
            .bind(&contact.label_ids)
            .execute(&mut *tx)
            .await?;
        }
        if !obsolete.is_empty() {
            sqlx::query(
                "DELETE FROM character_contacts \
                 WHERE character_id = $1 AND contact_id = ANY($2)",
            )
            .bind(character_id)
            .bind(obsolete)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
