//! Repository for the mail tables: labels, mailing lists, headers,
//! bodies and the unread counter.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::mail::{
    CharacterMail, CharacterMailLabel, CharacterMailingList, NewMailHeader, NewMailLabel,
    NewMailingList,
};

/// Column list for `character_mail_labels` queries.
const LABEL_COLUMNS: &str =
    "id, character_id, label_id, name, color, unread_count, created_at, updated_at";

/// Column list for `character_mailing_lists` queries.
const LIST_COLUMNS: &str = "id, character_id, list_id, name, created_at, updated_at";

/// Column list for `character_mails` queries.
const MAIL_COLUMNS: &str = "id, character_id, mail_id, from_id, is_read, subject, \
    timestamp, label_ids, recipients, body, created_at, updated_at";

/// Provides mail writes across all five mail tables.
pub struct MailRepo;

impl MailRepo {
    // ── Labels ───────────────────────────────────────────────────────

    /// Load all stored mail labels for a character.
    pub async fn list_labels(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterMailLabel>, sqlx::Error> {
        let query = format!(
            "SELECT {LABEL_COLUMNS} FROM character_mail_labels \
             WHERE character_id = $1 ORDER BY label_id"
        );
        sqlx::query_as::<_, CharacterMailLabel>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a label diff: upsert `upserts`, delete `obsolete`.
    pub async fn apply_labels(
        pool: &PgPool,
        character_id: DbId,
        upserts: &[NewMailLabel],
        obsolete: &[EveId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for label in upserts {
            sqlx::query(
                "INSERT INTO character_mail_labels
                    (character_id, label_id, name, color, unread_count)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (character_id, label_id) DO UPDATE
                     SET name = EXCLUDED.name,
                         color = EXCLUDED.color,
                         unread_count = EXCLUDED.unread_count",
            )
            .bind(character_id)
            .bind(label.label_id)
            .bind(&label.name)
            .bind(&label.color)
            .bind(label.unread_count)
            .execute(&mut *tx)
            .await?;
        }
        if !obsolete.is_empty() {
            sqlx::query(
                "DELETE FROM character_mail_labels \
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

    /// Upsert the total unread count. One row per character.
    pub async fn upsert_unread(
        pool: &PgPool,
        character_id: DbId,
        total: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO character_mail_unread (character_id, total)
             VALUES ($1, $2)
             ON CONFLICT (character_id) DO UPDATE SET total = EXCLUDED.total",
        )
        .bind(character_id)
        .bind(total)
        .execute(pool)
        .await?;
        Ok(())
    }

    // ── Mailing lists ────────────────────────────────────────────────

    /// Load all stored mailing lists for a character.
    pub async fn list_mailing_lists(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterMailingList>, sqlx::Error> {
        let query = format!(
            "SELECT {LIST_COLUMNS} FROM character_mailing_lists \
             WHERE character_id = $1 ORDER BY list_id"
        );
        sqlx::query_as::<_, CharacterMailingList>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Upsert mailing lists. Lists the character has left stay on
    /// record so old mail headers keep resolving.
    pub async fn upsert_mailing_lists(
        pool: &PgPool,
        character_id: DbId,
        lists: &[NewMailingList],
    ) -> Result<(), sqlx::Error> {
        if lists.is_empty() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;
        for list in lists {
            sqlx::query(
                "INSERT INTO character_mailing_lists (character_id, list_id, name)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (character_id, list_id) DO UPDATE
                     SET name = EXCLUDED.name",
            )
            .bind(character_id)
            .bind(list.list_id)
            .bind(&list.name)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ── Headers and bodies ───────────────────────────────────────────

    /// Load all stored mail headers for a character.
    pub async fn list_headers(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterMail>, sqlx::Error> {
        let query = format!(
            "SELECT {MAIL_COLUMNS} FROM character_mails \
             WHERE character_id = $1 ORDER BY timestamp DESC"
        );
        sqlx::query_as::<_, CharacterMail>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a header diff: upsert `upserts`, delete `obsolete`.
    /// Bodies are preserved across header updates.
    pub async fn apply_headers(
        pool: &PgPool,
        character_id: DbId,
        upserts: &[NewMailHeader],
        obsolete: &[EveId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for header in upserts {
            sqlx::query(
                "INSERT INTO character_mails
                    (character_id, mail_id, from_id, is_read, subject, timestamp,
                     label_ids, recipients)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (character_id, mail_id) DO UPDATE
                     SET is_read = EXCLUDED.is_read,
                         label_ids = EXCLUDED.label_ids",
            )
            .bind(character_id)
            .bind(header.mail_id)
            .bind(header.from_id)
            .bind(header.is_read)
            .bind(&header.subject)
            .bind(header.timestamp)
            .bind(&header.label_ids)
            .bind(&header.recipients)
            .execute(&mut *tx)
            .await?;
        }
        if !obsolete.is_empty() {
            sqlx::query(
                "DELETE FROM character_mails WHERE character_id = $1 AND mail_id = ANY($2)",
            )
            .bind(character_id)
            .bind(obsolete)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Mails still awaiting a body fetch, newest first. Returns
    /// `(internal id, mail id)` pairs.
    pub async fn mails_without_body(
        pool: &PgPool,
        character_id: DbId,
        limit: i64,
    ) -> Result<Vec<(DbId, EveId)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, mail_id FROM character_mails \
             WHERE character_id = $1 AND body IS NULL \
             ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(character_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Store a fetched mail body.
    pub async fn set_body(pool: &PgPool, id: DbId, body: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE character_mails SET body = $2 WHERE id = $1")
            .bind(id)
            .bind(body)
            .execute(pool)
            .await?;
        Ok(())
    }
}
