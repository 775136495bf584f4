//! Mail section: labels, mailing lists, a bounded window of headers
//! and lazy body fetches.
//!
//! Headers are walked newest-first through `last_mail_id` pagination up
//! to the configured cap. Deletions are only honored inside that
//! window: a mail older than the cap is unknown, not deleted.

use std::collections::{HashMap, HashSet};

use pilotwatch_core::merge::{self, MergePlan};
use pilotwatch_core::types::EveId;
use pilotwatch_db::models::mail::{NewMailHeader, NewMailLabel, NewMailingList};
use pilotwatch_db::repositories::mail_repo::MailRepo;
use pilotwatch_esi::records::{EsiMailHeader, EsiMailLabel, EsiMailingList};
use pilotwatch_esi::EsiError;

use crate::error::UpdateError;
use crate::resolver;
use crate::sections::UpdateContext;

/// ESI serves mail headers in pages of at most 50.
const HEADERS_PAGE_SIZE: usize = 50;

/// How many missing bodies to backfill per pass.
const BODY_FETCH_LIMIT: i64 = 50;

pub async fn update(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;

    update_mailing_lists(ctx, token).await?;
    update_labels(ctx, token).await?;

    let window = fetch_window(ctx, token).await?;
    let mut incoming: Vec<NewMailHeader> = Vec::with_capacity(window.len());
    let mut skipped = 0usize;
    for header in &window {
        match map_header(header)? {
            Some(mapped) => incoming.push(mapped),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(
            character_id = ctx.character.character_id,
            skipped,
            "Skipped mail headers without id or timestamp"
        );
    }

    let existing: HashMap<EveId, NewMailHeader> =
        MailRepo::list_headers(ctx.pool, ctx.character.id)
            .await?
            .into_iter()
            .map(|m| (m.mail_id, m.as_new()))
            .collect();
    let plan = plan_header_window(&existing, &incoming);
    if plan.is_empty() {
        tracing::debug!(character_id = ctx.character.character_id, "Mail unchanged");
    } else {
        let obsolete = plan.obsolete.clone();
        let upserts: Vec<NewMailHeader> = plan.create.into_iter().chain(plan.update).collect();
        MailRepo::apply_headers(ctx.pool, ctx.character.id, &upserts, &obsolete).await?;
        tracing::info!(
            character_id = ctx.character.character_id,
            upserts = upserts.len(),
            removed = obsolete.len(),
            "Stored mail headers"
        );
    }

    let fetched = fetch_bodies(ctx, token).await?;
    if fetched > 0 {
        tracing::debug!(
            character_id = ctx.character.character_id,
            bodies = fetched,
            "Fetched mail bodies"
        );
    }

    let correspondents = correspondent_ids(&window);
    resolver::ensure_entities(ctx.pool, ctx.esi, &correspondents).await?;
    Ok(())
}

async fn update_labels(ctx: &UpdateContext<'_>, token: &str) -> Result<(), UpdateError> {
    let labels = ctx.esi.mail_labels(ctx.character.character_id, token).await?;
    let incoming: Vec<NewMailLabel> = labels.labels.iter().map(map_label).collect();
    let existing: HashMap<EveId, NewMailLabel> = MailRepo::list_labels(ctx.pool, ctx.character.id)
        .await?
        .into_iter()
        .map(|l| (l.label_id, l.as_new()))
        .collect();
    let plan = merge::plan_replace(&existing, &incoming, |l| l.label_id);
    if !plan.is_empty() {
        let upserts: Vec<NewMailLabel> = plan.create.into_iter().chain(plan.update).collect();
        MailRepo::apply_labels(ctx.pool, ctx.character.id, &upserts, &plan.obsolete).await?;
    }
    MailRepo::upsert_unread(
        ctx.pool,
        ctx.character.id,
        labels.total_unread_count.unwrap_or(0),
    )
    .await?;
    Ok(())
}

async fn update_mailing_lists(ctx: &UpdateContext<'_>, token: &str) -> Result<(), UpdateError> {
    let lists = ctx.esi.mailing_lists(ctx.character.character_id, token).await?;
    let incoming: Vec<NewMailingList> = lists.iter().map(map_list).collect();
    let existing: HashMap<EveId, NewMailingList> =
        MailRepo::list_mailing_lists(ctx.pool, ctx.character.id)
            .await?
            .into_iter()
            .map(|l| (l.list_id, l.as_new()))
            .collect();
    let plan = merge::plan_upsert(&existing, &incoming, |l| l.list_id);
    if !plan.is_empty() {
        let changed: Vec<NewMailingList> = plan.create.into_iter().chain(plan.update).collect();
        MailRepo::upsert_mailing_lists(ctx.pool, ctx.character.id, &changed).await?;
    }
    Ok(())
}

/// Walk header pages newest-first until the cap is reached or the
/// mailbox runs out.
async fn fetch_window(
    ctx: &UpdateContext<'_>,
    token: &str,
) -> Result<Vec<EsiMailHeader>, UpdateError> {
    let mut headers: Vec<EsiMailHeader> = Vec::new();
    let mut last_mail_id: Option<EveId> = None;
    loop {
        let page = ctx
            .esi
            .mail_headers(ctx.character.character_id, token, last_mail_id)
            .await?;
        let page_len = page.len();
        let oldest = page.iter().filter_map(|h| h.mail_id).min();
        headers.extend(page);

        if headers.len() >= ctx.config.max_mails || page_len < HEADERS_PAGE_SIZE {
            break;
        }
        match oldest {
            Some(id) => last_mail_id = Some(id),
            None => break,
        }
    }
    headers.truncate(ctx.config.max_mails);
    Ok(headers)
}

/// Backfill bodies for headers that arrived without one, newest first.
async fn fetch_bodies(ctx: &UpdateContext<'_>, token: &str) -> Result<usize, UpdateError> {
    let pending =
        MailRepo::mails_without_body(ctx.pool, ctx.character.id, BODY_FETCH_LIMIT).await?;
    let mut fetched = 0usize;
    for (id, mail_id) in pending {
        match ctx
            .esi
            .mail_body(ctx.character.character_id, mail_id, token)
            .await
        {
            Ok(body) => {
                MailRepo::set_body(ctx.pool, id, body.body.as_deref().unwrap_or_default())
                    .await?;
                fetched += 1;
            }
            Err(EsiError::NotFound) => {
                // A deleted mail 404s forever. Store an empty body so
                // it never queues again.
                MailRepo::set_body(ctx.pool, id, "").await?;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(fetched)
}

// ---- mapping and planning ----

fn map_label(label: &EsiMailLabel) -> NewMailLabel {
    NewMailLabel {
        label_id: label.label_id,
        name: label.name.clone().unwrap_or_default(),
        color: label.color.clone(),
        unread_count: label.unread_count,
    }
}

fn map_list(list: &EsiMailingList) -> NewMailingList {
    NewMailingList {
        list_id: list.mailing_list_id,
        name: list.name.clone(),
    }
}

/// Map one header, or `None` when it lacks the fields a row cannot
/// stand without. Labels and recipients are sorted before
/// serialization so the stored JSON is deterministic and diffable.
fn map_header(header: &EsiMailHeader) -> Result<Option<NewMailHeader>, serde_json::Error> {
    let (Some(mail_id), Some(timestamp)) = (header.mail_id, header.timestamp) else {
        return Ok(None);
    };
    let mut labels = header.labels.clone();
    labels.sort_unstable();
    let mut recipients = header.recipients.clone();
    recipients.sort_by(|a, b| {
        (a.recipient_type.as_str(), a.recipient_id)
            .cmp(&(b.recipient_type.as_str(), b.recipient_id))
    });
    Ok(Some(NewMailHeader {
        mail_id,
        from_id: header.from.unwrap_or(0),
        is_read: header.is_read,
        subject: header.subject.clone().unwrap_or_default(),
        timestamp,
        label_ids: serde_json::to_value(&labels)?,
        recipients: serde_json::to_value(&recipients)?,
    }))
}

/// Diff the fetched window against storage. Stored mails older than
/// the window floor are outside what was fetched and never deleted;
/// stored mails inside the window that ESI no longer returns were
/// deleted in game and are removed here.
fn plan_header_window(
    existing: &HashMap<EveId, NewMailHeader>,
    incoming: &[NewMailHeader],
) -> MergePlan<EveId, NewMailHeader> {
    let mut plan = merge::plan_upsert(existing, incoming, |h| h.mail_id);
    if let Some(window_floor) = incoming.iter().map(|h| h.mail_id).min() {
        let seen: HashSet<EveId> = incoming.iter().map(|h| h.mail_id).collect();
        plan.obsolete = existing
            .keys()
            .filter(|id| **id >= window_floor && !seen.contains(id))
            .copied()
            .collect();
        plan.obsolete.sort_unstable();
    }
    plan
}

/// Ids worth resolving from a header window. Mailing list ids are not
/// name-resolvable; the mailing list table covers those.
fn correspondent_ids(headers: &[EsiMailHeader]) -> Vec<EveId> {
    let mut ids: Vec<EveId> = Vec::new();
    for header in headers {
        ids.extend(header.from);
        ids.extend(
            header
                .recipients
                .iter()
                .filter(|r| r.recipient_type != "mailing_list")
                .map(|r| r.recipient_id),
        );
    }
    ids
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pilotwatch_esi::records::EsiMailRecipient;
    use serde_json::json;

    use super::*;

    fn header(mail_id: EveId) -> EsiMailHeader {
        EsiMailHeader {
            mail_id: Some(mail_id),
            from: Some(92_000_001),
            subject: Some("Fleet tomorrow".into()),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 4, 2, 19, 0, 0).unwrap()),
            is_read: Some(false),
            labels: vec![8, 1],
            recipients: vec![
                EsiMailRecipient {
                    recipient_id: 98_356_193,
                    recipient_type: "corporation".into(),
                },
                EsiMailRecipient {
                    recipient_id: 95_000_002,
                    recipient_type: "character".into(),
                },
            ],
        }
    }

    fn mapped(mail_id: EveId) -> NewMailHeader {
        map_header(&header(mail_id)).unwrap().unwrap()
    }

    // ---- map_header ----

    #[test]
    fn header_without_mail_id_is_skipped() {
        let mut raw = header(1);
        raw.mail_id = None;
        assert!(map_header(&raw).unwrap().is_none());
    }

    #[test]
    fn header_without_timestamp_is_skipped() {
        let mut raw = header(1);
        raw.timestamp = None;
        assert!(map_header(&raw).unwrap().is_none());
    }

    #[test]
    fn labels_and_recipients_are_sorted() {
        let row = mapped(1);
        assert_eq!(row.label_ids, json!([1, 8]));
        assert_eq!(
            row.recipients,
            json!([
                {"recipient_id": 95_000_002, "recipient_type": "character"},
                {"recipient_id": 98_356_193, "recipient_type": "corporation"},
            ])
        );
    }

    #[test]
    fn missing_sender_maps_to_zero() {
        let mut raw = header(1);
        raw.from = None;
        let row = map_header(&raw).unwrap().unwrap();
        assert_eq!(row.from_id, 0);
    }

    // ---- plan_header_window ----

    #[test]
    fn mails_older_than_the_window_are_never_deleted() {
        let existing: HashMap<EveId, NewMailHeader> =
            [100, 200, 300].map(|id| (id, mapped(id))).into();
        let incoming = vec![mapped(200), mapped(300)];

        let plan = plan_header_window(&existing, &incoming);
        // 100 predates the fetched window and stays untouched.
        assert!(plan.obsolete.is_empty());
        assert!(plan.create.is_empty());
        assert!(plan.update.is_empty());
    }

    #[test]
    fn mails_deleted_inside_the_window_are_removed() {
        let existing: HashMap<EveId, NewMailHeader> =
            [100, 200, 250, 300].map(|id| (id, mapped(id))).into();
        let incoming = vec![mapped(200), mapped(300)];

        let plan = plan_header_window(&existing, &incoming);
        assert_eq!(plan.obsolete, vec![250]);
    }

    #[test]
    fn empty_window_keeps_everything() {
        let existing: HashMap<EveId, NewMailHeader> = [100].map(|id| (id, mapped(id))).into();
        let plan = plan_header_window(&existing, &[]);
        assert!(plan.is_empty());
    }

    #[test]
    fn read_flag_flip_registers_as_update() {
        let existing: HashMap<EveId, NewMailHeader> = [(100, mapped(100))].into();
        let mut raw = header(100);
        raw.is_read = Some(true);
        let incoming = vec![map_header(&raw).unwrap().unwrap()];

        let plan = plan_header_window(&existing, &incoming);
        assert_eq!(plan.update.len(), 1);
        assert!(plan.obsolete.is_empty());
    }

    // ---- correspondent_ids ----

    #[test]
    fn mailing_list_recipients_are_not_resolved() {
        let mut raw = header(1);
        raw.recipients.push(EsiMailRecipient {
            recipient_id: 145_464_864,
            recipient_type: "mailing_list".into(),
        });
        let ids = correspondent_ids(&[raw]);
        assert!(ids.contains(&92_000_001));
        assert!(ids.contains(&95_000_002));
        assert!(!ids.contains(&145_464_864));
    }
}
