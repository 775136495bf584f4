//! Contact list section: labels first, then the contacts that
//! reference them.

use std::collections::HashMap;

use pilotwatch_core::merge;
use pilotwatch_core::types::EveId;
use pilotwatch_db::models::contact::{NewContact, NewContactLabel};
use pilotwatch_db::repositories::contact_repo::ContactRepo;
use pilotwatch_esi::records::{EsiContact, EsiContactLabel};

use crate::error::UpdateError;
use crate::resolver;
use crate::sections::UpdateContext;

pub async fn update(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;

    let labels = ctx.esi.contact_labels(ctx.character.character_id, token).await?;
    let incoming_labels: Vec<NewContactLabel> = labels.iter().map(map_label).collect();
    let existing_labels: HashMap<EveId, NewContactLabel> =
        ContactRepo::list_labels(ctx.pool, ctx.character.id)
            .await?
            .into_iter()
            .map(|l| (l.label_id, l.as_new()))
            .collect();
    let label_plan = merge::plan_replace(&existing_labels, &incoming_labels, |l| l.label_id);
    if !label_plan.is_empty() {
        let upserts: Vec<NewContactLabel> =
            label_plan.create.into_iter().chain(label_plan.update).collect();
        ContactRepo::apply_labels(ctx.pool, ctx.character.id, &upserts, &label_plan.obsolete)
            .await?;
    }

    let contacts = ctx.esi.contacts(ctx.character.character_id, token).await?;
    let incoming: Vec<NewContact> = contacts
        .iter()
        .map(map_contact)
        .collect::<Result<_, _>>()?;
    let existing: HashMap<EveId, NewContact> =
        ContactRepo::list_contacts(ctx.pool, ctx.character.id)
            .await?
            .into_iter()
            .map(|c| (c.contact_id, c.as_new()))
            .collect();
    let plan = merge::plan_replace(&existing, &incoming, |c| c.contact_id);
    if plan.is_empty() {
        tracing::debug!(character_id = ctx.character.character_id, "Contacts unchanged");
    } else {
        let upserts: Vec<NewContact> = plan.create.into_iter().chain(plan.update).collect();
        ContactRepo::apply_contacts(ctx.pool, ctx.character.id, &upserts, &plan.obsolete).await?;
        tracing::info!(
            character_id = ctx.character.character_id,
            upserts = upserts.len(),
            removed = plan.obsolete.len(),
            "Stored contacts"
        );
    }

    let contact_ids: Vec<EveId> = incoming.iter().map(|c| c.contact_id).collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &contact_ids).await?;
    Ok(())
}

// ---- mapping ----

fn map_label(label: &EsiContactLabel) -> NewContactLabel {
    NewContactLabel {
        label_id: label.label_id,
        name: label.label_name.clone(),
    }
}

/// Label ids are sorted before serialization so the stored JSON is
/// deterministic and diffable.
fn map_contact(contact: &EsiContact) -> Result<NewContact, serde_json::Error> {
    let mut label_ids = contact.label_ids.clone();
    label_ids.sort_unstable();
    Ok(NewContact {
        contact_id: contact.contact_id,
        contact_type: contact.contact_type.clone(),
        standing: contact.standing,
        is_blocked: contact.is_blocked,
        is_watched: contact.is_watched,
        label_ids: serde_json::to_value(&label_ids)?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn contact(contact_id: EveId, label_ids: Vec<EveId>) -> EsiContact {
        EsiContact {
            contact_id,
            contact_type: "character".into(),
            standing: 5.0,
            is_blocked: None,
            is_watched: Some(true),
            label_ids,
        }
    }

    #[test]
    fn label_ids_are_sorted_in_the_stored_json() {
        let mapped = map_contact(&contact(92_000_001, vec![3, 1, 2])).unwrap();
        assert_eq!(mapped.label_ids, json!([1, 2, 3]));
    }

    #[test]
    fn reordered_label_ids_do_not_register_as_a_change() {
        let a = map_contact(&contact(92_000_001, vec![2, 1])).unwrap();
        let b = map_contact(&contact(92_000_001, vec![1, 2])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn standing_changes_are_detected_by_the_diff() {
        let stored = map_contact(&contact(92_000_001, vec![1])).unwrap();
        let mut fresh = contact(92_000_001, vec![1]);
        fresh.standing = -10.0;
        let incoming = vec![map_contact(&fresh).unwrap()];

        let existing: HashMap<EveId, NewContact> =
            HashMap::from([(stored.contact_id, stored)]);
        let plan = merge::plan_replace(&existing, &incoming, |c| c.contact_id);
        assert_eq!(plan.update.len(), 1);
        assert!(plan.create.is_empty());
        assert!(plan.obsolete.is_empty());
    }
}
