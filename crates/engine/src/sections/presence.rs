//! Location and online-status sections. Both are single-row snapshots
//! that change constantly, so they overwrite without diffing.

use pilotwatch_db::models::presence::{NewCharacterLocation, NewOnlineStatus};
use pilotwatch_db::repositories::presence_repo::PresenceRepo;
use pilotwatch_esi::records::{EsiLocation, EsiOnline};

use crate::error::UpdateError;
use crate::locations;
use crate::sections::UpdateContext;

pub async fn update_location(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let location = ctx.esi.location(ctx.character.character_id, token).await?;
    let incoming = map_location(&location);

    let mut referenced = vec![incoming.solar_system_id];
    referenced.extend(incoming.location_id);
    locations::ensure_locations(ctx.pool, ctx.esi, Some(token), &referenced).await?;

    PresenceRepo::upsert_location(ctx.pool, ctx.character.id, &incoming).await?;
    tracing::debug!(
        character_id = ctx.character.character_id,
        solar_system_id = incoming.solar_system_id,
        docked = incoming.location_id.is_some(),
        "Stored location"
    );
    Ok(())
}

pub async fn update_online_status(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let online = ctx.esi.online(ctx.character.character_id, token).await?;
    let incoming = map_online(&online);
    PresenceRepo::upsert_online_status(ctx.pool, ctx.character.id, &incoming).await?;
    tracing::debug!(
        character_id = ctx.character.character_id,
        is_online = incoming.is_online,
        "Stored online status"
    );
    Ok(())
}

// ---- mapping ----

/// A docked character reports either a station or a structure id,
/// never both. In space both are absent.
fn map_location(location: &EsiLocation) -> NewCharacterLocation {
    NewCharacterLocation {
        solar_system_id: location.solar_system_id,
        location_id: location.station_id.or(location.structure_id),
    }
}

fn map_online(online: &EsiOnline) -> NewOnlineStatus {
    NewOnlineStatus {
        is_online: online.online,
        last_login: online.last_login,
        last_logout: online.last_logout,
        logins: online.logins,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docked_at_station_uses_the_station_id() {
        let mapped = map_location(&EsiLocation {
            solar_system_id: 30_000_142,
            station_id: Some(60_003_760),
            structure_id: None,
        });
        assert_eq!(mapped.location_id, Some(60_003_760));
    }

    #[test]
    fn docked_at_structure_uses_the_structure_id() {
        let mapped = map_location(&EsiLocation {
            solar_system_id: 30_002_187,
            station_id: None,
            structure_id: Some(1_035_466_617_946),
        });
        assert_eq!(mapped.location_id, Some(1_035_466_617_946));
    }

    #[test]
    fn undocked_has_no_location_id() {
        let mapped = map_location(&EsiLocation {
            solar_system_id: 31_002_222,
            station_id: None,
            structure_id: None,
        });
        assert_eq!(mapped.location_id, None);
        assert_eq!(mapped.solar_system_id, 31_002_222);
    }
}
