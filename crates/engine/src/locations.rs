//! Shared location registry maintenance.
//!
//! Stations, solar systems and player structures referenced by assets,
//! clones and presence rows all land in the `locations` table, keyed by
//! the EVE id. Structures the character cannot dock at are stored as
//! placeholder rows (empty name) and looked up again on later passes,
//! so a name arrives as soon as access does.

use std::collections::HashSet;

use pilotwatch_core::types::EveId;
use pilotwatch_db::models::universe::NewLocation;
use pilotwatch_db::repositories::location_repo::LocationRepo;
use pilotwatch_esi::{EsiClient, EsiError};
use sqlx::PgPool;

use crate::error::UpdateError;

/// What an opaque location id denotes, inferred from the id ranges CCP
/// assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocationClass {
    SolarSystem,
    Station,
    Structure,
    Unknown,
}

impl LocationClass {
    fn kind(self) -> &'static str {
        match self {
            LocationClass::SolarSystem => "solar_system",
            LocationClass::Station => "station",
            LocationClass::Structure => "structure",
            LocationClass::Unknown => "unknown",
        }
    }
}

/// Known space, wormhole and abyssal systems share one contiguous
/// block.
fn classify(id: EveId) -> LocationClass {
    match id {
        30_000_000..=32_999_999 => LocationClass::SolarSystem,
        60_000_000..=63_999_999 => LocationClass::Station,
        id if id > 1_000_000_000_000 => LocationClass::Structure,
        _ => LocationClass::Unknown,
    }
}

/// Make sure every given id has a `locations` row, fetching names for
/// ids not yet resolved. Returns how many rows were written.
///
/// Placeholder rows do not count as resolved, so they are retried here
/// until a lookup succeeds. Without a token, structures go straight to
/// placeholders.
pub async fn ensure_locations(
    pool: &PgPool,
    esi: &EsiClient,
    token: Option<&str>,
    ids: &[EveId],
) -> Result<usize, UpdateError> {
    let mut unique: Vec<EveId> = ids.iter().copied().filter(|id| *id > 0).collect();
    unique.sort_unstable();
    unique.dedup();
    if unique.is_empty() {
        return Ok(0);
    }

    let resolved: HashSet<EveId> = LocationRepo::resolved_ids(pool, &unique)
        .await?
        .into_iter()
        .collect();
    let mut written = 0usize;
    for id in unique.into_iter().filter(|id| !resolved.contains(id)) {
        let row = lookup(esi, token, id).await?;
        LocationRepo::upsert(pool, &row).await?;
        written += 1;
    }
    if written > 0 {
        tracing::debug!(written, "Stored locations");
    }
    Ok(written)
}

/// Resolve one id into a row, degrading to a placeholder when ESI
/// cannot or will not name it.
async fn lookup(
    esi: &EsiClient,
    token: Option<&str>,
    id: EveId,
) -> Result<NewLocation, UpdateError> {
    let class = classify(id);
    match class {
        LocationClass::SolarSystem => match esi.solar_system(id).await {
            Ok(system) => Ok(NewLocation {
                id,
                name: system.name,
                solar_system_id: Some(id),
                owner_id: None,
                type_id: None,
                location_kind: class.kind().to_string(),
            }),
            Err(EsiError::NotFound) => Ok(placeholder(id, class)),
            Err(err) => Err(err.into()),
        },
        LocationClass::Station => match esi.station(id).await {
            Ok(station) => Ok(NewLocation {
                id,
                name: station.name,
                solar_system_id: Some(station.system_id),
                owner_id: station.owner,
                type_id: station.type_id,
                location_kind: class.kind().to_string(),
            }),
            Err(EsiError::NotFound) => Ok(placeholder(id, class)),
            Err(err) => Err(err.into()),
        },
        LocationClass::Structure => {
            let Some(token) = token else {
                return Ok(placeholder(id, class));
            };
            match esi.structure(id, token).await {
                Ok(structure) => Ok(NewLocation {
                    id,
                    name: structure.name,
                    solar_system_id: structure.solar_system_id,
                    owner_id: Some(structure.owner_id),
                    type_id: structure.type_id,
                    location_kind: class.kind().to_string(),
                }),
                Err(EsiError::Forbidden | EsiError::NotFound) => {
                    tracing::debug!(structure_id = id, "Structure not accessible, placeholder stored");
                    Ok(placeholder(id, class))
                }
                Err(err) => Err(err.into()),
            }
        }
        LocationClass::Unknown => Ok(placeholder(id, class)),
    }
}

fn placeholder(id: EveId, class: LocationClass) -> NewLocation {
    NewLocation {
        id,
        name: String::new(),
        solar_system_id: None,
        owner_id: None,
        type_id: None,
        location_kind: class.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ranges_classify_correctly() {
        assert_eq!(classify(30_000_142), LocationClass::SolarSystem);
        assert_eq!(classify(31_002_222), LocationClass::SolarSystem);
        assert_eq!(classify(60_003_760), LocationClass::Station);
        assert_eq!(classify(1_035_466_617_946), LocationClass::Structure);
        assert_eq!(classify(2_004), LocationClass::Unknown);
    }

    #[test]
    fn range_boundaries_are_exclusive_of_neighbours() {
        assert_eq!(classify(29_999_999), LocationClass::Unknown);
        assert_eq!(classify(33_000_000), LocationClass::Unknown);
        assert_eq!(classify(64_000_000), LocationClass::Unknown);
        assert_eq!(classify(1_000_000_000_000), LocationClass::Unknown);
    }

    #[test]
    fn placeholders_keep_their_kind_but_no_name() {
        let row = placeholder(1_035_466_617_946, LocationClass::Structure);
        assert_eq!(row.name, "");
        assert_eq!(row.location_kind, "structure");
        assert_eq!(row.solar_system_id, None);
    }
}
