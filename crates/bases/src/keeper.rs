use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{BaseId, DomainError, DomainResult, Timestamps, entity_id, impl_record};

use crate::{Location, LocationId, Personnel, PersonnelId};

entity_id!(WarehouseKeeperId, "WarehouseKeeperId");

/// Assignment of a warehouse keeper to a location of the same base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseKeeper {
    pub id: WarehouseKeeperId,
    pub base_id: BaseId,
    pub personnel_id: PersonnelId,
    pub location_id: LocationId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(WarehouseKeeper, WarehouseKeeperId, "warehouse_keepers", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseKeeperInput {
    pub personnel_id: PersonnelId,
    pub location_id: LocationId,
}

impl WarehouseKeeper {
    /// `existing` are the current assignments of the location's base.
    pub fn assign(
        personnel: &Personnel,
        location: &Location,
        existing: &[WarehouseKeeper],
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        personnel.ensure_can_keep()?;
        if personnel.base_id != location.base_id {
            return Err(DomainError::invariant(
                "personnel and location belong to different bases",
            ));
        }
        if existing
            .iter()
            .any(|k| k.personnel_id == personnel.id && k.location_id == location.id)
        {
            return Err(DomainError::conflict(format!(
                "{} is already assigned to {}",
                personnel.name, location.code
            )));
        }
        Ok(Self {
            id: WarehouseKeeperId::new(),
            base_id: location.base_id,
            personnel_id: personnel.id,
            location_id: location.id,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeeperFilter {
    pub base_id: Option<BaseId>,
    pub location_id: Option<LocationId>,
    pub personnel_id: Option<PersonnelId>,
}

impl KeeperFilter {
    pub fn matches(&self, k: &WarehouseKeeper) -> bool {
        self.base_id.is_none_or(|b| b == k.base_id)
            && self.location_id.is_none_or(|l| l == k.location_id)
            && self.personnel_id.is_none_or(|p| p == k.personnel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocationInput, LocationKind, PersonnelInput, Position};

    fn fixtures(base: BaseId) -> (Personnel, Location) {
        let now = Utc::now();
        let p = Personnel::create(
            PersonnelInput {
                base_id: base,
                name: "Li".into(),
                phone: None,
                position: Position::WarehouseKeeper,
                joined_on: None,
            },
            now,
        )
        .unwrap();
        let l = Location::create(
            LocationInput {
                base_id: base,
                code: "WH".into(),
                name: "Warehouse".into(),
                kind: LocationKind::Warehouse,
                note: None,
            },
            now,
        )
        .unwrap();
        (p, l)
    }

    #[test]
    fn assigns_once_per_location() {
        let (p, l) = fixtures(BaseId::new());
        let k = WarehouseKeeper::assign(&p, &l, &[], Utc::now()).unwrap();
        assert_eq!(k.base_id, l.base_id);
        let err = WarehouseKeeper::assign(&p, &l, &[k], Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn rejects_cross_base_assignment() {
        let (p, _) = fixtures(BaseId::new());
        let (_, l) = fixtures(BaseId::new());
        assert!(WarehouseKeeper::assign(&p, &l, &[], Utc::now()).is_err());
    }
}
