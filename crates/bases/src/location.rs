use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, DomainResult, Timestamps, entity_id, impl_record, matches_keyword, normalize_code,
    optional_text, required_text,
};

entity_id!(
    /// Identifier of a storage location (warehouse, shelf, studio...).
    LocationId,
    "LocationId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Warehouse,
    Shelf,
    Studio,
    Other,
}

/// A place inside a base where stock is held. Code is unique per base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub base_id: BaseId,
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Location, LocationId, "locations", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub base_id: BaseId,
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub kind: Option<LocationKind>,
    pub note: Option<String>,
}

impl Location {
    pub fn create(input: LocationInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: LocationId::new(),
            base_id: input.base_id,
            code: normalize_code("code", &input.code)?,
            name: required_text("name", &input.name, 64)?,
            kind: input.kind,
            note: optional_text("note", input.note.as_deref(), 500)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: LocationUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = required_text("name", &name, 64)?;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if patch.note.is_some() {
            self.note = optional_text("note", patch.note.as_deref(), 500)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationFilter {
    pub base_id: Option<BaseId>,
    pub kind: Option<LocationKind>,
    pub keyword: Option<String>,
}

impl LocationFilter {
    pub fn matches(&self, l: &Location) -> bool {
        self.base_id.is_none_or(|b| b == l.base_id)
            && self.kind.is_none_or(|k| k == l.kind)
            && matches_keyword(self.keyword.as_deref(), &[&l.code, &l.name])
    }
}
