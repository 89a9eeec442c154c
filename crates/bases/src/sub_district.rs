use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, DomainResult, Timestamps, entity_id, impl_record, matches_keyword, normalize_code,
    required_text,
};

entity_id!(
    /// Identifier of an area grouping of points inside a base.
    SubDistrictId,
    "SubDistrictId"
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubDistrict {
    pub id: SubDistrictId,
    pub base_id: BaseId,
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(SubDistrict, SubDistrictId, "sub_districts", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct SubDistrictInput {
    pub base_id: BaseId,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubDistrictUpdate {
    pub name: Option<String>,
}

impl SubDistrict {
    pub fn create(input: SubDistrictInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: SubDistrictId::new(),
            base_id: input.base_id,
            code: normalize_code("code", &input.code)?,
            name: required_text("name", &input.name, 64)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: SubDistrictUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = required_text("name", &name, 64)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubDistrictFilter {
    pub base_id: Option<BaseId>,
    pub keyword: Option<String>,
}

impl SubDistrictFilter {
    pub fn matches(&self, d: &SubDistrict) -> bool {
        self.base_id.is_none_or(|b| b == d.base_id)
            && matches_keyword(self.keyword.as_deref(), &[&d.code, &d.name])
    }
}
