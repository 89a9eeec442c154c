use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_bases::SubDistrictId;
use livebase_core::{
    BaseId, DomainError, DomainResult, Timestamps, entity_id, impl_record, matches_keyword,
    normalize_code, nullable, optional_text, required_text,
};
use livebase_parties::PartyId;

entity_id!(
    /// Identifier of a retail / live-sales point.
    PointId,
    "PointId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    #[default]
    Open,
    Closed,
}

/// A retail location run by an owner, optionally supplied through a dealer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub base_id: BaseId,
    pub sub_district_id: Option<SubDistrictId>,
    pub code: String,
    pub name: String,
    pub owner_name: String,
    /// Customer party acting as dealer.
    pub dealer_id: Option<PartyId>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: PointStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Point, PointId, "points", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct PointInput {
    pub base_id: BaseId,
    pub sub_district_id: Option<SubDistrictId>,
    pub code: String,
    pub name: String,
    pub owner_name: String,
    pub dealer_id: Option<PartyId>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// `sub_district_id` and `dealer_id` accept `null` to detach the point.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointUpdate {
    #[serde(default, deserialize_with = "nullable")]
    pub sub_district_id: Option<Option<SubDistrictId>>,
    pub name: Option<String>,
    pub owner_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub dealer_id: Option<Option<PartyId>>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<PointStatus>,
}

impl Point {
    pub fn create(input: PointInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: PointId::new(),
            base_id: input.base_id,
            sub_district_id: input.sub_district_id,
            code: normalize_code("code", &input.code)?,
            name: required_text("name", &input.name, 64)?,
            owner_name: required_text("owner_name", &input.owner_name, 64)?,
            dealer_id: input.dealer_id,
            phone: optional_text("phone", input.phone.as_deref(), 32)?,
            address: optional_text("address", input.address.as_deref(), 200)?,
            status: PointStatus::Open,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: PointUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(sub_district_id) = patch.sub_district_id {
            self.sub_district_id = sub_district_id;
        }
        if let Some(name) = patch.name {
            self.name = required_text("name", &name, 64)?;
        }
        if let Some(owner) = patch.owner_name {
            self.owner_name = required_text("owner_name", &owner, 64)?;
        }
        if let Some(dealer_id) = patch.dealer_id {
            self.dealer_id = dealer_id;
        }
        if patch.phone.is_some() {
            self.phone = optional_text("phone", patch.phone.as_deref(), 32)?;
        }
        if patch.address.is_some() {
            self.address = optional_text("address", patch.address.as_deref(), 200)?;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    /// Closed points take no new orders.
    pub fn ensure_open(&self) -> DomainResult<()> {
        match self.status {
            PointStatus::Open => Ok(()),
            PointStatus::Closed => Err(DomainError::invariant(format!(
                "point {} is closed",
                self.code
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointFilter {
    pub base_id: Option<BaseId>,
    pub sub_district_id: Option<SubDistrictId>,
    pub status: Option<PointStatus>,
    pub keyword: Option<String>,
}

impl PointFilter {
    pub fn matches(&self, p: &Point) -> bool {
        self.base_id.is_none_or(|b| b == p.base_id)
            && self
                .sub_district_id
                .is_none_or(|d| p.sub_district_id == Some(d))
            && self.status.is_none_or(|s| s == p.status)
            && matches_keyword(self.keyword.as_deref(), &[&p.code, &p.name, &p.owner_name])
    }
}
