use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, CurrencyCode, DomainError, DomainResult, Entity, Record, Timestamps, matches_keyword,
    normalize_code, optional_text, required_text,
};

/// What kind of operation a base runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseKind {
    LiveStream,
    OfflineRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaseStatus {
    #[default]
    Active,
    Disabled,
}

/// A tenant-scoped operational unit. Owns locations, personnel, points and
/// every order placed in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub id: BaseId,
    pub code: String,
    pub name: String,
    pub kind: BaseKind,
    /// Default currency for documents created in this base.
    pub currency: CurrencyCode,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub status: BaseStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseInput {
    pub code: String,
    pub name: String,
    pub kind: BaseKind,
    pub currency: CurrencyCode,
    pub address: Option<String>,
    pub contact: Option<String>,
}

/// Partial update; the code is immutable once created.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub kind: Option<BaseKind>,
    pub currency: Option<CurrencyCode>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

impl Base {
    pub fn create(input: BaseInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: BaseId::new(),
            code: normalize_code("code", &input.code)?,
            name: required_text("name", &input.name, 64)?,
            kind: input.kind,
            currency: input.currency,
            address: optional_text("address", input.address.as_deref(), 200)?,
            contact: optional_text("contact", input.contact.as_deref(), 64)?,
            status: BaseStatus::Active,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: BaseUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(code) = patch.code {
            if normalize_code("code", &code)? != self.code {
                return Err(DomainError::validation("base code cannot be changed"));
            }
        }
        if let Some(name) = patch.name {
            self.name = required_text("name", &name, 64)?;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if patch.address.is_some() {
            self.address = optional_text("address", patch.address.as_deref(), 200)?;
        }
        if patch.contact.is_some() {
            self.contact = optional_text("contact", patch.contact.as_deref(), 64)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn enable(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == BaseStatus::Active {
            return Err(DomainError::invariant("base is already active"));
        }
        self.status = BaseStatus::Active;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn disable(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == BaseStatus::Disabled {
            return Err(DomainError::invariant("base is already disabled"));
        }
        self.status = BaseStatus::Disabled;
        self.timestamps.touch(now);
        Ok(())
    }

    /// New records may only be created in an active base.
    pub fn ensure_active(&self) -> DomainResult<()> {
        match self.status {
            BaseStatus::Active => Ok(()),
            BaseStatus::Disabled => Err(DomainError::invariant(format!(
                "base {} is disabled",
                self.code
            ))),
        }
    }
}

impl Entity for Base {
    type Id = BaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Record for Base {
    const KIND: &'static str = "bases";

    /// A base is scoped by itself: principals only see their own bases.
    fn base_id(&self) -> Option<BaseId> {
        Some(self.id)
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseFilter {
    pub keyword: Option<String>,
    pub kind: Option<BaseKind>,
    pub status: Option<BaseStatus>,
}

impl BaseFilter {
    pub fn matches(&self, base: &Base) -> bool {
        matches_keyword(self.keyword.as_deref(), &[&base.code, &base.name])
            && self.kind.is_none_or(|k| k == base.kind)
            && self.status.is_none_or(|s| s == base.status)
    }
}
