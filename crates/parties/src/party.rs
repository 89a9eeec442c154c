use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, DomainError, DomainResult, Timestamps, entity_id, impl_record, matches_keyword,
    optional_text, required_text,
};

entity_id!(
    /// Party identifier (customers and suppliers share one id space).
    PartyId,
    "PartyId"
);

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

/// Party status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartyStatus {
    #[default]
    Active,
    Suspended,
}

/// Contact information for a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    fn normalized(self) -> DomainResult<Self> {
        let email = optional_text("email", self.email.as_deref(), 128)?;
        if let Some(e) = &email {
            if !e.contains('@') {
                return Err(DomainError::validation("email must contain '@'"));
            }
        }
        Ok(Self {
            email,
            phone: optional_text("phone", self.phone.as_deref(), 32)?,
            address: optional_text("address", self.address.as_deref(), 200)?,
        })
    }
}

/// Customer or supplier. Parties without a base are shared across the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    pub base_id: Option<BaseId>,
    pub status: PartyStatus,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Party, PartyId, "parties", optionally_scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct PartyInput {
    pub kind: PartyKind,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    pub base_id: Option<BaseId>,
    pub note: Option<String>,
}

/// Partial update. Kind and base are fixed once registered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartyUpdate {
    pub name: Option<String>,
    pub contact: Option<ContactInfo>,
    pub note: Option<String>,
}

impl Party {
    pub fn register(input: PartyInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: PartyId::new(),
            kind: input.kind,
            name: required_text("name", &input.name, 128)?,
            contact: input.contact.normalized()?,
            base_id: input.base_id,
            status: PartyStatus::Active,
            note: optional_text("note", input.note.as_deref(), 500)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: PartyUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = required_text("name", &name, 128)?;
        }
        if let Some(contact) = patch.contact {
            self.contact = contact.normalized()?;
        }
        if patch.note.is_some() {
            self.note = optional_text("note", patch.note.as_deref(), 500)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn suspend(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == PartyStatus::Suspended {
            return Err(DomainError::conflict("party is already suspended"));
        }
        self.status = PartyStatus::Suspended;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn reactivate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == PartyStatus::Active {
            return Err(DomainError::conflict("party is already active"));
        }
        self.status = PartyStatus::Active;
        self.timestamps.touch(now);
        Ok(())
    }

    /// Invariant helper: whether this party is allowed to transact.
    ///
    /// Suspended parties cannot transact.
    pub fn can_transact(&self) -> bool {
        self.status == PartyStatus::Active
    }

    /// The party may appear on a new document of `kind` in `base`.
    pub fn ensure_can_transact_as(&self, kind: PartyKind, base: BaseId) -> DomainResult<()> {
        if self.kind != kind {
            return Err(DomainError::invariant(format!(
                "{} is not a {}",
                self.name,
                match kind {
                    PartyKind::Customer => "customer",
                    PartyKind::Supplier => "supplier",
                }
            )));
        }
        if !self.can_transact() {
            return Err(DomainError::invariant(format!("{} is suspended", self.name)));
        }
        if self.base_id.is_some_and(|b| b != base) {
            return Err(DomainError::invariant(format!(
                "{} belongs to another base",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartyFilter {
    pub kind: Option<PartyKind>,
    pub status: Option<PartyStatus>,
    pub keyword: Option<String>,
    pub base_id: Option<BaseId>,
}

impl PartyFilter {
    pub fn matches(&self, p: &Party) -> bool {
        self.kind.is_none_or(|k| k == p.kind)
            && self.status.is_none_or(|s| s == p.status)
            && self.base_id.is_none_or(|b| p.base_id.is_none_or(|own| own == b))
            && matches_keyword(
                self.keyword.as_deref(),
                &[
                    &p.name,
                    p.contact.phone.as_deref().unwrap_or_default(),
                    p.contact.email.as_deref().unwrap_or_default(),
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier() -> Party {
        Party::register(
            PartyInput {
                kind: PartyKind::Supplier,
                name: "  Tea Farm Co. ".into(),
                contact: ContactInfo {
                    email: Some("sales@teafarm.example".into()),
                    phone: Some("".into()),
                    address: None,
                },
                base_id: None,
                note: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn register_normalises_contact() {
        let p = supplier();
        assert_eq!(p.name, "Tea Farm Co.");
        assert_eq!(p.contact.phone, None);
        assert!(p.can_transact());
    }

    #[test]
    fn register_rejects_bad_email_and_empty_name() {
        let input = PartyInput {
            kind: PartyKind::Customer,
            name: "Shop".into(),
            contact: ContactInfo {
                email: Some("not-an-email".into()),
                ..Default::default()
            },
            base_id: None,
            note: None,
        };
        assert!(matches!(
            Party::register(input, Utc::now()),
            Err(DomainError::Validation(_))
        ));

        let input = PartyInput {
            kind: PartyKind::Customer,
            name: "   ".into(),
            contact: ContactInfo::default(),
            base_id: None,
            note: None,
        };
        assert!(Party::register(input, Utc::now()).is_err());
    }

    #[test]
    fn suspended_party_cannot_transact() {
        let mut p = supplier();
        let base = BaseId::new();
        p.ensure_can_transact_as(PartyKind::Supplier, base).unwrap();
        assert!(p.ensure_can_transact_as(PartyKind::Customer, base).is_err());

        p.suspend(Utc::now()).unwrap();
        assert!(p.ensure_can_transact_as(PartyKind::Supplier, base).is_err());
        assert!(matches!(p.suspend(Utc::now()), Err(DomainError::Conflict(_))));

        p.reactivate(Utc::now()).unwrap();
        assert!(p.can_transact());
    }

    #[test]
    fn base_owned_party_is_limited_to_its_base() {
        let mut p = supplier();
        let own = BaseId::new();
        p.base_id = Some(own);
        assert!(p.ensure_can_transact_as(PartyKind::Supplier, own).is_ok());
        assert!(p.ensure_can_transact_as(PartyKind::Supplier, BaseId::new()).is_err());

        let f = PartyFilter {
            base_id: Some(own),
            kind: Some(PartyKind::Supplier),
            keyword: Some("teafarm".into()),
            ..Default::default()
        };
        assert!(f.matches(&p));
    }
}
