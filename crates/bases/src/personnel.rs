use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, DomainError, DomainResult, Timestamps, entity_id, impl_record, matches_keyword,
    optional_text, required_text,
};

entity_id!(PersonnelId, "PersonnelId");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Anchor,
    Operator,
    WarehouseKeeper,
    Sales,
    Driver,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersonnelStatus {
    #[default]
    Active,
    Left,
}

/// Staff working at a base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personnel {
    pub id: PersonnelId,
    pub base_id: BaseId,
    pub name: String,
    pub phone: Option<String>,
    pub position: Position,
    pub status: PersonnelStatus,
    pub joined_on: Option<NaiveDate>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Personnel, PersonnelId, "personnel", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct PersonnelInput {
    pub base_id: BaseId,
    pub name: String,
    pub phone: Option<String>,
    pub position: Position,
    pub joined_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonnelUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub position: Option<Position>,
    pub status: Option<PersonnelStatus>,
    pub joined_on: Option<NaiveDate>,
}

fn validate_phone(phone: Option<&str>) -> DomainResult<Option<String>> {
    let phone = optional_text("phone", phone, 32)?;
    if let Some(p) = &phone {
        if !p
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        {
            return Err(DomainError::validation("phone may only contain digits, '+', '-', spaces and parentheses"));
        }
    }
    Ok(phone)
}

impl Personnel {
    pub fn create(input: PersonnelInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: PersonnelId::new(),
            base_id: input.base_id,
            name: required_text("name", &input.name, 64)?,
            phone: validate_phone(input.phone.as_deref())?,
            position: input.position,
            status: PersonnelStatus::Active,
            joined_on: input.joined_on,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: PersonnelUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = required_text("name", &name, 64)?;
        }
        if patch.phone.is_some() {
            self.phone = validate_phone(patch.phone.as_deref())?;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.joined_on.is_some() {
            self.joined_on = patch.joined_on;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == PersonnelStatus::Active
    }

    /// Only active personnel in the warehouse keeper position may be
    /// assigned to a location.
    pub fn ensure_can_keep(&self) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::invariant(format!("{} has left", self.name)));
        }
        if self.position != Position::WarehouseKeeper {
            return Err(DomainError::invariant(format!(
                "{} is not a warehouse keeper",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonnelFilter {
    pub base_id: Option<BaseId>,
    pub position: Option<Position>,
    pub status: Option<PersonnelStatus>,
    pub keyword: Option<String>,
}

impl PersonnelFilter {
    pub fn matches(&self, p: &Personnel) -> bool {
        self.base_id.is_none_or(|b| b == p.base_id)
            && self.position.is_none_or(|x| x == p.position)
            && self.status.is_none_or(|s| s == p.status)
            && matches_keyword(
                self.keyword.as_deref(),
                &[&p.name, p.phone.as_deref().unwrap_or_default()],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeper() -> Personnel {
        Personnel::create(
            PersonnelInput {
                base_id: BaseId::new(),
                name: "Zhang San".into(),
                phone: Some("+86 138-0000-0000".into()),
                position: Position::WarehouseKeeper,
                joined_on: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_bad_phone() {
        let input = PersonnelInput {
            base_id: BaseId::new(),
            name: "A".into(),
            phone: Some("call me".into()),
            position: Position::Anchor,
            joined_on: None,
        };
        assert!(Personnel::create(input, Utc::now()).is_err());
    }

    #[test]
    fn keepers_must_be_active_and_positioned() {
        let mut p = keeper();
        p.ensure_can_keep().unwrap();

        p.update(
            PersonnelUpdate {
                status: Some(PersonnelStatus::Left),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert!(p.ensure_can_keep().is_err());

        let mut p = keeper();
        p.position = Position::Driver;
        assert!(p.ensure_can_keep().is_err());
    }
}
