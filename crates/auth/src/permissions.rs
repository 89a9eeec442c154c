use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use livebase_core::{DomainError, DomainResult};

/// Every resource a permission can name.
pub const RESOURCES: &[&str] = &[
    "bases",
    "sub_districts",
    "locations",
    "personnel",
    "warehouse_keepers",
    "goods",
    "parties",
    "points",
    "visits",
    "purchases",
    "arrivals",
    "payables",
    "inventory",
    "stock_outs",
    "point_orders",
    "sales",
    "currency_rates",
    "settings",
    "translations",
    "roles",
    "users",
    "stats",
    "uploads",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }

    pub const ALL: [Action; 3] = [Action::Read, Action::Write, Action::Delete];
}

/// Permission identifier.
///
/// Permissions are `"<resource>.<action>"` strings (e.g. `"purchases.write"`).
/// Two wildcard shapes are understood by [`Permission::grants`]: `"*"` grants
/// everything and `"<resource>.*"` grants every action on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn of(resource: &str, action: Action) -> Self {
        Self(Cow::Owned(format!("{resource}.{}", action.as_str())))
    }

    pub fn read(resource: &str) -> Self {
        Self::of(resource, Action::Read)
    }

    pub fn write(resource: &str) -> Self {
        Self::of(resource, Action::Write)
    }

    pub fn delete(resource: &str) -> Self {
        Self::of(resource, Action::Delete)
    }

    /// Parse and validate a permission supplied by a client (role editing).
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self::new("*"));
        }
        let (resource, action) = raw
            .split_once('.')
            .ok_or_else(|| DomainError::validation(format!("permission '{raw}' must be resource.action")))?;
        if !RESOURCES.contains(&resource) {
            return Err(DomainError::validation(format!("unknown resource '{resource}'")));
        }
        if !matches!(action, "*" | "read" | "write" | "delete") {
            return Err(DomainError::validation(format!("unknown action '{action}'")));
        }
        Ok(Self(Cow::Owned(raw.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    pub fn resource(&self) -> Option<&str> {
        self.as_str().split_once('.').map(|(r, _)| r)
    }

    /// Does holding `self` satisfy a check for `required`?
    pub fn grants(&self, required: &Permission) -> bool {
        if self.is_wildcard() || self == required {
            return true;
        }
        match (self.as_str().split_once('.'), required.resource()) {
            (Some((res, "*")), Some(req_res)) => res == req_res,
            _ => false,
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
