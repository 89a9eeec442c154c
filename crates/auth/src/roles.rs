use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use livebase_core::{DomainError, DomainResult, Entity, Record, required_text};

use crate::permissions::{Action, Permission, RESOURCES};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; what a role grants is described by
/// a [`RoleDefinition`] (built-in or stored per tenant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How far a role's data visibility reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    All,
    AssignedBases,
}

/// What a role grants: permissions, data scope and per-resource hidden fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: Role,
    pub display_name: String,
    pub permissions: BTreeSet<Permission>,
    pub data_scope: ScopeKind,
    /// resource → fields this role must not see.
    #[serde(default)]
    pub hidden_fields: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub version: u64,
}

/// Client-supplied role content (create/update).
#[derive(Debug, Clone, Deserialize)]
pub struct RoleInput {
    pub name: String,
    pub display_name: String,
    pub permissions: Vec<String>,
    pub data_scope: ScopeKind,
    #[serde(default)]
    pub hidden_fields: BTreeMap<String, Vec<String>>,
}

impl RoleDefinition {
    /// Validate a tenant-defined role.
    pub fn from_input(input: RoleInput) -> DomainResult<Self> {
        let name = input.name.trim().to_ascii_lowercase();
        if name.is_empty()
            || name.len() > 32
            || !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(DomainError::validation(
                "role name must be 1-32 characters of a-z, 0-9 and '_'",
            ));
        }
        if system_role(&name).is_some() {
            return Err(DomainError::conflict(format!("'{name}' is a built-in role")));
        }
        let display_name = required_text("display_name", &input.display_name, 64)?;

        let permissions = input
            .permissions
            .iter()
            .map(|p| Permission::parse(p))
            .collect::<DomainResult<BTreeSet<_>>>()?;

        let mut hidden_fields = BTreeMap::new();
        for (resource, fields) in input.hidden_fields {
            if !RESOURCES.contains(&resource.as_str()) {
                return Err(DomainError::validation(format!("unknown resource '{resource}'")));
            }
            let fields: BTreeSet<String> = fields
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            if !fields.is_empty() {
                hidden_fields.insert(resource, fields);
            }
        }

        Ok(Self {
            name: Role::new(name),
            display_name,
            permissions,
            data_scope: input.data_scope,
            hidden_fields,
            is_system: false,
            version: 0,
        })
    }

    pub fn grants(&self, required: &Permission) -> bool {
        self.permissions.iter().any(|p| p.grants(required))
    }
}

impl Entity for RoleDefinition {
    type Id = Role;

    fn id(&self) -> &Self::Id {
        &self.name
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Record for RoleDefinition {
    const KIND: &'static str = "roles";

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in roles
// ─────────────────────────────────────────────────────────────────────────────

const PRICE_FIELDS: &[(&str, &[&str])] = &[
    ("goods", &["purchase_price"]),
    ("purchases", &["unit_price", "total_amount"]),
    ("arrivals", &["unit_price", "amount"]),
    ("payables", &["amount", "paid", "outstanding"]),
    ("stats", &["stock_value", "payables_outstanding"]),
];

fn perms(resources: &[&str], actions: &[Action]) -> BTreeSet<Permission> {
    resources
        .iter()
        .flat_map(|r| actions.iter().map(move |a| Permission::of(r, *a)))
        .collect()
}

fn hidden(entries: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
    entries
        .iter()
        .map(|(res, fields)| {
            (
                res.to_string(),
                fields.iter().map(|f| f.to_string()).collect(),
            )
        })
        .collect()
}

fn builtin(
    name: &'static str,
    display_name: &str,
    permissions: BTreeSet<Permission>,
    data_scope: ScopeKind,
    hidden_fields: BTreeMap<String, BTreeSet<String>>,
) -> RoleDefinition {
    RoleDefinition {
        name: Role::new(name),
        display_name: display_name.to_string(),
        permissions,
        data_scope,
        hidden_fields,
        is_system: true,
        version: 0,
    }
}

/// Built-in role definitions, in display order.
pub fn system_roles() -> Vec<RoleDefinition> {
    let rw = [Action::Read, Action::Write];
    let business: Vec<&str> = RESOURCES
        .iter()
        .copied()
        .filter(|r| !matches!(*r, "roles" | "users"))
        .collect();

    let mut manager = perms(&business, &Action::ALL);
    manager.extend(perms(&["roles", "users"], &rw));

    let mut purchaser = perms(
        &["purchases", "arrivals", "payables", "goods", "parties", "currency_rates"],
        &rw,
    );
    purchaser.extend(perms(&["inventory", "bases", "locations", "stats", "uploads"], &[Action::Read]));
    purchaser.insert(Permission::write("uploads"));

    let mut warehouse = perms(
        &["inventory", "stock_outs", "arrivals", "locations", "warehouse_keepers"],
        &rw,
    );
    warehouse.extend(perms(
        &["goods", "purchases", "point_orders", "bases", "personnel", "points"],
        &[Action::Read],
    ));

    let mut sales = perms(&["points", "visits", "point_orders", "sales", "parties"], &rw);
    sales.extend(perms(
        &["goods", "inventory", "bases", "sub_districts", "personnel", "stats"],
        &[Action::Read],
    ));
    sales.insert(Permission::write("uploads"));

    let viewer = perms(&business, &[Action::Read]);

    vec![
        builtin(
            "admin",
            "Administrator",
            BTreeSet::from([Permission::new("*")]),
            ScopeKind::All,
            BTreeMap::new(),
        ),
        builtin("manager", "Manager", manager, ScopeKind::All, BTreeMap::new()),
        builtin(
            "purchaser",
            "Purchaser",
            purchaser,
            ScopeKind::AssignedBases,
            BTreeMap::new(),
        ),
        builtin(
            "warehouse",
            "Warehouse staff",
            warehouse,
            ScopeKind::AssignedBases,
            hidden(PRICE_FIELDS),
        ),
        builtin(
            "sales",
            "Sales staff",
            sales,
            ScopeKind::AssignedBases,
            hidden(PRICE_FIELDS),
        ),
        builtin(
            "viewer",
            "Viewer",
            viewer,
            ScopeKind::AssignedBases,
            hidden(PRICE_FIELDS),
        ),
    ]
}

pub fn system_role(name: &str) -> Option<RoleDefinition> {
    system_roles().into_iter().find(|r| r.name.as_str() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, permissions: &[&str]) -> RoleInput {
        RoleInput {
            name: name.to_string(),
            display_name: "Custom".to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            data_scope: ScopeKind::AssignedBases,
            hidden_fields: BTreeMap::from([("goods".to_string(), vec!["purchase_price".to_string()])]),
        }
    }

    #[test]
    fn builtin_roles_have_expected_shape() {
        let admin = system_role("admin").unwrap();
        assert!(admin.grants(&Permission::delete("users")));
        assert_eq!(admin.data_scope, ScopeKind::All);

        let manager = system_role("manager").unwrap();
        assert!(manager.grants(&Permission::delete("purchases")));
        assert!(manager.grants(&Permission::write("users")));
        assert!(!manager.grants(&Permission::delete("users")));

        let sales = system_role("sales").unwrap();
        assert!(sales.grants(&Permission::write("point_orders")));
        assert!(!sales.grants(&Permission::write("purchases")));
        assert!(sales.hidden_fields["goods"].contains("purchase_price"));
    }

    #[test]
    fn custom_role_is_validated() {
        let role = RoleDefinition::from_input(input("Auditor", &["payables.read", "purchases.*"])).unwrap();
        assert_eq!(role.name.as_str(), "auditor");
        assert!(role.grants(&Permission::write("purchases")));
        assert!(!role.is_system);

        assert!(RoleDefinition::from_input(input("admin", &[])).is_err());
        assert!(RoleDefinition::from_input(input("bad name", &[])).is_err());
        assert!(RoleDefinition::from_input(input("x", &["nope.read"])).is_err());
    }
}
