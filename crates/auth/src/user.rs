//! Back-office user accounts: role and base assignment.
//!
//! Identity itself is external (the token subject); this record decides what
//! the subject may do inside the tenant and prevents privilege escalation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{BaseId, DomainError, DomainResult, Timestamps, UserId, required_text};

use crate::roles::ScopeKind;
use crate::{DataScope, FieldPolicy, Principal, Role, RoleDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// User is active and can authenticate/transact.
    #[default]
    Active,
    /// User is disabled; tokens for it are rejected.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub base_ids: BTreeSet<BaseId>,
    pub status: UserStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Token subject; generated when omitted.
    pub id: Option<UserId>,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub base_ids: Vec<BaseId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub roles: Option<Vec<String>>,
    pub base_ids: Option<Vec<BaseId>>,
}

fn validate_username(raw: &str) -> DomainResult<String> {
    let name = raw.trim().to_ascii_lowercase();
    if name.len() < 3
        || name.len() > 32
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(DomainError::validation(
            "username must be 3-32 characters of a-z, 0-9, '_', '.' and '-'",
        ));
    }
    Ok(name)
}

fn role_names(raw: &[String]) -> DomainResult<Vec<Role>> {
    let mut seen = BTreeSet::new();
    let mut roles = Vec::new();
    for r in raw {
        let name = r.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(DomainError::validation("role names must not be empty"));
        }
        if seen.insert(name.clone()) {
            roles.push(Role::new(name));
        }
    }
    Ok(roles)
}

impl UserAccount {
    pub fn create(input: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: input.id.unwrap_or_default(),
            username: validate_username(&input.username)?,
            display_name: required_text("display_name", &input.display_name, 64)?,
            roles: role_names(&input.roles)?,
            base_ids: input.base_ids.into_iter().collect(),
            status: UserStatus::Active,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: UserUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.display_name {
            self.display_name = required_text("display_name", &name, 64)?;
        }
        if let Some(roles) = patch.roles {
            self.roles = role_names(&roles)?;
        }
        if let Some(bases) = patch.base_ids {
            self.base_ids = bases.into_iter().collect();
        }
        self.timestamps.touch(now);
        Ok(())
    }

    /// Principals cannot lock themselves out.
    pub fn disable(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if actor == self.id {
            return Err(DomainError::invariant("you cannot disable your own account"));
        }
        if self.status == UserStatus::Disabled {
            return Err(DomainError::invariant("user is already disabled"));
        }
        self.status = UserStatus::Disabled;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn enable(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == UserStatus::Active {
            return Err(DomainError::invariant("user is already active"));
        }
        self.status = UserStatus::Active;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

livebase_core::impl_record!(UserAccount, UserId, "users");

/// Privilege escalation guard: a non-admin actor may only hand out roles that
/// are no wider than itself. Every permission must already be held, tenant-wide
/// scope needs tenant-wide scope, and no field the actor cannot see may be
/// revealed.
pub fn ensure_can_grant(
    actor: &Principal,
    actor_fields: &FieldPolicy,
    granted: &[RoleDefinition],
) -> DomainResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    for role in granted {
        if let Some(missing) = role.permissions.iter().find(|p| !actor.has(p)) {
            return Err(DomainError::forbidden(format!(
                "cannot grant role '{}': you lack permission '{}'",
                role.name, missing
            )));
        }
        if role.data_scope == ScopeKind::All && actor.scope != DataScope::All {
            return Err(DomainError::forbidden(format!(
                "cannot grant role '{}': it reaches bases outside your scope",
                role.name
            )));
        }
        if let Some((resource, field)) = revealed_field(actor_fields, role) {
            return Err(DomainError::forbidden(format!(
                "cannot grant role '{}': it reveals '{resource}.{field}'",
                role.name
            )));
        }
    }
    Ok(())
}

fn revealed_field<'a>(
    actor_fields: &'a FieldPolicy,
    role: &RoleDefinition,
) -> Option<(&'a str, &'a str)> {
    actor_fields.hidden().find_map(|(resource, fields)| {
        let role_hides = role.hidden_fields.get(resource);
        fields
            .iter()
            .find(|f| !role_hides.is_some_and(|h| h.contains(*f)))
            .map(|f| (resource, f.as_str()))
    })
}

/// Non-admins may not change the roles or bases of their own account.
pub fn ensure_not_self_assignment(actor: &Principal, target: UserId) -> DomainResult<()> {
    if actor.principal_id == target && !actor.is_admin() {
        return Err(DomainError::forbidden(
            "you cannot change your own roles or bases",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::system_role;
    use crate::Permission;
    use livebase_core::TenantId;

    fn new_user(roles: &[&str]) -> NewUser {
        NewUser {
            id: None,
            username: " Li.Wei ".to_string(),
            display_name: "Li Wei".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            base_ids: vec![],
        }
    }

    #[test]
    fn create_normalises_and_dedups() {
        let u = UserAccount::create(new_user(&["Sales", "sales", "viewer"]), Utc::now()).unwrap();
        assert_eq!(u.username, "li.wei");
        assert_eq!(u.roles, vec![Role::new("sales"), Role::new("viewer")]);
        assert!(u.is_active());
    }

    #[test]
    fn invalid_username_is_rejected() {
        let mut input = new_user(&[]);
        input.username = "a b".into();
        assert!(UserAccount::create(input, Utc::now()).is_err());
    }

    #[test]
    fn cannot_disable_self() {
        let mut u = UserAccount::create(new_user(&[]), Utc::now()).unwrap();
        let own = u.id;
        assert!(u.disable(own, Utc::now()).is_err());
        u.disable(UserId::new(), Utc::now()).unwrap();
        assert!(!u.is_active());
        assert!(u.disable(UserId::new(), Utc::now()).is_err());
        u.enable(Utc::now()).unwrap();
    }

    fn resolve(roles: &[RoleDefinition]) -> (Principal, FieldPolicy) {
        let principal = Principal::resolve(UserId::new(), TenantId::new(), roles, [BaseId::new()]);
        (principal, FieldPolicy::from_roles(roles))
    }

    fn custom(name: &str, permissions: &[&'static str], scope: ScopeKind) -> RoleDefinition {
        RoleDefinition {
            name: Role::new(name.to_string()),
            display_name: name.to_string(),
            permissions: permissions.iter().map(|p| Permission::new(*p)).collect(),
            data_scope: scope,
            hidden_fields: Default::default(),
            is_system: false,
            version: 0,
        }
    }

    #[test]
    fn escalation_is_prevented_for_non_admins() {
        let (manager, fields) = resolve(&[system_role("manager").unwrap()]);
        let admin_role = system_role("admin").unwrap();
        let sales_role = system_role("sales").unwrap();

        assert!(ensure_can_grant(&manager, &fields, &[sales_role.clone()]).is_ok());
        assert!(ensure_can_grant(&manager, &fields, &[admin_role.clone()]).is_err());

        let (admin, fields) = resolve(&[admin_role.clone()]);
        assert!(ensure_can_grant(&admin, &fields, &[admin_role]).is_ok());
    }

    #[test]
    fn base_scoped_actor_cannot_grant_tenant_wide_scope() {
        let local = custom("local_admin", &["users.*", "roles.*"], ScopeKind::AssignedBases);
        let (actor, fields) = resolve(&[local]);
        assert!(matches!(actor.scope, DataScope::Bases(_)));

        let wide = custom("wide", &["users.read"], ScopeKind::All);
        let err = ensure_can_grant(&actor, &fields, &[wide]).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let narrow = custom("narrow", &["users.read"], ScopeKind::AssignedBases);
        assert!(ensure_can_grant(&actor, &fields, &[narrow]).is_ok());
    }

    #[test]
    fn cannot_grant_a_role_that_reveals_hidden_fields() {
        let mut warehouse = system_role("warehouse").unwrap();
        warehouse.permissions.insert(Permission::new("roles.*"));
        let (actor, fields) = resolve(&[warehouse.clone()]);
        assert!(fields.hidden_for("goods").is_some());

        let mut revealing = custom("goods_reader", &["goods.read"], ScopeKind::AssignedBases);
        assert!(ensure_can_grant(&actor, &fields, &[revealing.clone()]).is_err());

        revealing.hidden_fields = warehouse.hidden_fields.clone();
        assert!(ensure_can_grant(&actor, &fields, &[revealing]).is_ok());
    }

    #[test]
    fn only_admins_reassign_themselves() {
        let (manager, _) = resolve(&[system_role("manager").unwrap()]);
        assert!(ensure_not_self_assignment(&manager, manager.principal_id).is_err());
        assert!(ensure_not_self_assignment(&manager, UserId::new()).is_ok());

        let (admin, _) = resolve(&[system_role("admin").unwrap()]);
        assert!(ensure_not_self_assignment(&admin, admin.principal_id).is_ok());
    }
}
