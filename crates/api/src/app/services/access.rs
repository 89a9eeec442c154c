//! Roles, user accounts and the caller's own access summary.

use serde_json::{json, Value};
use tracing::{info, warn};

use livebase_auth::{
    ensure_can_grant, ensure_not_self_assignment, explain_authorization, system_role, system_roles, Action,
    AuthorizationExplanation, NewUser, Permission, Principal, Role, RoleDefinition, RoleInput,
    UserAccount, UserUpdate,
};
use livebase_bases::Base;
use livebase_core::{matches_keyword, BaseId, DomainError, Page, PageRequest, UserId, paginate};
use livebase_infra::{Repository, StoreError};

use super::TenantServices;
use crate::app::dto::{ExplainQuery, UserFilter};
use crate::app::errors::ServiceResult;

pub const ROLES: &str = "roles";
pub const USERS: &str = "users";

/// Definitions for `names`: built-in roles first, then the tenant's own.
/// Unknown names resolve to nothing.
pub async fn role_definitions(
    repo: &Repository<RoleDefinition>,
    names: &[Role],
) -> Result<Vec<RoleDefinition>, StoreError> {
    let mut defs = Vec::with_capacity(names.len());
    for name in names {
        match system_role(name.as_str()) {
            Some(def) => defs.push(def),
            None => match repo.get(name).await? {
                Some(def) => defs.push(def),
                None => warn!(role = %name, "unknown role ignored"),
            },
        }
    }
    Ok(defs)
}

/// Every role the tenant can assign.
pub async fn known_roles(repo: &Repository<RoleDefinition>) -> Result<Vec<RoleDefinition>, StoreError> {
    let mut roles = system_roles();
    roles.extend(repo.list(None).await?);
    Ok(roles)
}

impl UserFilter {
    fn matches(&self, u: &UserAccount) -> bool {
        matches_keyword(self.keyword.as_deref(), &[&u.username, &u.display_name])
            && self.status.is_none_or(|s| u.status == s)
            && self
                .role
                .as_deref()
                .is_none_or(|r| u.roles.iter().any(|role| role.as_str() == r))
            && self.base_id.is_none_or(|b| u.base_ids.contains(&b))
    }
}

impl TenantServices {
    // -------------------------
    // Roles
    // -------------------------

    pub async fn list_roles(&self) -> ServiceResult<Vec<RoleDefinition>> {
        self.require(ROLES, Action::Read)?;
        let mut roles = known_roles(&self.repo()).await?;
        roles.sort_by(|a, b| b.is_system.cmp(&a.is_system).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    pub async fn get_role(&self, name: &str) -> ServiceResult<RoleDefinition> {
        self.require(ROLES, Action::Read)?;
        self.role(name).await
    }

    async fn role(&self, name: &str) -> ServiceResult<RoleDefinition> {
        if let Some(def) = system_role(name) {
            return Ok(def);
        }
        self.find(&Role::new(name.to_string())).await
    }

    pub async fn create_role(&self, input: RoleInput) -> ServiceResult<RoleDefinition> {
        self.require(ROLES, Action::Write)?;
        let mut role = RoleDefinition::from_input(input)?;
        ensure_can_grant(self.principal(), self.field_policy(), std::slice::from_ref(&role))?;
        if self.repo::<RoleDefinition>().get(&role.name).await?.is_some() {
            return Err(DomainError::conflict(format!("role '{}' already exists", role.name)).into());
        }
        self.save(ROLES, &mut role, "created").await?;
        info!(tenant_id = %self.tenant_id(), role = %role.name, "role created");
        Ok(role)
    }

    /// Replace a tenant role's definition; the name comes from the path.
    pub async fn update_role(&self, name: &str, mut input: RoleInput) -> ServiceResult<RoleDefinition> {
        self.require(ROLES, Action::Write)?;
        if system_role(name).is_some() {
            return Err(DomainError::conflict(format!("built-in role '{name}' cannot be changed")).into());
        }
        let existing: RoleDefinition = self.find(&Role::new(name.to_string())).await?;
        input.name = name.to_string();
        let mut role = RoleDefinition::from_input(input)?;
        ensure_can_grant(self.principal(), self.field_policy(), std::slice::from_ref(&role))?;
        role.version = existing.version;
        self.save(ROLES, &mut role, "updated").await?;
        info!(tenant_id = %self.tenant_id(), role = %role.name, "role updated");
        Ok(role)
    }

    pub async fn delete_role(&self, name: &str) -> ServiceResult<()> {
        self.require(ROLES, Action::Delete)?;
        if system_role(name).is_some() {
            return Err(DomainError::conflict(format!("built-in role '{name}' cannot be deleted")).into());
        }
        let role: RoleDefinition = self.find(&Role::new(name.to_string())).await?;
        let holders = self
            .list_all::<UserAccount>()
            .await?
            .iter()
            .filter(|u| u.roles.contains(&role.name))
            .count();
        if holders > 0 {
            return Err(DomainError::conflict(format!(
                "role '{name}' is assigned to {holders} user(s)"
            ))
            .into());
        }
        self.remove(ROLES, &role).await?;
        info!(tenant_id = %self.tenant_id(), role = %name, "role deleted");
        Ok(())
    }

    /// Why a permission is granted or denied, for the caller or another user.
    pub async fn explain(&self, query: ExplainQuery) -> ServiceResult<AuthorizationExplanation> {
        self.require(ROLES, Action::Read)?;
        let required = Permission::parse(&query.permission)?;
        let known = known_roles(&self.repo()).await?;
        let subject = match query.user_id {
            Some(id) if id != self.user_id() => {
                self.require(USERS, Action::Read)?;
                let user: UserAccount = self.find(&id).await?;
                self.principal_for(&user).await?
            }
            _ => self.principal().clone(),
        };
        Ok(explain_authorization(&subject, &required, &known))
    }

    async fn principal_for(&self, user: &UserAccount) -> ServiceResult<Principal> {
        let defs = role_definitions(&self.repo(), &user.roles).await?;
        Ok(Principal::resolve(
            user.id,
            self.tenant_id(),
            &defs,
            user.base_ids.iter().copied(),
        ))
    }

    // -------------------------
    // Users
    // -------------------------

    pub async fn list_users(&self, filter: UserFilter, page: PageRequest) -> ServiceResult<Page<UserAccount>> {
        self.require(USERS, Action::Read)?;
        let mut users: Vec<UserAccount> = self.list_all().await?;
        users.retain(|u| filter.matches(u));
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(paginate(users, &page))
    }

    pub async fn get_user(&self, id: UserId) -> ServiceResult<UserAccount> {
        self.require(USERS, Action::Read)?;
        self.find(&id).await
    }

    /// Roles must exist and be grantable by the caller; bases must exist and
    /// lie inside the caller's scope.
    async fn check_assignment(&self, user: &UserAccount) -> ServiceResult<()> {
        let defs = role_definitions(&self.repo(), &user.roles).await?;
        if let Some(missing) = user
            .roles
            .iter()
            .find(|r| !defs.iter().any(|d| &d.name == *r))
        {
            return Err(DomainError::validation(format!("unknown role '{missing}'")).into());
        }
        ensure_can_grant(self.principal(), self.field_policy(), &defs)?;
        for base_id in &user.base_ids {
            self.require_base(*base_id)?;
            self.find::<Base>(base_id).await?;
        }
        Ok(())
    }

    pub async fn create_user(&self, input: NewUser) -> ServiceResult<UserAccount> {
        self.require(USERS, Action::Write)?;
        let mut user = UserAccount::create(input, self.now())?;
        self.check_assignment(&user).await?;
        let existing: Vec<UserAccount> = self.list_all().await?;
        if existing.iter().any(|u| u.id == user.id) {
            return Err(DomainError::conflict(format!("user {} already exists", user.id)).into());
        }
        if existing.iter().any(|u| u.username == user.username) {
            return Err(DomainError::conflict(format!("username '{}' is taken", user.username)).into());
        }
        self.save(USERS, &mut user, "created").await?;
        info!(tenant_id = %self.tenant_id(), user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn update_user(&self, id: UserId, patch: UserUpdate) -> ServiceResult<UserAccount> {
        self.require(USERS, Action::Write)?;
        let mut user: UserAccount = self.find(&id).await?;
        let access_changed = patch.roles.is_some() || patch.base_ids.is_some();
        if access_changed {
            ensure_not_self_assignment(self.principal(), id)?;
        }
        user.update(patch, self.now())?;
        if access_changed {
            self.check_assignment(&user).await?;
        }
        self.save(USERS, &mut user, "updated").await?;
        info!(tenant_id = %self.tenant_id(), user_id = %user.id, access_changed, "user updated");
        Ok(user)
    }

    pub async fn set_user_enabled(&self, id: UserId, enabled: bool) -> ServiceResult<UserAccount> {
        self.require(USERS, Action::Write)?;
        let mut user: UserAccount = self.find(&id).await?;
        let action = if enabled {
            user.enable(self.now())?;
            "enabled"
        } else {
            user.disable(self.user_id(), self.now())?;
            "disabled"
        };
        self.save(USERS, &mut user, action).await?;
        info!(tenant_id = %self.tenant_id(), user_id = %user.id, action, "user status changed");
        Ok(user)
    }

    // -------------------------
    // Whoami
    // -------------------------

    pub fn whoami(&self) -> Value {
        let principal = self.principal();
        let bases: Option<Vec<BaseId>> = principal.scope.base_filter();
        json!({
            "tenant_id": self.tenant_id(),
            "principal_id": principal.principal_id,
            "roles": principal.membership.roles,
            "scope": principal.scope,
            "base_ids": bases,
            "permissions": principal.membership.permissions,
            "is_admin": principal.is_admin(),
        })
    }
}
