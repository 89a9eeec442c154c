use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use livebase_core::{BaseId, TenantId, UserId};

use crate::{DataScope, Permission, Role, RoleDefinition};

/// A principal's membership in a tenant.
///
/// This is an authorization boundary object: it states *which tenant* the
/// principal is acting within and which roles/permissions are granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: BTreeSet<Permission>,
}

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API derives it
/// from token claims plus the tenant's role definitions and user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: UserId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
    pub scope: DataScope,
}

impl Principal {
    /// Resolve from role definitions; `assigned_bases` applies when no role
    /// has tenant-wide scope.
    pub fn resolve(
        principal_id: UserId,
        tenant_id: TenantId,
        roles: &[RoleDefinition],
        assigned_bases: impl IntoIterator<Item = BaseId>,
    ) -> Self {
        let permissions = roles
            .iter()
            .flat_map(|r| r.permissions.iter().cloned())
            .collect();
        let scope = if roles
            .iter()
            .any(|r| r.data_scope == crate::roles::ScopeKind::All)
        {
            DataScope::All
        } else {
            DataScope::Bases(assigned_bases.into_iter().collect())
        };
        Self {
            principal_id,
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: roles.iter().map(|r| r.name.clone()).collect(),
                permissions,
            },
            scope,
        }
    }

    pub fn has(&self, required: &Permission) -> bool {
        self.membership.permissions.iter().any(|p| p.grants(required))
    }

    pub fn is_admin(&self) -> bool {
        self.membership.permissions.iter().any(Permission::is_wildcard)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: base {0} is outside your data scope")]
    OutOfScope(BaseId),
}

/// Authorize a principal within its active tenant context.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }
    if principal.has(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Check that writes into `base_id` are within the principal's data scope.
pub fn authorize_base(principal: &Principal, base_id: BaseId) -> Result<(), AuthzError> {
    if principal.scope.allows(base_id) {
        Ok(())
    } else {
        Err(AuthzError::OutOfScope(base_id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision, answering "why was this
/// request allowed/denied?" on the role administration page.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub principal_id: UserId,
    pub roles: Vec<String>,
    pub effective_permissions: Vec<String>,
    pub data_scope: DataScope,
    /// Roles of the tenant that would grant the permission.
    pub granting_roles: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Explain a decision for `principal` given every role known to the tenant.
pub fn explain_authorization(
    principal: &Principal,
    required: &Permission,
    known_roles: &[RoleDefinition],
) -> AuthorizationExplanation {
    let roles: Vec<String> = principal
        .membership
        .roles
        .iter()
        .map(|r| r.as_str().to_string())
        .collect();
    let effective_permissions: Vec<String> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    let granting_roles: Vec<String> = known_roles
        .iter()
        .filter(|r| r.grants(required))
        .map(|r| r.name.as_str().to_string())
        .collect();

    let (granted, reason, suggestions) = match authorize(principal, required) {
        Ok(()) => {
            let via = principal
                .membership
                .permissions
                .iter()
                .find(|p| p.grants(required))
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            (true, format!("granted by permission '{via}'"), Vec::new())
        }
        Err(AuthzError::TenantMismatch) => (
            false,
            "principal is active in a different tenant than its membership".to_string(),
            vec!["request a token for the tenant you are working in".to_string()],
        ),
        Err(_) => {
            let mut suggestions = Vec::new();
            if !granting_roles.is_empty() {
                suggestions.push(format!(
                    "assign one of the roles {:?} to the user",
                    granting_roles
                ));
            }
            suggestions.push(format!(
                "add '{}' to one of the user's roles {:?}",
                required, roles
            ));
            (
                false,
                format!("missing permission '{required}'"),
                suggestions,
            )
        }
    };

    AuthorizationExplanation {
        required_permission: required.as_str().to_string(),
        granted,
        reason,
        principal_id: principal.principal_id,
        roles,
        effective_permissions,
        data_scope: principal.scope.clone(),
        granting_roles,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{system_role, system_roles};

    fn principal(role: &str, bases: Vec<BaseId>) -> Principal {
        Principal::resolve(
            UserId::new(),
            TenantId::new(),
            &[system_role(role).unwrap()],
            bases,
        )
    }

    #[test]
    fn admin_is_granted_everything_with_full_scope() {
        let p = principal("admin", vec![]);
        assert!(authorize(&p, &Permission::delete("roles")).is_ok());
        assert!(p.is_admin());
        assert_eq!(p.scope, DataScope::All);
    }

    #[test]
    fn scoped_role_is_limited_to_assigned_bases() {
        let base = BaseId::new();
        let p = principal("warehouse", vec![base]);
        assert!(authorize(&p, &Permission::write("stock_outs")).is_ok());
        assert_eq!(
            authorize(&p, &Permission::write("purchases")),
            Err(AuthzError::Forbidden("purchases.write".into()))
        );
        assert!(authorize_base(&p, base).is_ok());
        assert!(matches!(authorize_base(&p, BaseId::new()), Err(AuthzError::OutOfScope(_))));
    }

    #[test]
    fn tenant_mismatch_is_rejected() {
        let mut p = principal("admin", vec![]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(
            authorize(&p, &Permission::read("goods")),
            Err(AuthzError::TenantMismatch)
        );
    }

    #[test]
    fn explanation_lists_granting_roles() {
        let p = principal("sales", vec![]);
        let e = explain_authorization(&p, &Permission::write("purchases"), &system_roles());
        assert!(!e.granted);
        assert!(e.granting_roles.contains(&"purchaser".to_string()));
        assert!(e.granting_roles.contains(&"admin".to_string()));
        assert!(!e.suggestions.is_empty());

        let e = explain_authorization(&p, &Permission::write("visits"), &system_roles());
        assert!(e.granted);
        assert_eq!(e.reason, "granted by permission 'visits.write'");
    }
}
