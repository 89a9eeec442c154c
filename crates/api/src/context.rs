use livebase_auth::{DataScope, FieldPolicy, Principal, Role};
use livebase_core::{TenantId, UserId};

/// Tenant context for a request.
///
/// This is immutable and must be present for all domain routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request: the resolved principal plus the field
/// policy of its roles.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalContext {
    principal: Principal,
    fields: FieldPolicy,
}

impl PrincipalContext {
    pub fn new(principal: Principal, fields: FieldPolicy) -> Self {
        Self { principal, fields }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> UserId {
        self.principal.principal_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.membership.roles
    }

    pub fn scope(&self) -> &DataScope {
        &self.principal.scope
    }

    pub fn fields(&self) -> &FieldPolicy {
        &self.fields
    }
}
