//! `livebase-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to validate tokens, resolve what a set of roles grants (permissions, base
//! data scope, hidden fields) and decide individual requests.

pub mod authorize;
pub mod claims;
pub mod fields;
pub mod jwt;
pub mod permissions;
pub mod roles;
pub mod scope;
pub mod user;

pub use authorize::{
    AuthorizationExplanation, AuthzError, Principal, TenantMembership, authorize, authorize_base,
    explain_authorization,
};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use fields::FieldPolicy;
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::{Action, Permission, RESOURCES};
pub use roles::{Role, RoleDefinition, RoleInput, ScopeKind, system_role, system_roles};
pub use scope::DataScope;
pub use user::{NewUser, UserAccount, UserStatus, UserUpdate, ensure_can_grant, ensure_not_self_assignment};
