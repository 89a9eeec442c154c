use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use livebase_auth::{FieldPolicy, JwtValidator, Principal, UserAccount};
use livebase_infra::{DocumentStore, Repository};

use crate::app::errors::{json_error, ServiceError};
use crate::app::services::access::role_definitions;
use crate::context::{PrincipalContext, TenantContext};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub store: Arc<dyn DocumentStore>,
}

fn unauthorized(message: &str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", message).into_response()
}

/// Validate the bearer token and resolve the principal for the request.
///
/// A stored user account overrides the token's roles and supplies the
/// assigned bases; disabled accounts are rejected.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return unauthorized("missing bearer token");
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "rejected token");
            return unauthorized("invalid token");
        }
    };

    let users = Repository::<UserAccount>::new(state.store.clone(), claims.tenant_id);
    let (roles, bases) = match users.get(&claims.sub).await {
        Ok(Some(user)) if !user.is_active() => {
            debug!(tenant_id = %claims.tenant_id, principal_id = %claims.sub, "disabled user");
            return unauthorized("user is disabled");
        }
        Ok(Some(user)) => (user.roles, user.base_ids.into_iter().collect::<Vec<_>>()),
        Ok(None) => (claims.roles.clone(), Vec::new()),
        Err(e) => {
            return ServiceError::from(e).into_response();
        }
    };

    let defs = match role_definitions(
        &Repository::new(state.store.clone(), claims.tenant_id),
        &roles,
    )
    .await
    {
        Ok(defs) => defs,
        Err(e) => return ServiceError::from(e).into_response(),
    };

    let principal = Principal::resolve(claims.sub, claims.tenant_id, &defs, bases);
    let fields = FieldPolicy::from_roles(&defs);

    req.extensions_mut()
        .insert(TenantContext::new(claims.tenant_id));
    req.extensions_mut()
        .insert(PrincipalContext::new(principal, fields));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
