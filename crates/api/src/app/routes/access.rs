use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use livebase_auth::{NewUser, RoleInput, UserUpdate};
use livebase_core::{Page, PageRequest};

use crate::app::dto::{self, ExplainQuery, UserFilter};
use crate::app::errors::ServiceResult;
use crate::app::services::access::{ROLES, USERS};
use crate::app::services::TenantServices;

pub fn roles_router() -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/explain", get(explain))
        .route("/:name", get(get_role).put(update_role).delete(delete_role))
}

pub fn users_router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user))
        .route("/:id/enable", post(enable_user))
        .route("/:id/disable", post(disable_user))
}

// -------------------------
// Roles
// -------------------------

pub async fn list_roles(svc: TenantServices) -> ServiceResult<Response> {
    let roles = svc.list_roles().await?;
    let total = roles.len() as u64;
    svc.respond_page(
        ROLES,
        Page {
            data: roles,
            total,
            current: 1,
            page_size: total.max(1) as u32,
        },
    )
}

pub async fn get_role(svc: TenantServices, Path(name): Path<String>) -> ServiceResult<Response> {
    let role = svc.get_role(&name).await?;
    svc.respond(ROLES, &role)
}

pub async fn create_role(svc: TenantServices, Json(body): Json<RoleInput>) -> ServiceResult<Response> {
    let role = svc.create_role(body).await?;
    svc.respond_created(ROLES, &role)
}

pub async fn update_role(
    svc: TenantServices,
    Path(name): Path<String>,
    Json(body): Json<RoleInput>,
) -> ServiceResult<Response> {
    let role = svc.update_role(&name, body).await?;
    svc.respond(ROLES, &role)
}

pub async fn delete_role(svc: TenantServices, Path(name): Path<String>) -> ServiceResult<Response> {
    svc.delete_role(&name).await?;
    Ok(dto::deleted(name))
}

pub async fn explain(svc: TenantServices, Query(query): Query<ExplainQuery>) -> ServiceResult<Response> {
    let explanation = svc.explain(query).await?;
    svc.respond(ROLES, &explanation)
}

// -------------------------
// Users
// -------------------------

pub async fn list_users(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<UserFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_users(filter, page).await?;
    svc.respond_page(USERS, page)
}

pub async fn get_user(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let user = svc.get_user(id.parse()?).await?;
    svc.respond(USERS, &user)
}

pub async fn create_user(svc: TenantServices, Json(body): Json<NewUser>) -> ServiceResult<Response> {
    let user = svc.create_user(body).await?;
    svc.respond_created(USERS, &user)
}

pub async fn update_user(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<UserUpdate>,
) -> ServiceResult<Response> {
    let user = svc.update_user(id.parse()?, body).await?;
    svc.respond(USERS, &user)
}

pub async fn enable_user(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let user = svc.set_user_enabled(id.parse()?, true).await?;
    svc.respond(USERS, &user)
}

pub async fn disable_user(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let user = svc.set_user_enabled(id.parse()?, false).await?;
    svc.respond(USERS, &user)
}
