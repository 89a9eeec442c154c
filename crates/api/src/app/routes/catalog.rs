use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use livebase_core::PageRequest;
use livebase_parties::{PartyFilter, PartyInput, PartyUpdate};
use livebase_products::{GoodsFilter, GoodsInput, GoodsUpdate};

use crate::app::dto;
use crate::app::errors::ServiceResult;
use crate::app::services::catalog::{GOODS, PARTIES};
use crate::app::services::TenantServices;

pub fn goods_router() -> Router {
    Router::new()
        .route("/", get(list_goods).post(create_goods))
        .route("/:id", get(get_goods).put(update_goods).delete(delete_goods))
        .route("/:id/discontinue", post(discontinue_goods))
        .route("/:id/reactivate", post(reactivate_goods))
}

pub fn parties_router() -> Router {
    Router::new()
        .route("/", get(list_parties).post(register_party))
        .route("/:id", get(get_party).put(update_party))
        .route("/:id/suspend", post(suspend_party))
        .route("/:id/reactivate", post(reactivate_party))
}

// -------------------------
// Goods
// -------------------------

pub async fn list_goods(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<GoodsFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_goods(filter, page).await?;
    svc.respond_page(GOODS, page)
}

pub async fn get_goods(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let goods = svc.get_goods(id.parse()?).await?;
    svc.respond(GOODS, &goods)
}

pub async fn create_goods(svc: TenantServices, Json(body): Json<GoodsInput>) -> ServiceResult<Response> {
    let goods = svc.create_goods(body).await?;
    svc.respond_created(GOODS, &goods)
}

pub async fn update_goods(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<GoodsUpdate>,
) -> ServiceResult<Response> {
    let goods = svc.update_goods(id.parse()?, body).await?;
    svc.respond(GOODS, &goods)
}

pub async fn discontinue_goods(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let goods = svc.set_goods_active(id.parse()?, false).await?;
    svc.respond(GOODS, &goods)
}

pub async fn reactivate_goods(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let goods = svc.set_goods_active(id.parse()?, true).await?;
    svc.respond(GOODS, &goods)
}

pub async fn delete_goods(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_goods(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Parties
// -------------------------

pub async fn list_parties(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<PartyFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_parties(filter, page).await?;
    svc.respond_page(PARTIES, page)
}

pub async fn get_party(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let party = svc.get_party(id.parse()?).await?;
    svc.respond(PARTIES, &party)
}

pub async fn register_party(svc: TenantServices, Json(body): Json<PartyInput>) -> ServiceResult<Response> {
    let party = svc.register_party(body).await?;
    svc.respond_created(PARTIES, &party)
}

pub async fn update_party(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<PartyUpdate>,
) -> ServiceResult<Response> {
    let party = svc.update_party(id.parse()?, body).await?;
    svc.respond(PARTIES, &party)
}

pub async fn suspend_party(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let party = svc.set_party_active(id.parse()?, false).await?;
    svc.respond(PARTIES, &party)
}

pub async fn reactivate_party(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let party = svc.set_party_active(id.parse()?, true).await?;
    svc.respond(PARTIES, &party)
}
