use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use livebase_core::PageRequest;
use livebase_inventory::{AdjustmentInput, LevelFilter, MovementFilter, StockOutFilter, StockOutInput};

use crate::app::errors::ServiceResult;
use crate::app::services::inventory::{INVENTORY, STOCK_OUTS};
use crate::app::services::TenantServices;

pub fn router() -> Router {
    Router::new()
        .route("/levels", get(list_levels))
        .route("/movements", get(list_movements))
        .route("/adjustments", post(adjust))
}

pub fn stock_outs_router() -> Router {
    Router::new()
        .route("/", get(list_stock_outs).post(create_stock_out))
        .route("/:id", get(get_stock_out))
}

pub async fn list_levels(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<LevelFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_stock_levels(filter, page).await?;
    svc.respond_page(INVENTORY, page)
}

pub async fn list_movements(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<MovementFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_movements(filter, page).await?;
    svc.respond_page(INVENTORY, page)
}

pub async fn adjust(svc: TenantServices, Json(body): Json<AdjustmentInput>) -> ServiceResult<Response> {
    let movement = svc.adjust_stock(body).await?;
    svc.respond_created(INVENTORY, &movement)
}

pub async fn list_stock_outs(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<StockOutFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_stock_outs(filter, page).await?;
    svc.respond_page(STOCK_OUTS, page)
}

pub async fn get_stock_out(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let stock_out = svc.get_stock_out(id.parse()?).await?;
    svc.respond(STOCK_OUTS, &stock_out)
}

pub async fn create_stock_out(svc: TenantServices, Json(body): Json<StockOutInput>) -> ServiceResult<Response> {
    let stock_out = svc.create_stock_out(body).await?;
    svc.respond_created(STOCK_OUTS, &stock_out)
}
