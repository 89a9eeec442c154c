use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};

use livebase_core::PageRequest;
use livebase_sales::{
    DistributionOrderFilter, DistributionOrderInput, DistributionOrderUpdate, PointFilter,
    PointInput, PointOrderFilter, PointOrderInput, PointOrderUpdate, PointUpdate, VisitFilter,
    VisitInput,
};

use crate::app::dto;
use crate::app::errors::ServiceResult;
use crate::app::services::sales::{POINTS, POINT_ORDERS, SALES, VISITS};
use crate::app::services::TenantServices;

pub fn points_router() -> Router {
    Router::new()
        .route("/", get(list_points).post(create_point))
        .route("/:id", get(get_point).put(update_point).delete(delete_point))
}

pub fn visits_router() -> Router {
    Router::new()
        .route("/", get(list_visits).post(record_visit))
        .route("/:id", delete(delete_visit))
}

pub fn point_orders_router() -> Router {
    Router::new()
        .route("/", get(list_point_orders).post(create_point_order))
        .route("/:id", get(get_point_order).put(update_point_order))
        .route("/:id/cancel", post(cancel_point_order))
        .route("/:id/complete", post(complete_point_order))
}

pub fn distribution_router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order))
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/ship", post(ship_order))
        .route("/:id/settle", post(settle_order))
        .route("/:id/cancel", post(cancel_order))
}

// -------------------------
// Points
// -------------------------

pub async fn list_points(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<PointFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_points(filter, page).await?;
    svc.respond_page(POINTS, page)
}

pub async fn get_point(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let point = svc.get_point(id.parse()?).await?;
    svc.respond(POINTS, &point)
}

pub async fn create_point(svc: TenantServices, Json(body): Json<PointInput>) -> ServiceResult<Response> {
    let point = svc.create_point(body).await?;
    svc.respond_created(POINTS, &point)
}

pub async fn update_point(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<PointUpdate>,
) -> ServiceResult<Response> {
    let point = svc.update_point(id.parse()?, body).await?;
    svc.respond(POINTS, &point)
}

pub async fn delete_point(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_point(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Visits
// -------------------------

pub async fn list_visits(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<VisitFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_visits(filter, page).await?;
    svc.respond_page(VISITS, page)
}

pub async fn record_visit(svc: TenantServices, Json(body): Json<VisitInput>) -> ServiceResult<Response> {
    let visit = svc.record_visit(body).await?;
    svc.respond_created(VISITS, &visit)
}

pub async fn delete_visit(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_visit(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Point orders
// -------------------------

pub async fn list_point_orders(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<PointOrderFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_point_orders(filter, page).await?;
    svc.respond_page(POINT_ORDERS, page)
}

pub async fn get_point_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.get_point_order(id.parse()?).await?;
    svc.respond(POINT_ORDERS, &order)
}

pub async fn create_point_order(
    svc: TenantServices,
    Json(body): Json<PointOrderInput>,
) -> ServiceResult<Response> {
    let order = svc.create_point_order(body).await?;
    svc.respond_created(POINT_ORDERS, &order)
}

pub async fn update_point_order(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<PointOrderUpdate>,
) -> ServiceResult<Response> {
    let order = svc.update_point_order(id.parse()?, body).await?;
    svc.respond(POINT_ORDERS, &order)
}

pub async fn cancel_point_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.cancel_point_order(id.parse()?).await?;
    svc.respond(POINT_ORDERS, &order)
}

pub async fn complete_point_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.complete_point_order(id.parse()?).await?;
    svc.respond(POINT_ORDERS, &order)
}

// -------------------------
// Distribution orders
// -------------------------

pub async fn list_orders(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<DistributionOrderFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_distribution_orders(filter, page).await?;
    svc.respond_page(SALES, page)
}

pub async fn get_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.get_distribution_order(id.parse()?).await?;
    svc.respond(SALES, &order)
}

pub async fn create_order(
    svc: TenantServices,
    Json(body): Json<DistributionOrderInput>,
) -> ServiceResult<Response> {
    let order = svc.create_distribution_order(body).await?;
    svc.respond_created(SALES, &order)
}

pub async fn update_order(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<DistributionOrderUpdate>,
) -> ServiceResult<Response> {
    let order = svc.update_distribution_order(id.parse()?, body).await?;
    svc.respond(SALES, &order)
}

pub async fn confirm_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.confirm_distribution_order(id.parse()?).await?;
    svc.respond(SALES, &order)
}

pub async fn ship_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.ship_distribution_order(id.parse()?).await?;
    svc.respond(SALES, &order)
}

pub async fn settle_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.settle_distribution_order(id.parse()?).await?;
    svc.respond(SALES, &order)
}

pub async fn cancel_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.cancel_distribution_order(id.parse()?).await?;
    svc.respond(SALES, &order)
}
