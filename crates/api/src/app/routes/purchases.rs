use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use livebase_core::PageRequest;
use livebase_purchasing::{
    ArrivalFilter, ArrivalInput, PayableFilter, PaymentInput, PurchaseOrderFilter,
    PurchaseOrderInput, PurchaseOrderUpdate,
};

use crate::app::dto;
use crate::app::errors::ServiceResult;
use crate::app::services::purchasing::{ARRIVALS, PAYABLES, PURCHASES};
use crate::app::services::TenantServices;

pub fn orders_router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
        .route("/:id/cancel", post(cancel_order))
}

pub fn arrivals_router() -> Router {
    Router::new()
        .route("/", get(list_arrivals).post(record_arrival))
        .route("/:id", get(get_arrival))
        .route("/:id/void", post(void_arrival))
}

pub fn payables_router() -> Router {
    Router::new()
        .route("/", get(list_payables))
        .route("/:id", get(get_payable))
        .route("/:id/payments", post(record_payment))
}

// -------------------------
// Purchase orders
// -------------------------

pub async fn list_orders(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_purchase_orders(filter, page).await?;
    svc.respond_page(PURCHASES, page)
}

pub async fn get_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.get_purchase_order(id.parse()?).await?;
    svc.respond(PURCHASES, &order)
}

pub async fn create_order(
    svc: TenantServices,
    Json(body): Json<PurchaseOrderInput>,
) -> ServiceResult<Response> {
    let order = svc.create_purchase_order(body).await?;
    svc.respond_created(PURCHASES, &order)
}

pub async fn update_order(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<PurchaseOrderUpdate>,
) -> ServiceResult<Response> {
    let order = svc.update_purchase_order(id.parse()?, body).await?;
    svc.respond(PURCHASES, &order)
}

pub async fn cancel_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let order = svc.cancel_purchase_order(id.parse()?).await?;
    svc.respond(PURCHASES, &order)
}

pub async fn delete_order(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_purchase_order(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Arrivals
// -------------------------

pub async fn list_arrivals(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<ArrivalFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_arrivals(filter, page).await?;
    svc.respond_page(ARRIVALS, page)
}

pub async fn get_arrival(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let arrival = svc.get_arrival(id.parse()?).await?;
    svc.respond(ARRIVALS, &arrival)
}

pub async fn record_arrival(svc: TenantServices, Json(body): Json<ArrivalInput>) -> ServiceResult<Response> {
    let arrival = svc.record_arrival(body).await?;
    svc.respond_created(ARRIVALS, &arrival)
}

pub async fn void_arrival(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let arrival = svc.void_arrival(id.parse()?).await?;
    svc.respond(ARRIVALS, &arrival)
}

// -------------------------
// Payables
// -------------------------

pub async fn list_payables(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<PayableFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_payables(filter, page).await?;
    svc.respond_page(PAYABLES, page)
}

pub async fn get_payable(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let payable = svc.get_payable(id.parse()?).await?;
    svc.respond(PAYABLES, &payable)
}

pub async fn record_payment(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<PaymentInput>,
) -> ServiceResult<Response> {
    let payable = svc.record_payment(id.parse()?, body).await?;
    svc.respond(PAYABLES, &payable)
}
