use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};

use livebase_bases::{
    BaseFilter, BaseInput, BaseUpdate, KeeperFilter, LocationFilter, LocationInput, LocationUpdate,
    PersonnelFilter, PersonnelInput, PersonnelUpdate, SubDistrictFilter, SubDistrictInput,
    SubDistrictUpdate, WarehouseKeeperInput,
};
use livebase_core::PageRequest;

use crate::app::dto;
use crate::app::errors::ServiceResult;
use crate::app::services::bases::{BASES, LOCATIONS, PERSONNEL, SUB_DISTRICTS, WAREHOUSE_KEEPERS};
use crate::app::services::TenantServices;

pub fn bases_router() -> Router {
    Router::new()
        .route("/", get(list_bases).post(create_base))
        .route("/:id", get(get_base).put(update_base).delete(delete_base))
        .route("/:id/enable", post(enable_base))
        .route("/:id/disable", post(disable_base))
}

pub fn sub_districts_router() -> Router {
    Router::new()
        .route("/", get(list_sub_districts).post(create_sub_district))
        .route(
            "/:id",
            get(get_sub_district)
                .put(update_sub_district)
                .delete(delete_sub_district),
        )
}

pub fn locations_router() -> Router {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route(
            "/:id",
            get(get_location).put(update_location).delete(delete_location),
        )
}

pub fn personnel_router() -> Router {
    Router::new()
        .route("/", get(list_personnel).post(create_personnel))
        .route(
            "/:id",
            get(get_personnel).put(update_personnel).delete(delete_personnel),
        )
}

pub fn keepers_router() -> Router {
    Router::new()
        .route("/", get(list_keepers).post(assign_keeper))
        .route("/:id", delete(unassign_keeper))
}

// -------------------------
// Bases
// -------------------------

pub async fn list_bases(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<BaseFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_bases(filter, page).await?;
    svc.respond_page(BASES, page)
}

pub async fn get_base(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let base = svc.get_base(id.parse()?).await?;
    svc.respond(BASES, &base)
}

pub async fn create_base(svc: TenantServices, Json(body): Json<BaseInput>) -> ServiceResult<Response> {
    let base = svc.create_base(body).await?;
    svc.respond_created(BASES, &base)
}

pub async fn update_base(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<BaseUpdate>,
) -> ServiceResult<Response> {
    let base = svc.update_base(id.parse()?, body).await?;
    svc.respond(BASES, &base)
}

pub async fn enable_base(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let base = svc.set_base_enabled(id.parse()?, true).await?;
    svc.respond(BASES, &base)
}

pub async fn disable_base(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let base = svc.set_base_enabled(id.parse()?, false).await?;
    svc.respond(BASES, &base)
}

pub async fn delete_base(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_base(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Sub-districts
// -------------------------

pub async fn list_sub_districts(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<SubDistrictFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_sub_districts(filter, page).await?;
    svc.respond_page(SUB_DISTRICTS, page)
}

pub async fn get_sub_district(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let sub = svc.get_sub_district(id.parse()?).await?;
    svc.respond(SUB_DISTRICTS, &sub)
}

pub async fn create_sub_district(
    svc: TenantServices,
    Json(body): Json<SubDistrictInput>,
) -> ServiceResult<Response> {
    let sub = svc.create_sub_district(body).await?;
    svc.respond_created(SUB_DISTRICTS, &sub)
}

pub async fn update_sub_district(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<SubDistrictUpdate>,
) -> ServiceResult<Response> {
    let sub = svc.update_sub_district(id.parse()?, body).await?;
    svc.respond(SUB_DISTRICTS, &sub)
}

pub async fn delete_sub_district(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_sub_district(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Locations
// -------------------------

pub async fn list_locations(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<LocationFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_locations(filter, page).await?;
    svc.respond_page(LOCATIONS, page)
}

pub async fn get_location(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let location = svc.get_location(id.parse()?).await?;
    svc.respond(LOCATIONS, &location)
}

pub async fn create_location(svc: TenantServices, Json(body): Json<LocationInput>) -> ServiceResult<Response> {
    let location = svc.create_location(body).await?;
    svc.respond_created(LOCATIONS, &location)
}

pub async fn update_location(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<LocationUpdate>,
) -> ServiceResult<Response> {
    let location = svc.update_location(id.parse()?, body).await?;
    svc.respond(LOCATIONS, &location)
}

pub async fn delete_location(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_location(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Personnel
// -------------------------

pub async fn list_personnel(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<PersonnelFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_personnel(filter, page).await?;
    svc.respond_page(PERSONNEL, page)
}

pub async fn get_personnel(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    let person = svc.get_personnel(id.parse()?).await?;
    svc.respond(PERSONNEL, &person)
}

pub async fn create_personnel(svc: TenantServices, Json(body): Json<PersonnelInput>) -> ServiceResult<Response> {
    let person = svc.create_personnel(body).await?;
    svc.respond_created(PERSONNEL, &person)
}

pub async fn update_personnel(
    svc: TenantServices,
    Path(id): Path<String>,
    Json(body): Json<PersonnelUpdate>,
) -> ServiceResult<Response> {
    let person = svc.update_personnel(id.parse()?, body).await?;
    svc.respond(PERSONNEL, &person)
}

pub async fn delete_personnel(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_personnel(id.parse()?).await?;
    Ok(dto::deleted(id))
}

// -------------------------
// Warehouse keepers
// -------------------------

pub async fn list_keepers(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<KeeperFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_keepers(filter, page).await?;
    svc.respond_page(WAREHOUSE_KEEPERS, page)
}

pub async fn assign_keeper(
    svc: TenantServices,
    Json(body): Json<WarehouseKeeperInput>,
) -> ServiceResult<Response> {
    let keeper = svc.assign_keeper(body).await?;
    svc.respond_created(WAREHOUSE_KEEPERS, &keeper)
}

pub async fn unassign_keeper(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.unassign_keeper(id.parse()?).await?;
    Ok(dto::deleted(id))
}
