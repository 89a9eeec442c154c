use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};

use livebase_core::PageRequest;
use livebase_settings::{
    CurrencyRateInput, RateFilter, SettingFilter, SettingInput, SettingUpdate, TranslationFilter,
    TranslationInput,
};

use crate::app::dto::{self, BulkResult, ConvertQuery};
use crate::app::errors::ServiceResult;
use crate::app::services::settings::{CURRENCY_RATES, SETTINGS, TRANSLATIONS};
use crate::app::services::TenantServices;

pub fn rates_router() -> Router {
    Router::new()
        .route("/", get(list_rates).post(upsert_rate))
        .route("/convert", get(convert))
        .route("/:id", delete(delete_rate))
}

pub fn settings_router() -> Router {
    Router::new()
        .route("/", get(list_settings).post(create_setting))
        .route(
            "/:key",
            get(get_setting).put(update_setting).delete(delete_setting),
        )
}

pub fn translations_router() -> Router {
    Router::new()
        .route("/", get(list_translations).post(upsert_translation))
        .route("/bulk", post(bulk_upsert))
        .route("/bundle/:locale", get(bundle))
        .route("/:id", delete(delete_translation))
}

// -------------------------
// Currency rates
// -------------------------

pub async fn list_rates(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<RateFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_rates(filter, page).await?;
    svc.respond_page(CURRENCY_RATES, page)
}

pub async fn upsert_rate(svc: TenantServices, Json(body): Json<CurrencyRateInput>) -> ServiceResult<Response> {
    let rate = svc.upsert_rate(body).await?;
    svc.respond(CURRENCY_RATES, &rate)
}

pub async fn delete_rate(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_rate(id.parse()?).await?;
    Ok(dto::deleted(id))
}

pub async fn convert(svc: TenantServices, Query(query): Query<ConvertQuery>) -> ServiceResult<Response> {
    let conversion = svc.convert_amount(query).await?;
    svc.respond(CURRENCY_RATES, &conversion)
}

// -------------------------
// Global settings
// -------------------------

pub async fn list_settings(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<SettingFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_settings(filter, page).await?;
    svc.respond_page(SETTINGS, page)
}

pub async fn get_setting(svc: TenantServices, Path(key): Path<String>) -> ServiceResult<Response> {
    let setting = svc.get_setting(&key).await?;
    svc.respond(SETTINGS, &setting)
}

pub async fn create_setting(svc: TenantServices, Json(body): Json<SettingInput>) -> ServiceResult<Response> {
    let setting = svc.create_setting(body).await?;
    svc.respond_created(SETTINGS, &setting)
}

pub async fn update_setting(
    svc: TenantServices,
    Path(key): Path<String>,
    Json(body): Json<SettingUpdate>,
) -> ServiceResult<Response> {
    let setting = svc.update_setting(&key, body).await?;
    svc.respond(SETTINGS, &setting)
}

pub async fn delete_setting(svc: TenantServices, Path(key): Path<String>) -> ServiceResult<Response> {
    svc.delete_setting(&key).await?;
    Ok(dto::deleted(key))
}

// -------------------------
// Translations
// -------------------------

pub async fn list_translations(
    svc: TenantServices,
    Query(page): Query<PageRequest>,
    Query(filter): Query<TranslationFilter>,
) -> ServiceResult<Response> {
    let page = svc.list_translations(filter, page).await?;
    svc.respond_page(TRANSLATIONS, page)
}

pub async fn upsert_translation(
    svc: TenantServices,
    Json(body): Json<TranslationInput>,
) -> ServiceResult<Response> {
    let translation = svc.upsert_translation(body).await?;
    svc.respond(TRANSLATIONS, &translation)
}

pub async fn bulk_upsert(
    svc: TenantServices,
    Json(body): Json<Vec<TranslationInput>>,
) -> ServiceResult<Response> {
    let upserted = svc.bulk_upsert_translations(body).await?;
    svc.respond(TRANSLATIONS, &BulkResult { upserted })
}

pub async fn bundle(svc: TenantServices, Path(locale): Path<String>) -> ServiceResult<Response> {
    let bundle = svc.translation_bundle(&locale).await?;
    svc.respond(TRANSLATIONS, bundle.as_ref())
}

pub async fn delete_translation(svc: TenantServices, Path(id): Path<String>) -> ServiceResult<Response> {
    svc.delete_translation(id.parse()?).await?;
    Ok(dto::deleted(id))
}
