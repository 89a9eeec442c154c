//! Response envelopes and request shapes that have no domain counterpart.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use livebase_auth::UserStatus;
use livebase_core::{BaseId, CurrencyCode, Page, UserId};

// -------------------------
// Envelopes
// -------------------------

pub fn data(value: Value) -> Response {
    Json(json!({ "success": true, "data": value })).into_response()
}

pub fn created(value: Value) -> Response {
    (StatusCode::CREATED, Json(json!({ "success": true, "data": value }))).into_response()
}

pub fn list(page: Page<Value>) -> Response {
    Json(json!({
        "success": true,
        "data": page.data,
        "total": page.total,
        "current": page.current,
        "page_size": page.page_size,
    }))
    .into_response()
}

pub fn deleted(id: impl ToString) -> Response {
    Json(json!({ "success": true, "data": { "id": id.to_string(), "deleted": true } }))
        .into_response()
}

// -------------------------
// Request DTOs
// -------------------------

/// `?base_id=` for endpoints that only narrow by base.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseQuery {
    pub base_id: Option<BaseId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalesStatsQuery {
    pub base_id: Option<BaseId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertQuery {
    pub amount: i64,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub amount: i64,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub on: NaiveDate,
    pub converted: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplainQuery {
    pub permission: String,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub keyword: Option<String>,
    pub status: Option<UserStatus>,
    pub role: Option<String>,
    pub base_id: Option<BaseId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub upserted: usize,
}
