use std::sync::Arc;

use axum::{
    extract::Extension,
    response::{sse::Event as SseEvent, IntoResponse},
    Json,
};
use serde_json::json;

use crate::app::dto;
use crate::app::services::{self, AppServices, TenantServices};
use crate::context::TenantContext;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "success": true, "data": { "status": "ok" } }))
}

pub async fn whoami(svc: TenantServices) -> axum::response::Response {
    dto::data(svc.whoami())
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::tenant_sse_stream(services, tenant.tenant_id())
}
