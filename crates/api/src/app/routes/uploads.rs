use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path},
    http::{header, HeaderMap},
    response::Response,
    routing::put,
    Router,
};
use tracing::info;

use livebase_auth::Action;
use livebase_infra::object_key;

use crate::app::dto;
use crate::app::errors::{ServiceError, ServiceResult};
use crate::app::services::TenantServices;

pub const UPLOADS: &str = "uploads";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub fn router() -> Router {
    Router::new()
        .route("/uploads/:file_name", put(upload))
        // Headroom so oversized bodies reach the handler and get a 413 envelope.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
}

/// Raster formats only; stored files are served from the API origin.
const RASTER_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp", "image/bmp"];

/// The request's content type if it is a raster image the tenant allows.
fn image_content_type(headers: &HeaderMap, allowed: &[String]) -> ServiceResult<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .unwrap_or_default();
    if RASTER_TYPES.contains(&content_type.as_str()) && allowed.contains(&content_type) {
        Ok(content_type)
    } else {
        Err(ServiceError::UnsupportedMediaType(format!(
            "content type '{content_type}' is not accepted; allowed: {}",
            allowed.join(", ")
        )))
    }
}

pub async fn upload(
    svc: TenantServices,
    Path(file_name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServiceResult<Response> {
    svc.require(UPLOADS, Action::Write)?;
    let allowed = svc.allowed_upload_types().await?;
    let content_type = image_content_type(&headers, &allowed)?;
    if body.is_empty() {
        return Err(livebase_core::DomainError::validation("upload body is empty").into());
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(ServiceError::PayloadTooLarge(format!(
            "{} bytes exceeds the {MAX_UPLOAD_BYTES} byte limit",
            body.len()
        )));
    }

    let key = object_key(svc.tenant_id(), &file_name);
    let size = body.len();
    let stored = svc.storage().put(&key, &content_type, body.to_vec()).await?;
    info!(tenant_id = %svc.tenant_id(), key = %stored.key, size, "file uploaded");
    Ok(dto::data(serde_json::json!({ "key": stored.key, "url": stored.url })))
}
