use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use livebase_auth::AuthzError;
use livebase_core::DomainError;
use livebase_infra::{StorageError, StoreError};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unauthorized: {0}")]
    Unauthenticated(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::Domain(e) => match e {
                DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
                DomainError::InvariantViolation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation")
                }
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            },
            ServiceError::Authz(AuthzError::TenantMismatch) => {
                (StatusCode::FORBIDDEN, "tenant_isolation")
            }
            ServiceError::Authz(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ServiceError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
            ServiceError::Store(StoreError::Serialization(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
            }
            ServiceError::Store(StoreError::Backend(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
            ServiceError::Storage(StorageError::InvalidKey(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            ServiceError::Storage(_) => (StatusCode::BAD_GATEWAY, "storage_error"),
            ServiceError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServiceError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            ServiceError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, code, "request failed");
        } else if status == StatusCode::CONFLICT {
            warn!(error = %self, "request conflicted");
        } else {
            debug!(error = %self, code, "request rejected");
        }
        json_error(status, code, self.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
