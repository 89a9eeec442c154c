//! Application services: shared infrastructure plus a per-request handle that
//! carries tenant and principal through every business operation.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::debug;

use livebase_auth::{Action, FieldPolicy, Permission, Principal, authorize, authorize_base};
use livebase_bases::Base;
use livebase_core::{
    BaseId, DocumentCode, DocumentPrefix, DomainError, Page, Record, TenantId, UserId,
};
use livebase_infra::{
    DocumentStore, FileStorage, Repository, TranslationCache, WriteBatch,
};

use crate::app::dto;
use crate::app::errors::{ServiceError, ServiceResult};
use crate::context::{PrincipalContext, TenantContext};

pub mod access;
pub mod bases;
pub mod catalog;
pub mod inventory;
pub mod purchasing;
pub mod sales;
pub mod settings;
pub mod stats;

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: Value,
}

/// Process-wide infrastructure shared by every request.
pub struct AppServices {
    store: Arc<dyn DocumentStore>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
    translations: TranslationCache,
    storage: Arc<dyn FileStorage>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        translations: TranslationCache,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        let (realtime_tx, _rx) = broadcast::channel(256);
        Self {
            store,
            realtime_tx,
            translations,
            storage,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    pub fn for_request(
        self: &Arc<Self>,
        tenant: TenantContext,
        principal: PrincipalContext,
    ) -> TenantServices {
        TenantServices {
            app: self.clone(),
            tenant,
            principal,
        }
    }
}

/// One committed record change, published as `<resource>.changed`.
#[derive(Debug, Clone)]
pub struct Change {
    pub resource: &'static str,
    pub id: String,
    pub action: &'static str,
}

impl Change {
    pub fn new(resource: &'static str, id: impl ToString, action: &'static str) -> Self {
        Self {
            resource,
            id: id.to_string(),
            action,
        }
    }
}

/// Services bound to the tenant and principal of one request.
#[derive(Clone)]
pub struct TenantServices {
    app: Arc<AppServices>,
    tenant: TenantContext,
    principal: PrincipalContext,
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TenantServices {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract(parts)
    }
}

fn extract(parts: &Parts) -> Result<TenantServices, ServiceError> {
    let app = parts
        .extensions
        .get::<Arc<AppServices>>()
        .cloned()
        .ok_or_else(|| ServiceError::Internal("application services not installed".into()))?;
    let tenant = parts
        .extensions
        .get::<TenantContext>()
        .copied()
        .ok_or_else(|| ServiceError::Unauthenticated("missing tenant context".into()))?;
    let principal = parts
        .extensions
        .get::<PrincipalContext>()
        .cloned()
        .ok_or_else(|| ServiceError::Unauthenticated("missing principal".into()))?;
    Ok(TenantServices {
        app,
        tenant,
        principal,
    })
}

impl TenantServices {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant.tenant_id()
    }

    pub fn principal(&self) -> &Principal {
        self.principal.principal()
    }

    pub fn user_id(&self) -> UserId {
        self.principal.principal_id()
    }

    pub fn field_policy(&self) -> &FieldPolicy {
        self.principal.fields()
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    // -------------------------
    // Authorization
    // -------------------------

    pub fn require(&self, resource: &str, action: Action) -> ServiceResult<()> {
        authorize(self.principal(), &Permission::of(resource, action)).map_err(|e| {
            debug!(
                tenant_id = %self.tenant_id(),
                principal_id = %self.user_id(),
                error = %e,
                "permission denied"
            );
            ServiceError::from(e)
        })
    }

    /// Writes into `base_id` must stay inside the principal's data scope.
    pub fn require_base(&self, base_id: BaseId) -> ServiceResult<()> {
        authorize_base(self.principal(), base_id).map_err(ServiceError::from)
    }

    fn visible(&self, base_id: Option<BaseId>) -> bool {
        self.principal.scope().allows_optional(base_id)
    }

    // -------------------------
    // Persistence
    // -------------------------

    pub fn repo<T: Record>(&self) -> Repository<T> {
        Repository::new(self.app.store.clone(), self.tenant_id())
    }

    /// Load a record; missing and out-of-scope records are both not found.
    pub async fn find<T: Record>(&self, id: &T::Id) -> ServiceResult<T> {
        match self.repo::<T>().get(id).await? {
            Some(record) if self.visible(record.base_id()) => Ok(record),
            _ => Err(DomainError::not_found(format!("{} '{}'", T::KIND, id)).into()),
        }
    }

    /// Records visible to the principal, optionally narrowed to one base.
    pub async fn list<T: Record>(&self, base_id: Option<BaseId>) -> ServiceResult<Vec<T>> {
        let bases = self.principal.scope().narrow(base_id);
        Ok(self.repo::<T>().list(bases.as_deref()).await?)
    }

    /// Every record of the kind regardless of scope (uniqueness and reference checks).
    pub async fn list_all<T: Record>(&self) -> ServiceResult<Vec<T>> {
        Ok(self.repo::<T>().list(None).await?)
    }

    /// An active base the principal may write into.
    pub async fn writable_base(&self, base_id: BaseId) -> ServiceResult<Base> {
        self.require_base(base_id)?;
        let base: Base = self.find(&base_id).await?;
        base.ensure_active()?;
        Ok(base)
    }

    pub async fn next_code(&self, prefix: DocumentPrefix, date: NaiveDate) -> ServiceResult<String> {
        let seq = self
            .app
            .store
            .next_sequence(self.tenant_id(), &prefix.sequence_key(date))
            .await?;
        Ok(DocumentCode::format(prefix, date, seq))
    }

    /// Commit `batch` atomically, then announce `changes`.
    pub async fn commit(&self, batch: WriteBatch, changes: Vec<Change>) -> ServiceResult<()> {
        self.app.store.commit(self.tenant_id(), batch).await?;
        for change in changes {
            self.publish(change);
        }
        Ok(())
    }

    /// Insert or update one record.
    pub async fn save<T: Record>(
        &self,
        resource: &'static str,
        record: &mut T,
        action: &'static str,
    ) -> ServiceResult<()> {
        let mut working = record.clone();
        let mut batch = WriteBatch::new();
        batch.put(&mut working)?;
        self.commit(batch, vec![Change::new(resource, working.key(), action)])
            .await?;
        *record = working;
        Ok(())
    }

    pub async fn remove<T: Record>(&self, resource: &'static str, record: &T) -> ServiceResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(record);
        self.commit(batch, vec![Change::new(resource, record.key(), "deleted")])
            .await
    }

    fn publish(&self, change: Change) {
        // Lossy: nobody listening is fine.
        let _ = self.app.realtime_tx.send(RealtimeMessage {
            tenant_id: self.tenant_id(),
            topic: format!("{}.changed", change.resource),
            payload: json!({ "id": change.id, "action": change.action }),
        });
    }

    pub fn translations(&self) -> &TranslationCache {
        &self.app.translations
    }

    pub fn storage(&self) -> &Arc<dyn FileStorage> {
        &self.app.storage
    }

    // -------------------------
    // Presentation
    // -------------------------

    /// Serialize `value` with the principal's hidden fields of `resource` removed.
    pub fn present<T: Serialize>(&self, resource: &str, value: &T) -> ServiceResult<Value> {
        let mut json = serde_json::to_value(value)
            .map_err(|e| ServiceError::Internal(format!("serializing {resource}: {e}")))?;
        self.principal.fields().redact(resource, &mut json);
        Ok(json)
    }

    pub fn respond<T: Serialize>(&self, resource: &str, value: &T) -> ServiceResult<Response> {
        Ok(dto::data(self.present(resource, value)?))
    }

    pub fn respond_created<T: Serialize>(&self, resource: &str, value: &T) -> ServiceResult<Response> {
        Ok(dto::created(self.present(resource, value)?))
    }

    pub fn respond_page<T: Serialize>(&self, resource: &str, page: Page<T>) -> ServiceResult<Response> {
        let Page {
            data,
            total,
            current,
            page_size,
        } = page;
        let data = data
            .iter()
            .map(|item| self.present(resource, item))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(dto::list(Page {
            data,
            total,
            current,
            page_size,
        }))
    }
}

/// The tenant's realtime messages as server-sent events.
pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
