//! Tenant-scoped document store boundary.
//!
//! Every business record is persisted as a JSON document keyed by
//! `(tenant_id, kind, id)` with an optimistic `version`. A [`WriteBatch`]
//! groups puts and deletes that must land together; the store validates every
//! version in the batch before applying any of it.

pub mod memory;
pub mod postgres;
pub mod repository;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use livebase_core::{BaseId, ExpectedVersion, Record, TenantId};

pub use memory::MemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use repository::Repository;

/// A persisted document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub kind: String,
    pub id: String,
    pub base_id: Option<BaseId>,
    pub version: u64,
    pub body: JsonValue,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Deserialize into a typed record, taking the version from the store.
    pub fn decode<T: Record>(&self) -> Result<T, StoreError> {
        let mut record: T = serde_json::from_value(self.body.clone()).map_err(|e| {
            StoreError::Serialization(format!("{} '{}': {e}", self.kind, self.id))
        })?;
        record.set_version(self.version);
        Ok(record)
    }
}

/// Store operation error.
///
/// Infrastructure failures only; domain failures stay `DomainError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic version check or uniqueness failed.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        kind: &'static str,
        id: String,
        base_id: Option<BaseId>,
        expected: ExpectedVersion,
        /// Version the document has after the write.
        version: u64,
        body: JsonValue,
    },
    Delete {
        kind: &'static str,
        id: String,
        expected: ExpectedVersion,
    },
}

impl WriteOp {
    pub fn kind(&self) -> &'static str {
        match self {
            WriteOp::Put { kind, .. } | WriteOp::Delete { kind, .. } => kind,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Put { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }
}

/// Writes committed atomically by [`DocumentStore::commit`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put of `record`.
    ///
    /// A record at version 0 must not exist yet; otherwise the stored version
    /// must still equal the record's. The record's version is advanced to the
    /// one it will have once the batch commits.
    pub fn put<T: Record>(&mut self, record: &mut T) -> Result<&mut Self, StoreError> {
        let current = record.version();
        let expected = if current == 0 {
            ExpectedVersion::New
        } else {
            ExpectedVersion::Exact(current)
        };
        record.set_version(current + 1);
        let body = serde_json::to_value(&*record).map_err(|e| {
            StoreError::Serialization(format!("{} '{}': {e}", T::KIND, record.key()))
        })?;
        self.ops.push(WriteOp::Put {
            kind: T::KIND,
            id: record.key(),
            base_id: record.base_id(),
            expected,
            version: current + 1,
            body,
        });
        Ok(self)
    }

    /// Queue a delete guarded by the record's current version.
    pub fn delete<T: Record>(&mut self, record: &T) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            kind: T::KIND,
            id: record.key(),
            expected: ExpectedVersion::Exact(record.version()),
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Tenant-isolated document persistence.
///
/// `bases` on [`list`](DocumentStore::list) narrows base-scoped documents to
/// the given bases; documents without a base are always returned. `None`
/// returns everything of the kind.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(
        &self,
        tenant_id: TenantId,
        kind: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Documents of a kind ordered by id.
    async fn list(
        &self,
        tenant_id: TenantId,
        kind: &str,
        bases: Option<&[BaseId]>,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Apply every write or none of them.
    async fn commit(&self, tenant_id: TenantId, batch: WriteBatch) -> Result<(), StoreError>;

    /// Next value (starting at 1) of a per-tenant counter.
    async fn next_sequence(&self, tenant_id: TenantId, key: &str) -> Result<u64, StoreError>;

    /// Tenants that own at least one document.
    async fn tenants(&self) -> Result<Vec<TenantId>, StoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(
        &self,
        tenant_id: TenantId,
        kind: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        (**self).get(tenant_id, kind, id).await
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        kind: &str,
        bases: Option<&[BaseId]>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        (**self).list(tenant_id, kind, bases).await
    }

    async fn commit(&self, tenant_id: TenantId, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(tenant_id, batch).await
    }

    async fn next_sequence(&self, tenant_id: TenantId, key: &str) -> Result<u64, StoreError> {
        (**self).next_sequence(tenant_id, key).await
    }

    async fn tenants(&self) -> Result<Vec<TenantId>, StoreError> {
        (**self).tenants().await
    }
}

/// Whether a document with `base_id` passes a `list` base filter.
pub(crate) fn base_visible(base_id: Option<BaseId>, bases: Option<&[BaseId]>) -> bool {
    match (base_id, bases) {
        (_, None) | (None, _) => true,
        (Some(b), Some(allowed)) => allowed.contains(&b),
    }
}
