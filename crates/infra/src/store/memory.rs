use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use livebase_core::{BaseId, TenantId};

use super::{DocumentStore, StoreError, StoredDocument, WriteBatch, WriteOp, base_visible};

#[derive(Debug, Default)]
struct TenantData {
    documents: BTreeMap<(String, String), StoredDocument>,
    sequences: HashMap<String, u64>,
}

/// In-memory document store.
///
/// Intended for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    tenants: RwLock<HashMap<TenantId, TenantData>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

fn conflict(op: &WriteOp, actual: Option<u64>) -> StoreError {
    StoreError::Conflict(format!(
        "{} '{}' was modified concurrently (found version {actual:?})",
        op.kind(),
        op.id()
    ))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(
        &self,
        tenant_id: TenantId,
        kind: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let tenants = self.tenants.read().map_err(|_| poisoned())?;
        Ok(tenants
            .get(&tenant_id)
            .and_then(|t| t.documents.get(&(kind.to_string(), id.to_string())))
            .cloned())
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        kind: &str,
        bases: Option<&[BaseId]>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let tenants = self.tenants.read().map_err(|_| poisoned())?;
        let Some(data) = tenants.get(&tenant_id) else {
            return Ok(Vec::new());
        };
        Ok(data
            .documents
            .iter()
            .filter(|((k, _), doc)| k == kind && base_visible(doc.base_id, bases))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn commit(&self, tenant_id: TenantId, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tenants = self.tenants.write().map_err(|_| poisoned())?;
        let data = tenants.entry(tenant_id).or_default();

        // Validate against the state as the batch itself evolves it, so two
        // writes to one document in a batch are checked in order.
        let mut pending: HashMap<(String, String), Option<u64>> = HashMap::new();
        for op in batch.ops() {
            let key = (op.kind().to_string(), op.id().to_string());
            let actual = match pending.get(&key) {
                Some(v) => *v,
                None => data.documents.get(&key).map(|d| d.version),
            };
            let (expected, after) = match op {
                WriteOp::Put {
                    expected, version, ..
                } => (*expected, Some(*version)),
                WriteOp::Delete { expected, .. } => (*expected, None),
            };
            if !expected.matches(actual) {
                return Err(conflict(op, actual));
            }
            pending.insert(key, after);
        }

        let now = Utc::now();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put {
                    kind,
                    id,
                    base_id,
                    version,
                    body,
                    ..
                } => {
                    data.documents.insert(
                        (kind.to_string(), id.clone()),
                        StoredDocument {
                            kind: kind.to_string(),
                            id,
                            base_id,
                            version,
                            body,
                            updated_at: now,
                        },
                    );
                }
                WriteOp::Delete { kind, id, .. } => {
                    data.documents.remove(&(kind.to_string(), id));
                }
            }
        }
        Ok(())
    }

    async fn next_sequence(&self, tenant_id: TenantId, key: &str) -> Result<u64, StoreError> {
        let mut tenants = self.tenants.write().map_err(|_| poisoned())?;
        let counter = tenants
            .entry(tenant_id)
            .or_default()
            .sequences
            .entry(key.to_string())
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn tenants(&self) -> Result<Vec<TenantId>, StoreError> {
        let tenants = self.tenants.read().map_err(|_| poisoned())?;
        Ok(tenants
            .iter()
            .filter(|(_, data)| !data.documents.is_empty())
            .map(|(id, _)| *id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use livebase_bases::{Location, LocationInput, LocationKind};
    use livebase_core::Entity;

    fn location(base: BaseId, code: &str) -> Location {
        Location::create(
            LocationInput {
                base_id: base,
                code: code.into(),
                name: code.into(),
                kind: LocationKind::Warehouse,
                note: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn put_assigns_versions_and_rejects_stale_writes() {
        let store = MemoryDocumentStore::new();
        let tenant = TenantId::new();
        let mut loc = location(BaseId::new(), "A");

        let mut batch = WriteBatch::new();
        batch.put(&mut loc).unwrap();
        store.commit(tenant, batch).await.unwrap();
        assert_eq!(loc.version(), 1);

        let doc = store
            .get(tenant, "locations", &loc.id.to_string())
            .await
            .unwrap()
            .unwrap();
        let mut loaded: Location = doc.decode().unwrap();
        assert_eq!(loaded, loc);

        let mut stale = loaded.clone();
        let mut batch = WriteBatch::new();
        batch.put(&mut loaded).unwrap();
        store.commit(tenant, batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.put(&mut stale).unwrap();
        let err = store.commit(tenant, batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_batch_applies_nothing() {
        let store = MemoryDocumentStore::new();
        let tenant = TenantId::new();
        let mut existing = location(BaseId::new(), "A");
        let mut batch = WriteBatch::new();
        batch.put(&mut existing).unwrap();
        store.commit(tenant, batch).await.unwrap();

        let mut fresh = location(BaseId::new(), "B");
        let mut duplicate = existing.clone();
        duplicate.version = 0;
        let mut batch = WriteBatch::new();
        batch.put(&mut fresh).unwrap();
        batch.put(&mut duplicate).unwrap();
        assert!(store.commit(tenant, batch).await.is_err());

        let all = store.list(tenant, "locations", None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn list_filters_by_base_and_isolates_tenants() {
        let store = MemoryDocumentStore::new();
        let tenant = TenantId::new();
        let (a, b) = (BaseId::new(), BaseId::new());
        let mut batch = WriteBatch::new();
        batch.put(&mut location(a, "A")).unwrap();
        batch.put(&mut location(b, "B")).unwrap();
        store.commit(tenant, batch).await.unwrap();

        assert_eq!(store.list(tenant, "locations", None).await.unwrap().len(), 2);
        let only_a = store.list(tenant, "locations", Some(&[a])).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].base_id, Some(a));
        assert!(store.list(TenantId::new(), "locations", None).await.unwrap().is_empty());
        assert_eq!(store.tenants().await.unwrap(), vec![tenant]);
    }

    #[tokio::test]
    async fn delete_is_version_guarded() {
        let store = MemoryDocumentStore::new();
        let tenant = TenantId::new();
        let mut loc = location(BaseId::new(), "A");
        let mut batch = WriteBatch::new();
        batch.put(&mut loc).unwrap();
        store.commit(tenant, batch).await.unwrap();

        let mut stale = loc.clone();
        stale.version = 7;
        let mut batch = WriteBatch::new();
        batch.delete(&stale);
        assert!(store.commit(tenant, batch).await.is_err());

        let mut batch = WriteBatch::new();
        batch.delete(&loc);
        store.commit(tenant, batch).await.unwrap();
        assert!(store.list(tenant, "locations", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sequences_are_per_tenant_and_key() {
        let store = MemoryDocumentStore::new();
        let (t1, t2) = (TenantId::new(), TenantId::new());
        assert_eq!(store.next_sequence(t1, "PO:20240101").await.unwrap(), 1);
        assert_eq!(store.next_sequence(t1, "PO:20240101").await.unwrap(), 2);
        assert_eq!(store.next_sequence(t1, "PO:20240102").await.unwrap(), 1);
        assert_eq!(store.next_sequence(t2, "PO:20240101").await.unwrap(), 1);
    }
}
