use std::marker::PhantomData;
use std::sync::Arc;

use livebase_core::{BaseId, Record, TenantId};

use super::{DocumentStore, StoreError, WriteBatch};

/// Typed access to one record kind of one tenant.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    tenant_id: TenantId,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            tenant_id: self.tenant_id,
            _record: PhantomData,
        }
    }
}

impl<T: Record> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>, tenant_id: TenantId) -> Self {
        Self {
            store,
            tenant_id,
            _record: PhantomData,
        }
    }

    pub async fn get(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        self.get_by_key(&id.to_string()).await
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(self.tenant_id, T::KIND, key)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// All records, or those in `bases` plus tenant-wide ones.
    pub async fn list(&self, bases: Option<&[BaseId]>) -> Result<Vec<T>, StoreError> {
        self.store
            .list(self.tenant_id, T::KIND, bases)
            .await?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// Insert or update one record; its version advances on success.
    pub async fn save(&self, record: &mut T) -> Result<(), StoreError> {
        let mut working = record.clone();
        let mut batch = WriteBatch::new();
        batch.put(&mut working)?;
        self.store.commit(self.tenant_id, batch).await?;
        *record = working;
        Ok(())
    }

    pub async fn delete(&self, record: &T) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(record);
        self.store.commit(self.tenant_id, batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use chrono::Utc;
    use livebase_products::{Goods, GoodsInput};

    fn goods(code: &str) -> Goods {
        Goods::create(
            GoodsInput {
                code: code.into(),
                name: format!("Goods {code}"),
                category: None,
                unit: "pcs".into(),
                units_per_box: 1,
                barcode: None,
                purchase_price: 100,
                retail_price: 150,
                currency: "CNY".parse().unwrap(),
                image_url: None,
                base_id: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_get_list_delete() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let repo: Repository<Goods> = Repository::new(store, TenantId::new());

        let mut g = goods("G-1");
        repo.save(&mut g).await.unwrap();
        assert_eq!(g.version, 1);
        g.name = "Renamed".into();
        repo.save(&mut g).await.unwrap();
        assert_eq!(g.version, 2);

        let loaded = repo.get(&g.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Renamed");
        assert_eq!(loaded.version, 2);

        // Shared goods are visible whatever the base filter.
        assert_eq!(repo.list(Some(&[BaseId::new()])).await.unwrap().len(), 1);

        repo.delete(&loaded).await.unwrap();
        assert!(repo.get(&g.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_save_leaves_record_untouched() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let repo: Repository<Goods> = Repository::new(store, TenantId::new());
        let mut g = goods("G-1");
        repo.save(&mut g).await.unwrap();

        let mut stale = g.clone();
        repo.save(&mut g).await.unwrap();
        let err = repo.save(&mut stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(stale.version, 1);
    }
}
