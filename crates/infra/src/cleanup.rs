//! Periodic removal of stale cancelled orders.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use livebase_core::{Record, TenantId};
use livebase_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use livebase_sales::{DistributionOrder, DistributionStatus, PointOrder, PointOrderStatus};

use crate::store::{DocumentStore, Repository, StoreError, WriteBatch};

/// Counts of records removed by one run, summed over all tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub tenants: usize,
    pub purchase_orders: usize,
    pub point_orders: usize,
    pub distribution_orders: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.purchase_orders + self.point_orders + self.distribution_orders
    }
}

#[derive(Clone)]
pub struct CleanupJob {
    store: Arc<dyn DocumentStore>,
    retention_days: u32,
}

impl CleanupJob {
    pub fn new(store: Arc<dyn DocumentStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Delete cancelled orders last updated before `now - retention_days`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<CleanupReport, StoreError> {
        let cutoff = now - chrono::Duration::days(i64::from(self.retention_days));
        let mut report = CleanupReport::default();

        for tenant_id in self.store.tenants().await? {
            report.tenants += 1;
            report.purchase_orders += self
                .purge::<PurchaseOrder>(tenant_id, |o| {
                    o.status == PurchaseOrderStatus::Cancelled && o.timestamps.updated_at < cutoff
                })
                .await?;
            report.point_orders += self
                .purge::<PointOrder>(tenant_id, |o| {
                    o.status == PointOrderStatus::Cancelled && o.timestamps.updated_at < cutoff
                })
                .await?;
            report.distribution_orders += self
                .purge::<DistributionOrder>(tenant_id, |o| {
                    o.status == DistributionStatus::Cancelled && o.timestamps.updated_at < cutoff
                })
                .await?;
        }

        info!(
            tenants = report.tenants,
            purchase_orders = report.purchase_orders,
            point_orders = report.point_orders,
            distribution_orders = report.distribution_orders,
            %cutoff,
            "cleanup finished"
        );
        Ok(report)
    }

    async fn purge<T: Record>(
        &self,
        tenant_id: TenantId,
        stale: impl Fn(&T) -> bool,
    ) -> Result<usize, StoreError> {
        let records = Repository::<T>::new(self.store.clone(), tenant_id)
            .list(None)
            .await?;
        let mut batch = WriteBatch::new();
        for record in records.iter().filter(|r| stale(r)) {
            batch.delete(record);
        }
        let removed = batch.len();
        if removed > 0 {
            self.store.commit(tenant_id, batch).await?;
            debug!(%tenant_id, kind = T::KIND, removed, "stale records deleted");
        }
        Ok(removed)
    }

    /// Run every `interval` until the returned task is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once(Utc::now()).await {
                    error!(error = %err, "cleanup run failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use chrono::{NaiveDate, TimeZone};
    use livebase_core::{BaseId, CurrencyCode};
    use livebase_parties::PartyId;
    use livebase_products::GoodsId;
    use livebase_purchasing::{PurchaseLineInput, PurchaseOrderInput};

    fn order(code: &str, at: DateTime<Utc>) -> PurchaseOrder {
        PurchaseOrder::create(
            PurchaseOrderInput {
                base_id: BaseId::new(),
                supplier_id: PartyId::new(),
                currency: None,
                lines: vec![PurchaseLineInput {
                    goods_id: GoodsId::new(),
                    quantity: 5,
                    unit_price: 100,
                }],
                ordered_on: None,
                expected_on: None,
                note: None,
            },
            code.into(),
            "CNY".parse::<CurrencyCode>().unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            at,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn removes_only_stale_cancelled_orders() {
        let store = Arc::new(MemoryDocumentStore::new());
        let tenant = TenantId::new();
        let old = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut stale = order("PO-20240101-0001", old);
        stale.cancel(old).unwrap();
        let mut recent = order("PO-20240101-0002", old);
        recent.cancel(now).unwrap();
        let mut open = order("PO-20240101-0003", old);

        let mut batch = WriteBatch::new();
        batch.put(&mut stale).unwrap();
        batch.put(&mut recent).unwrap();
        batch.put(&mut open).unwrap();
        store.commit(tenant, batch).await.unwrap();

        let job = CleanupJob::new(store.clone(), 90);
        let report = job.run_once(now).await.unwrap();
        assert_eq!(report.tenants, 1);
        assert_eq!(report.purchase_orders, 1);
        assert_eq!(report.total(), 1);

        let left: Vec<PurchaseOrder> = Repository::new(store.clone(), tenant)
            .list(None)
            .await
            .unwrap();
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|o| o.id != stale.id));

        let again = job.run_once(now).await.unwrap();
        assert_eq!(again.total(), 0);
    }
}
