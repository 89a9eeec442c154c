//! Dashboard figures.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use livebase_auth::Action;
use livebase_core::{line_amount, BaseId, CurrencyCode, DomainResult};
use livebase_inventory::StockLevel;
use livebase_products::{Goods, GoodsId};
use livebase_purchasing::{Payable, PurchaseOrder, PurchaseOrderStatus};
use livebase_sales::{DistributionOrder, DistributionStatus, Point, PointOrder, PointOrderStatus};

use super::TenantServices;
use crate::app::dto::SalesStatsQuery;
use crate::app::errors::ServiceResult;

pub const STATS: &str = "stats";

#[derive(Debug, Clone, Default, Serialize)]
pub struct Overview {
    pub goods: usize,
    pub points: usize,
    pub open_purchase_orders: usize,
    pub pending_point_orders: usize,
    pub stock_units: i64,
    /// Minor units per currency code.
    pub stock_value: BTreeMap<String, i64>,
    pub payables_outstanding: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesDay {
    pub date: NaiveDate,
    pub currency: CurrencyCode,
    pub point_orders: i64,
    pub distribution_orders: i64,
    pub total: i64,
}

fn add(totals: &mut BTreeMap<String, i64>, currency: CurrencyCode, amount: i64) {
    let slot = totals.entry(currency.to_string()).or_default();
    *slot = slot.saturating_add(amount);
}

fn stock_figures(
    levels: &[StockLevel],
    goods: &HashMap<GoodsId, Goods>,
) -> DomainResult<(i64, BTreeMap<String, i64>)> {
    let mut units = 0i64;
    let mut value = BTreeMap::new();
    for level in levels {
        units = units.saturating_add(level.on_hand);
        if let Some(g) = goods.get(&level.goods_id) {
            add(&mut value, g.currency, line_amount(level.on_hand, g.purchase_price)?);
        }
    }
    Ok((units, value))
}

/// Per-day, per-currency sales rows in date order.
fn sales_days(
    point_orders: &[PointOrder],
    distribution_orders: &[DistributionOrder],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<SalesDay> {
    let in_range = |d: NaiveDate| livebase_core::date_in_range(d, from, to);
    let mut days: BTreeMap<(NaiveDate, CurrencyCode), (i64, i64)> = BTreeMap::new();

    for o in point_orders
        .iter()
        .filter(|o| o.status == PointOrderStatus::Completed)
    {
        if let Some(date) = o.completed_on.filter(|d| in_range(*d)) {
            let entry = days.entry((date, o.currency)).or_default();
            entry.0 = entry.0.saturating_add(o.total_amount);
        }
    }
    for o in distribution_orders.iter().filter(|o| {
        matches!(o.status, DistributionStatus::Shipped | DistributionStatus::Settled)
    }) {
        if let Some(date) = o.shipped_on.filter(|d| in_range(*d)) {
            let entry = days.entry((date, o.currency)).or_default();
            entry.1 = entry.1.saturating_add(o.total_amount);
        }
    }

    days.into_iter()
        .map(|((date, currency), (point_orders, distribution_orders))| SalesDay {
            date,
            currency,
            point_orders,
            distribution_orders,
            total: point_orders.saturating_add(distribution_orders),
        })
        .collect()
}

impl TenantServices {
    pub async fn overview(&self, base_id: Option<BaseId>) -> ServiceResult<Overview> {
        self.require(STATS, Action::Read)?;
        let goods: Vec<Goods> = self.list(base_id).await?;
        let points: Vec<Point> = self.list(base_id).await?;
        let purchases: Vec<PurchaseOrder> = self.list(base_id).await?;
        let point_orders: Vec<PointOrder> = self.list(base_id).await?;
        let levels: Vec<StockLevel> = self.list(base_id).await?;
        let payables: Vec<Payable> = self.list(base_id).await?;

        // Stock may reference shared goods outside the narrowed list.
        let catalog: HashMap<GoodsId, Goods> = self
            .list_all::<Goods>()
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();
        let (stock_units, stock_value) = stock_figures(&levels, &catalog)?;

        let mut payables_outstanding = BTreeMap::new();
        for p in &payables {
            add(&mut payables_outstanding, p.currency, p.outstanding());
        }

        Ok(Overview {
            goods: goods.len(),
            points: points.len(),
            open_purchase_orders: purchases
                .iter()
                .filter(|o| {
                    matches!(
                        o.status,
                        PurchaseOrderStatus::Pending | PurchaseOrderStatus::PartiallyArrived
                    )
                })
                .count(),
            pending_point_orders: point_orders
                .iter()
                .filter(|o| o.status == PointOrderStatus::Pending)
                .count(),
            stock_units,
            stock_value,
            payables_outstanding,
        })
    }

    pub async fn sales_stats(&self, query: SalesStatsQuery) -> ServiceResult<Vec<SalesDay>> {
        self.require(STATS, Action::Read)?;
        let point_orders: Vec<PointOrder> = self.list(query.base_id).await?;
        let distribution_orders: Vec<DistributionOrder> = self.list(query.base_id).await?;
        Ok(sales_days(&point_orders, &distribution_orders, query.from, query.to))
    }
}
