use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, CurrencyCode, DomainError, DomainResult, Timestamps, date_in_range, entity_id,
    impl_record, matches_keyword, optional_text,
};
use livebase_products::GoodsId;

use crate::lines::{SalesLine, SalesLineInput, build_lines, quantities, total};
use crate::point::{Point, PointId};

entity_id!(PointOrderId, "PointOrderId");

/// `pending → fulfilled → completed`; `cancelled` only from pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOrderStatus {
    Pending,
    Fulfilled,
    Completed,
    Cancelled,
}

/// Replenishment order placed by a point, fulfilled by a stock-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOrder {
    pub id: PointOrderId,
    pub code: String,
    pub base_id: BaseId,
    pub point_id: PointId,
    pub currency: CurrencyCode,
    pub lines: Vec<SalesLine>,
    pub total_amount: i64,
    pub status: PointOrderStatus,
    pub ordered_on: NaiveDate,
    /// Code of the stock-out that fulfilled the order.
    pub stock_out_code: Option<String>,
    pub completed_on: Option<NaiveDate>,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(PointOrder, PointOrderId, "point_orders", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct PointOrderInput {
    pub point_id: PointId,
    pub lines: Vec<SalesLineInput>,
    pub ordered_on: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointOrderUpdate {
    pub lines: Option<Vec<SalesLineInput>>,
    pub note: Option<String>,
}

impl PointOrder {
    pub fn create(
        point: &Point,
        input: PointOrderInput,
        code: String,
        currency: CurrencyCode,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        point.ensure_open()?;
        let lines = build_lines(&input.lines)?;
        Ok(Self {
            id: PointOrderId::new(),
            code,
            base_id: point.base_id,
            point_id: point.id,
            currency,
            total_amount: total(&lines)?,
            lines,
            status: PointOrderStatus::Pending,
            ordered_on: input.ordered_on.unwrap_or(today),
            stock_out_code: None,
            completed_on: None,
            note: optional_text("note", input.note.as_deref(), 500)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    fn ensure_pending(&self, action: &str) -> DomainResult<()> {
        if self.status != PointOrderStatus::Pending {
            return Err(DomainError::invariant(format!(
                "only pending point orders can be {action}"
            )));
        }
        Ok(())
    }

    pub fn update(&mut self, patch: PointOrderUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("modified")?;
        if let Some(lines) = patch.lines {
            let lines = build_lines(&lines)?;
            self.total_amount = total(&lines)?;
            self.lines = lines;
        }
        if patch.note.is_some() {
            self.note = optional_text("note", patch.note.as_deref(), 500)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("cancelled")?;
        self.status = PointOrderStatus::Cancelled;
        self.timestamps.touch(now);
        Ok(())
    }

    /// Mark fulfilled by a stock-out whose quantities must match the order
    /// exactly.
    pub fn fulfill(
        &mut self,
        shipped: &BTreeMap<GoodsId, i64>,
        stock_out_code: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_pending("fulfilled")?;
        if &quantities(&self.lines) != shipped {
            return Err(DomainError::invariant(format!(
                "stock-out lines do not match point order {}",
                self.code
            )));
        }
        self.status = PointOrderStatus::Fulfilled;
        self.stock_out_code = Some(stock_out_code.to_string());
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn complete(&mut self, today: NaiveDate, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PointOrderStatus::Fulfilled {
            return Err(DomainError::invariant("only fulfilled point orders can be completed"));
        }
        self.status = PointOrderStatus::Completed;
        self.completed_on = Some(today);
        self.timestamps.touch(now);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointOrderFilter {
    pub base_id: Option<BaseId>,
    pub point_id: Option<PointId>,
    pub status: Option<PointOrderStatus>,
    pub keyword: Option<String>,
    pub ordered_from: Option<NaiveDate>,
    pub ordered_to: Option<NaiveDate>,
}

impl PointOrderFilter {
    pub fn matches(&self, o: &PointOrder) -> bool {
        self.base_id.is_none_or(|b| b == o.base_id)
            && self.point_id.is_none_or(|p| p == o.point_id)
            && self.status.is_none_or(|s| s == o.status)
            && matches_keyword(self.keyword.as_deref(), &[&o.code])
            && date_in_range(o.ordered_on, self.ordered_from, self.ordered_to)
    }
}
