use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use livebase_bases::{Location, LocationId};
use livebase_core::{
    BaseId, DomainError, DomainResult, Timestamps, date_in_range, entity_id, impl_record,
    matches_keyword, optional_text, required_text,
};
use livebase_products::GoodsId;
use livebase_sales::PointOrderId;

use crate::level::StockSlot;
use crate::movement::MovementReason;
use crate::posting::StockPosting;

entity_id!(StockOutId, "StockOutId");

/// What a stock-out is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StockOutCategory {
    /// Fulfils a point order; lines must match the order exactly.
    PointOrder { point_order_id: PointOrderId },
    /// Moves stock to another location, possibly in another base.
    Transfer {
        target_base_id: BaseId,
        target_location_id: LocationId,
    },
    Manual { reason: String },
}

impl StockOutCategory {
    pub fn kind(&self) -> &'static str {
        match self {
            StockOutCategory::PointOrder { .. } => "point_order",
            StockOutCategory::Transfer { .. } => "transfer",
            StockOutCategory::Manual { .. } => "manual",
        }
    }

    fn outbound_reason(&self) -> MovementReason {
        match self {
            StockOutCategory::PointOrder { .. } => MovementReason::PointOrder,
            StockOutCategory::Transfer { .. } => MovementReason::TransferOut,
            StockOutCategory::Manual { .. } => MovementReason::ManualOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOutLine {
    pub goods_id: GoodsId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOut {
    pub id: StockOutId,
    pub code: String,
    pub base_id: BaseId,
    pub location_id: LocationId,
    pub category: StockOutCategory,
    pub lines: Vec<StockOutLine>,
    pub occurred_on: NaiveDate,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(StockOut, StockOutId, "stock_outs", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct StockOutInput {
    pub location_id: LocationId,
    pub category: StockOutCategory,
    pub lines: Vec<StockOutLine>,
    pub occurred_on: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Merge lines per goods, keeping first-seen order.
fn aggregate(lines: &[StockOutLine]) -> DomainResult<Vec<StockOutLine>> {
    if lines.is_empty() {
        return Err(DomainError::validation("stock-out needs at least one line"));
    }
    let mut out: Vec<StockOutLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        match out.iter_mut().find(|l| l.goods_id == line.goods_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflow"))?;
            }
            None => out.push(line.clone()),
        }
    }
    Ok(out)
}

impl StockOut {
    /// `target` is the resolved target location for transfers.
    pub fn create(
        input: StockOutInput,
        source: &Location,
        target: Option<&Location>,
        code: String,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.location_id != source.id {
            return Err(DomainError::invariant("source location mismatch"));
        }
        let lines = aggregate(&input.lines)?;
        let category = match input.category {
            StockOutCategory::Transfer {
                target_base_id,
                target_location_id,
            } => {
                let target = target
                    .filter(|t| t.id == target_location_id)
                    .ok_or_else(|| DomainError::not_found("target location"))?;
                if target.base_id != target_base_id {
                    return Err(DomainError::invariant(
                        "target location is not in the target base",
                    ));
                }
                if target.id == source.id {
                    return Err(DomainError::invariant(
                        "transfer target must differ from the source location",
                    ));
                }
                StockOutCategory::Transfer {
                    target_base_id,
                    target_location_id,
                }
            }
            StockOutCategory::Manual { reason } => StockOutCategory::Manual {
                reason: required_text("reason", &reason, 200)?,
            },
            other => other,
        };
        Ok(Self {
            id: StockOutId::new(),
            code,
            base_id: source.base_id,
            location_id: source.id,
            category,
            lines,
            occurred_on: input.occurred_on.unwrap_or(today),
            note: optional_text("note", input.note.as_deref(), 500)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn source_slot(&self, goods: GoodsId) -> StockSlot {
        StockSlot::new(self.base_id, self.location_id, goods)
    }

    /// Slots read or written by this stock-out.
    pub fn slots(&self) -> Vec<StockSlot> {
        let mut slots: Vec<StockSlot> = self.lines.iter().map(|l| self.source_slot(l.goods_id)).collect();
        if let StockOutCategory::Transfer {
            target_base_id,
            target_location_id,
        } = &self.category
        {
            slots.extend(
                self.lines
                    .iter()
                    .map(|l| StockSlot::new(*target_base_id, *target_location_id, l.goods_id)),
            );
        }
        slots
    }

    /// Post outbound movements (and inbound ones at the target for transfers).
    pub fn post(&self, posting: &mut StockPosting) -> DomainResult<()> {
        let reason = self.category.outbound_reason();
        for line in &self.lines {
            posting.post(self.source_slot(line.goods_id), -line.quantity, reason, self.note.clone())?;
        }
        if let StockOutCategory::Transfer {
            target_base_id,
            target_location_id,
        } = &self.category
        {
            for line in &self.lines {
                posting.post(
                    StockSlot::new(*target_base_id, *target_location_id, line.goods_id),
                    line.quantity,
                    MovementReason::TransferIn,
                    self.note.clone(),
                )?;
            }
        }
        Ok(())
    }

    pub fn quantities(&self) -> BTreeMap<GoodsId, i64> {
        self.lines.iter().map(|l| (l.goods_id, l.quantity)).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockOutFilter {
    pub base_id: Option<BaseId>,
    pub location_id: Option<LocationId>,
    /// `point_order`, `transfer` or `manual`.
    pub category: Option<String>,
    pub keyword: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl StockOutFilter {
    pub fn matches(&self, s: &StockOut) -> bool {
        self.base_id.is_none_or(|b| b == s.base_id)
            && self.location_id.is_none_or(|l| l == s.location_id)
            && self
                .category
                .as_deref()
                .is_none_or(|c| c == s.category.kind())
            && matches_keyword(self.keyword.as_deref(), &[&s.code])
            && date_in_range(s.occurred_on, self.from, self.to)
    }
}
