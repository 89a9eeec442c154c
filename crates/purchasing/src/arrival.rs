use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use livebase_bases::{Location, LocationId};
use livebase_core::{
    BaseId, CurrencyCode, DomainError, DomainResult, Timestamps, date_in_range, entity_id,
    impl_record, line_amount, matches_keyword, optional_text, sum_amounts,
};
use livebase_parties::PartyId;
use livebase_products::GoodsId;

use crate::order::{PurchaseOrder, PurchaseOrderId, aggregate_quantities};

entity_id!(ArrivalId, "ArrivalId");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalStatus {
    #[default]
    Recorded,
    Voided,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalLine {
    pub goods_id: GoodsId,
    pub quantity: i64,
    /// Copied from the purchase order line.
    pub unit_price: i64,
}

/// Goods physically arriving against a purchase order. An order may be
/// fulfilled by several arrivals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    pub id: ArrivalId,
    pub code: String,
    pub base_id: BaseId,
    pub purchase_order_id: PurchaseOrderId,
    pub purchase_order_code: String,
    pub supplier_id: PartyId,
    pub location_id: LocationId,
    pub currency: CurrencyCode,
    pub lines: Vec<ArrivalLine>,
    /// Σ quantity × unit_price, accrued on the payable.
    pub amount: i64,
    pub status: ArrivalStatus,
    pub arrived_on: NaiveDate,
    pub voided_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Arrival, ArrivalId, "arrivals", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct ArrivalLineInput {
    pub goods_id: GoodsId,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrivalInput {
    pub purchase_order_id: PurchaseOrderId,
    pub location_id: LocationId,
    pub lines: Vec<ArrivalLineInput>,
    /// Defaults to today.
    pub arrived_on: Option<NaiveDate>,
    pub note: Option<String>,
}

impl Arrival {
    /// Record an arrival, booking it on `order`.
    ///
    /// The caller persists the returned arrival together with the mutated
    /// order, the stock movements and the payable in one commit.
    pub fn record(
        order: &mut PurchaseOrder,
        location: &Location,
        input: ArrivalInput,
        code: String,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.purchase_order_id != order.id {
            return Err(DomainError::invariant("arrival refers to a different purchase order"));
        }
        if location.base_id != order.base_id {
            return Err(DomainError::invariant(format!(
                "location {} is not in the purchase order's base",
                location.code
            )));
        }
        if input.lines.is_empty() {
            return Err(DomainError::validation("arrival needs at least one line"));
        }
        if input.lines.iter().any(|l| l.quantity <= 0) {
            return Err(DomainError::validation("arrival quantity must be positive"));
        }

        let quantities = aggregate_quantities(input.lines.iter().map(|l| (l.goods_id, l.quantity)));
        let prices = order.receive(&quantities, now)?;
        let lines: Vec<ArrivalLine> = quantities
            .into_iter()
            .zip(prices)
            .map(|((goods_id, quantity), unit_price)| ArrivalLine {
                goods_id,
                quantity,
                unit_price,
            })
            .collect();
        let amount = sum_amounts(
            lines
                .iter()
                .map(|l| line_amount(l.quantity, l.unit_price))
                .collect::<DomainResult<Vec<_>>>()?,
        )?;

        Ok(Self {
            id: ArrivalId::new(),
            code,
            base_id: order.base_id,
            purchase_order_id: order.id,
            purchase_order_code: order.code.clone(),
            supplier_id: order.supplier_id,
            location_id: location.id,
            currency: order.currency,
            lines,
            amount,
            status: ArrivalStatus::Recorded,
            arrived_on: input.arrived_on.unwrap_or(today),
            voided_at: None,
            note: optional_text("note", input.note.as_deref(), 500)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    /// Reverse the arrival on its order. Stock and payable reversal are
    /// checked by their own records.
    pub fn void(&mut self, order: &mut PurchaseOrder, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == ArrivalStatus::Voided {
            return Err(DomainError::invariant(format!("arrival {} is already voided", self.code)));
        }
        if order.id != self.purchase_order_id {
            return Err(DomainError::invariant("arrival refers to a different purchase order"));
        }
        let quantities: Vec<(GoodsId, i64)> =
            self.lines.iter().map(|l| (l.goods_id, l.quantity)).collect();
        order.unreceive(&quantities, now)?;
        self.status = ArrivalStatus::Voided;
        self.voided_at = Some(now);
        self.timestamps.touch(now);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrivalFilter {
    pub base_id: Option<BaseId>,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub status: Option<ArrivalStatus>,
    pub keyword: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ArrivalFilter {
    pub fn matches(&self, a: &Arrival) -> bool {
        self.base_id.is_none_or(|b| b == a.base_id)
            && self.purchase_order_id.is_none_or(|p| p == a.purchase_order_id)
            && self.status.is_none_or(|s| s == a.status)
            && matches_keyword(self.keyword.as_deref(), &[&a.code, &a.purchase_order_code])
            && date_in_range(a.arrived_on, self.from, self.to)
    }
}
