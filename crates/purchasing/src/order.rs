use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, CurrencyCode, DomainError, DomainResult, Timestamps, date_in_range, entity_id,
    impl_record, line_amount, matches_keyword, optional_text, sum_amounts,
};
use livebase_parties::PartyId;
use livebase_products::GoodsId;

entity_id!(PurchaseOrderId, "PurchaseOrderId");

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Pending,
    PartiallyArrived,
    Arrived,
    Cancelled,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub line_no: u32,
    pub goods_id: GoodsId,
    pub quantity: i64,
    /// Minor units.
    pub unit_price: i64,
    #[serde(default)]
    pub arrived_quantity: i64,
}

impl PurchaseLine {
    pub fn outstanding(&self) -> i64 {
        self.quantity - self.arrived_quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PurchaseLineInput {
    pub goods_id: GoodsId,
    pub quantity: i64,
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub code: String,
    pub base_id: BaseId,
    pub supplier_id: PartyId,
    pub currency: CurrencyCode,
    pub lines: Vec<PurchaseLine>,
    pub status: PurchaseOrderStatus,
    pub total_amount: i64,
    pub ordered_on: NaiveDate,
    pub expected_on: Option<NaiveDate>,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(PurchaseOrder, PurchaseOrderId, "purchase_orders", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseOrderInput {
    pub base_id: BaseId,
    pub supplier_id: PartyId,
    /// Defaults to the base currency.
    pub currency: Option<CurrencyCode>,
    pub lines: Vec<PurchaseLineInput>,
    /// Defaults to today.
    pub ordered_on: Option<NaiveDate>,
    pub expected_on: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderUpdate {
    pub lines: Option<Vec<PurchaseLineInput>>,
    pub ordered_on: Option<NaiveDate>,
    pub expected_on: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Validate lines and merge repeated goods into one line.
fn build_lines(inputs: &[PurchaseLineInput]) -> DomainResult<Vec<PurchaseLine>> {
    if inputs.is_empty() {
        return Err(DomainError::validation("purchase order needs at least one line"));
    }
    let mut merged: Vec<PurchaseLine> = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if input.unit_price < 0 {
            return Err(DomainError::validation("unit_price must not be negative"));
        }
        match merged.iter_mut().find(|l| l.goods_id == input.goods_id) {
            Some(line) => {
                if line.unit_price != input.unit_price {
                    return Err(DomainError::validation(format!(
                        "goods {} appears twice with different prices",
                        input.goods_id
                    )));
                }
                line.quantity = line
                    .quantity
                    .checked_add(input.quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflow"))?;
            }
            None => merged.push(PurchaseLine {
                line_no: merged.len() as u32 + 1,
                goods_id: input.goods_id,
                quantity: input.quantity,
                unit_price: input.unit_price,
                arrived_quantity: 0,
            }),
        }
    }
    Ok(merged)
}

fn total(lines: &[PurchaseLine]) -> DomainResult<i64> {
    sum_amounts(
        lines
            .iter()
            .map(|l| line_amount(l.quantity, l.unit_price))
            .collect::<DomainResult<Vec<_>>>()?,
    )
}

fn check_dates(ordered_on: NaiveDate, expected_on: Option<NaiveDate>) -> DomainResult<()> {
    if expected_on.is_some_and(|e| e < ordered_on) {
        return Err(DomainError::validation("expected_on must not be before ordered_on"));
    }
    Ok(())
}

impl PurchaseOrder {
    /// Cross-record checks (supplier, goods, base) are the caller's job; this
    /// validates the order's own shape.
    pub fn create(
        input: PurchaseOrderInput,
        code: String,
        currency: CurrencyCode,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let lines = build_lines(&input.lines)?;
        let ordered_on = input.ordered_on.unwrap_or(today);
        check_dates(ordered_on, input.expected_on)?;
        Ok(Self {
            id: PurchaseOrderId::new(),
            code,
            base_id: input.base_id,
            supplier_id: input.supplier_id,
            currency,
            total_amount: total(&lines)?,
            lines,
            status: PurchaseOrderStatus::Pending,
            ordered_on,
            expected_on: input.expected_on,
            note: optional_text("note", input.note.as_deref(), 500)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    fn ensure_untouched(&self, action: &str) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Pending || self.has_arrivals() {
            return Err(DomainError::invariant(format!(
                "only pending purchase orders without arrivals can be {action}"
            )));
        }
        Ok(())
    }

    pub fn update(&mut self, patch: PurchaseOrderUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_untouched("modified")?;
        if let Some(lines) = patch.lines {
            let lines = build_lines(&lines)?;
            self.total_amount = total(&lines)?;
            self.lines = lines;
        }
        let ordered_on = patch.ordered_on.unwrap_or(self.ordered_on);
        let expected_on = patch.expected_on.or(self.expected_on);
        check_dates(ordered_on, expected_on)?;
        self.ordered_on = ordered_on;
        self.expected_on = expected_on;
        if patch.note.is_some() {
            self.note = optional_text("note", patch.note.as_deref(), 500)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_untouched("cancelled")?;
        self.status = PurchaseOrderStatus::Cancelled;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        self.ensure_untouched("deleted")
    }

    pub fn has_arrivals(&self) -> bool {
        self.lines.iter().any(|l| l.arrived_quantity > 0)
    }

    pub fn line_for(&self, goods: GoodsId) -> Option<&PurchaseLine> {
        self.lines.iter().find(|l| l.goods_id == goods)
    }

    /// Book arrived quantities (already aggregated per goods). Returns the
    /// unit price of each received goods, in input order.
    pub fn receive(&mut self, arrived: &[(GoodsId, i64)], now: DateTime<Utc>) -> DomainResult<Vec<i64>> {
        if !matches!(
            self.status,
            PurchaseOrderStatus::Pending | PurchaseOrderStatus::PartiallyArrived
        ) {
            return Err(DomainError::invariant(format!(
                "purchase order {} can no longer receive goods",
                self.code
            )));
        }
        let mut prices = Vec::with_capacity(arrived.len());
        for (goods, qty) in arrived {
            let line = self
                .lines
                .iter_mut()
                .find(|l| l.goods_id == *goods)
                .ok_or_else(|| {
                    DomainError::invariant(format!("goods {goods} is not on purchase order"))
                })?;
            if *qty <= 0 {
                return Err(DomainError::validation("arrival quantity must be positive"));
            }
            if *qty > line.outstanding() {
                return Err(DomainError::invariant(format!(
                    "arrival of {qty} exceeds outstanding quantity {} for line {}",
                    line.outstanding(),
                    line.line_no
                )));
            }
            line.arrived_quantity += qty;
            prices.push(line.unit_price);
        }
        self.refresh_status();
        self.timestamps.touch(now);
        Ok(prices)
    }

    /// Reverse a previous [`PurchaseOrder::receive`].
    pub fn unreceive(&mut self, arrived: &[(GoodsId, i64)], now: DateTime<Utc>) -> DomainResult<()> {
        for (goods, qty) in arrived {
            let line = self
                .lines
                .iter_mut()
                .find(|l| l.goods_id == *goods)
                .ok_or_else(|| {
                    DomainError::invariant(format!("goods {goods} is not on purchase order"))
                })?;
            if *qty > line.arrived_quantity {
                return Err(DomainError::invariant(format!(
                    "cannot reverse {qty} units on line {}: only {} arrived",
                    line.line_no, line.arrived_quantity
                )));
            }
            line.arrived_quantity -= qty;
        }
        self.refresh_status();
        self.timestamps.touch(now);
        Ok(())
    }

    fn refresh_status(&mut self) {
        self.status = if self.lines.iter().all(|l| l.outstanding() == 0) {
            PurchaseOrderStatus::Arrived
        } else if self.has_arrivals() {
            PurchaseOrderStatus::PartiallyArrived
        } else {
            PurchaseOrderStatus::Pending
        };
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    pub base_id: Option<BaseId>,
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<PartyId>,
    pub keyword: Option<String>,
    pub ordered_from: Option<NaiveDate>,
    pub ordered_to: Option<NaiveDate>,
}

impl PurchaseOrderFilter {
    pub fn matches(&self, o: &PurchaseOrder) -> bool {
        self.base_id.is_none_or(|b| b == o.base_id)
            && self.status.is_none_or(|s| s == o.status)
            && self.supplier_id.is_none_or(|s| s == o.supplier_id)
            && matches_keyword(self.keyword.as_deref(), &[&o.code])
            && date_in_range(o.ordered_on, self.ordered_from, self.ordered_to)
    }
}

/// Aggregate quantities per goods, keeping first-seen order.
pub(crate) fn aggregate_quantities(lines: impl IntoIterator<Item = (GoodsId, i64)>) -> Vec<(GoodsId, i64)> {
    let mut order = Vec::new();
    let mut totals: BTreeMap<GoodsId, i64> = BTreeMap::new();
    for (goods, qty) in lines {
        let entry = totals.entry(goods).or_insert_with(|| {
            order.push(goods);
            0
        });
        *entry = entry.saturating_add(qty);
    }
    order.into_iter().map(|g| (g, totals[&g])).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    pub(crate) fn order_with(lines: Vec<PurchaseLineInput>) -> DomainResult<PurchaseOrder> {
        PurchaseOrder::create(
            PurchaseOrderInput {
                base_id: BaseId::new(),
                supplier_id: PartyId::new(),
                currency: None,
                lines,
                ordered_on: None,
                expected_on: None,
                note: None,
            },
            "PO-20240301-0001".into(),
            CurrencyCode::parse("CNY").unwrap(),
            today(),
            Utc::now(),
        )
    }

    pub(crate) fn line(goods: GoodsId, quantity: i64, unit_price: i64) -> PurchaseLineInput {
        PurchaseLineInput {
            goods_id: goods,
            quantity,
            unit_price,
        }
    }

    #[test]
    fn create_merges_duplicate_goods_and_totals() {
        let g = GoodsId::new();
        let h = GoodsId::new();
        let po = order_with(vec![line(g, 2, 100), line(h, 1, 50), line(g, 3, 100)]).unwrap();
        assert_eq!(po.lines.len(), 2);
        assert_eq!(po.lines[0].quantity, 5);
        assert_eq!(po.lines[1].line_no, 2);
        assert_eq!(po.total_amount, 550);
        assert_eq!(po.ordered_on, today());
        assert_eq!(po.status, PurchaseOrderStatus::Pending);
    }

    #[test]
    fn create_rejects_bad_lines() {
        assert!(order_with(vec![]).is_err());
        assert!(order_with(vec![line(GoodsId::new(), 0, 1)]).is_err());
        assert!(order_with(vec![line(GoodsId::new(), 1, -1)]).is_err());
        let g = GoodsId::new();
        assert!(order_with(vec![line(g, 1, 1), line(g, 1, 2)]).is_err());
        assert!(matches!(
            order_with(vec![line(GoodsId::new(), i64::MAX, 2)]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn partial_then_full_arrival() {
        let g = GoodsId::new();
        let mut po = order_with(vec![line(g, 10, 100)]).unwrap();

        assert_eq!(po.receive(&[(g, 4)], Utc::now()).unwrap(), vec![100]);
        assert_eq!(po.status, PurchaseOrderStatus::PartiallyArrived);
        assert!(po.update(PurchaseOrderUpdate::default(), Utc::now()).is_err());
        assert!(po.cancel(Utc::now()).is_err());

        assert!(po.receive(&[(g, 7)], Utc::now()).is_err());
        po.receive(&[(g, 6)], Utc::now()).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Arrived);
        assert!(po.receive(&[(g, 1)], Utc::now()).is_err());

        po.unreceive(&[(g, 6)], Utc::now()).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::PartiallyArrived);
        po.unreceive(&[(g, 4)], Utc::now()).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Pending);
        assert!(po.unreceive(&[(g, 1)], Utc::now()).is_err());
    }

    #[test]
    fn unknown_goods_cannot_arrive() {
        let mut po = order_with(vec![line(GoodsId::new(), 1, 1)]).unwrap();
        assert!(po.receive(&[(GoodsId::new(), 1)], Utc::now()).is_err());
    }

    #[test]
    fn cancel_only_from_pending() {
        let mut po = order_with(vec![line(GoodsId::new(), 1, 1)]).unwrap();
        po.cancel(Utc::now()).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Cancelled);
        assert!(po.cancel(Utc::now()).is_err());
        assert!(po.receive(&[(po.lines[0].goods_id, 1)], Utc::now()).is_err());
    }

    #[test]
    fn update_replaces_lines_and_checks_dates() {
        let mut po = order_with(vec![line(GoodsId::new(), 1, 1)]).unwrap();
        po.update(
            PurchaseOrderUpdate {
                lines: Some(vec![line(GoodsId::new(), 3, 7)]),
                expected_on: Some(today().succ_opt().unwrap()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(po.total_amount, 21);

        let bad = PurchaseOrderUpdate {
            expected_on: today().pred_opt(),
            ..Default::default()
        };
        assert!(po.update(bad, Utc::now()).is_err());
    }

    #[test]
    fn aggregates_quantities_in_first_seen_order() {
        let a = GoodsId::new();
        let b = GoodsId::new();
        assert_eq!(
            aggregate_quantities([(b, 1), (a, 2), (b, 3)]),
            vec![(b, 4), (a, 2)]
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Whatever sequence of arrivals is attempted, booked quantities
            /// never exceed what was ordered.
            #[test]
            fn arrivals_never_exceed_ordered(ordered in 1i64..1_000, attempts in prop::collection::vec(1i64..400, 1..20)) {
                let g = GoodsId::new();
                let mut po = order_with(vec![line(g, ordered, 10)]).unwrap();
                for qty in attempts {
                    let _ = po.receive(&[(g, qty)], Utc::now());
                    prop_assert!(po.lines[0].arrived_quantity <= ordered);
                    prop_assert!(po.lines[0].arrived_quantity >= 0);
                }
                let done = po.lines[0].arrived_quantity == ordered;
                prop_assert_eq!(done, po.status == PurchaseOrderStatus::Arrived);
            }
        }
    }
}
