use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, CurrencyCode, DomainError, DomainResult, EntityId, Timestamps, entity_id, impl_record,
    optional_text,
};
use livebase_parties::PartyId;

use crate::order::{PurchaseOrder, PurchaseOrderId};

entity_id!(
    /// Shares the UUID of its purchase order (one payable per order).
    PayableId,
    "PayableId"
);

impl PayableId {
    pub fn for_order(order: PurchaseOrderId) -> Self {
        Self(EntityId::from_uuid(*order.as_uuid()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: i64,
    pub paid_on: NaiveDate,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    pub amount: i64,
    /// Defaults to today.
    pub paid_on: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Amount owed to a supplier for what has arrived on one purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payable {
    pub id: PayableId,
    pub base_id: BaseId,
    pub supplier_id: PartyId,
    pub purchase_order_id: PurchaseOrderId,
    pub purchase_order_code: String,
    pub currency: CurrencyCode,
    pub amount: i64,
    pub paid: i64,
    pub payments: Vec<Payment>,
    pub status: PayableStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Payable, PayableId, "payables", scoped);

impl Payable {
    /// Opened on the first arrival of `order`, with nothing accrued yet.
    pub fn open(order: &PurchaseOrder, now: DateTime<Utc>) -> Self {
        Self {
            id: PayableId::for_order(order.id),
            base_id: order.base_id,
            supplier_id: order.supplier_id,
            purchase_order_id: order.id,
            purchase_order_code: order.code.clone(),
            currency: order.currency,
            amount: 0,
            paid: 0,
            payments: Vec::new(),
            status: PayableStatus::Unpaid,
            timestamps: Timestamps::new(now),
            version: 0,
        }
    }

    pub fn outstanding(&self) -> i64 {
        self.amount - self.paid
    }

    pub fn accrue(&mut self, amount: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if amount < 0 {
            return Err(DomainError::validation("accrued amount must not be negative"));
        }
        self.amount = self
            .amount
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("payable amount overflow"))?;
        self.refresh_status();
        self.timestamps.touch(now);
        Ok(())
    }

    /// Take back an accrual (voided arrival). Fails when more has already
    /// been paid than would remain owed.
    pub fn reverse(&mut self, amount: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let remaining = self.amount - amount;
        if amount < 0 || remaining < 0 {
            return Err(DomainError::invariant("cannot reverse more than was accrued"));
        }
        if self.paid > remaining {
            return Err(DomainError::invariant(format!(
                "payable for {} is already paid beyond {remaining}",
                self.purchase_order_code
            )));
        }
        self.amount = remaining;
        self.refresh_status();
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn record_payment(
        &mut self,
        input: PaymentInput,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if input.amount <= 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        if input.amount > self.outstanding() {
            return Err(DomainError::invariant(format!(
                "payment of {} exceeds outstanding {}",
                input.amount,
                self.outstanding()
            )));
        }
        self.payments.push(Payment {
            amount: input.amount,
            paid_on: input.paid_on.unwrap_or(today),
            note: optional_text("note", input.note.as_deref(), 500)?,
            recorded_at: now,
        });
        self.paid += input.amount;
        self.refresh_status();
        self.timestamps.touch(now);
        Ok(())
    }

    fn refresh_status(&mut self) {
        self.status = if self.paid == 0 {
            PayableStatus::Unpaid
        } else if self.paid >= self.amount {
            PayableStatus::Paid
        } else {
            PayableStatus::PartiallyPaid
        };
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayableFilter {
    pub base_id: Option<BaseId>,
    pub supplier_id: Option<PartyId>,
    pub status: Option<PayableStatus>,
}

impl PayableFilter {
    pub fn matches(&self, p: &Payable) -> bool {
        self.base_id.is_none_or(|b| b == p.base_id)
            && self.supplier_id.is_none_or(|s| s == p.supplier_id)
            && self.status.is_none_or(|s| s == p.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::{line, order_with, today};
    use livebase_products::GoodsId;

    fn payable(amount: i64) -> Payable {
        let po = order_with(vec![line(GoodsId::new(), 1, 1)]).unwrap();
        let mut p = Payable::open(&po, Utc::now());
        assert_eq!(p.id.as_uuid(), po.id.as_uuid());
        p.accrue(amount, Utc::now()).unwrap();
        p
    }

    fn pay(amount: i64) -> PaymentInput {
        PaymentInput {
            amount,
            paid_on: None,
            note: None,
        }
    }

    #[test]
    fn payments_move_status() {
        let mut p = payable(1_000);
        assert_eq!(p.status, PayableStatus::Unpaid);
        p.record_payment(pay(400), today(), Utc::now()).unwrap();
        assert_eq!(p.status, PayableStatus::PartiallyPaid);
        assert_eq!(p.outstanding(), 600);
        assert!(p.record_payment(pay(601), today(), Utc::now()).is_err());
        assert!(p.record_payment(pay(0), today(), Utc::now()).is_err());
        p.record_payment(pay(600), today(), Utc::now()).unwrap();
        assert_eq!(p.status, PayableStatus::Paid);
        assert_eq!(p.payments.len(), 2);
        assert_eq!(p.payments[0].paid_on, today());
    }

    #[test]
    fn reverse_respects_payments() {
        let mut p = payable(1_000);
        p.record_payment(pay(700), today(), Utc::now()).unwrap();
        assert!(p.reverse(400, Utc::now()).is_err());
        p.reverse(300, Utc::now()).unwrap();
        assert_eq!(p.amount, 700);
        assert_eq!(p.status, PayableStatus::Paid);
        assert!(p.reverse(701, Utc::now()).is_err());
    }
}
