//! Purchase orders, arrivals and supplier payables.

use serde::Serialize;
use tracing::info;

use livebase_auth::Action;
use livebase_bases::Location;
use livebase_core::{DocumentPrefix, DomainError, Page, PageRequest, paginate};
use livebase_infra::WriteBatch;
use livebase_inventory::{MovementReason, MovementRef, StockSlot};
use livebase_parties::PartyKind;
use livebase_products::GoodsId;
use livebase_purchasing::{
    Arrival, ArrivalFilter, ArrivalId, ArrivalInput, Payable, PayableFilter, PayableId,
    PaymentInput, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderId, PurchaseOrderInput,
    PurchaseOrderUpdate,
};

use super::{Change, TenantServices};
use crate::app::errors::ServiceResult;

pub const PURCHASES: &str = "purchases";
pub const ARRIVALS: &str = "arrivals";
pub const PAYABLES: &str = "payables";

/// A payable as shown to clients, with its outstanding balance.
#[derive(Debug, Clone, Serialize)]
pub struct PayableView {
    #[serde(flatten)]
    pub payable: Payable,
    pub outstanding: i64,
}

impl From<Payable> for PayableView {
    fn from(payable: Payable) -> Self {
        Self {
            outstanding: payable.outstanding(),
            payable,
        }
    }
}

impl TenantServices {
    // -------------------------
    // Purchase orders
    // -------------------------

    pub async fn list_purchase_orders(
        &self,
        filter: PurchaseOrderFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<PurchaseOrder>> {
        self.require(PURCHASES, Action::Read)?;
        let mut orders: Vec<PurchaseOrder> = self.list(filter.base_id).await?;
        orders.retain(|o| filter.matches(o));
        orders.sort_by(|a, b| b.ordered_on.cmp(&a.ordered_on).then_with(|| b.code.cmp(&a.code)));
        Ok(paginate(orders, &page))
    }

    pub async fn get_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.require(PURCHASES, Action::Read)?;
        self.find(&id).await
    }

    pub async fn create_purchase_order(&self, input: PurchaseOrderInput) -> ServiceResult<PurchaseOrder> {
        self.require(PURCHASES, Action::Write)?;
        let base = self.writable_base(input.base_id).await?;
        self.trading_party(input.supplier_id, PartyKind::Supplier, base.id)
            .await?;
        let goods: Vec<GoodsId> = input.lines.iter().map(|l| l.goods_id).collect();
        self.orderable_goods(goods, base.id).await?;

        let currency = input.currency.unwrap_or(base.currency);
        let today = self.today();
        let code = self
            .next_code(DocumentPrefix::PurchaseOrder, input.ordered_on.unwrap_or(today))
            .await?;
        let mut order = PurchaseOrder::create(input, code, currency, today, self.now())?;
        self.save(PURCHASES, &mut order, "created").await?;
        info!(
            tenant_id = %self.tenant_id(),
            base_id = %order.base_id,
            purchase_order_id = %order.id,
            code = %order.code,
            total_amount = order.total_amount,
            "purchase order created"
        );
        Ok(order)
    }

    pub async fn update_purchase_order(
        &self,
        id: PurchaseOrderId,
        patch: PurchaseOrderUpdate,
    ) -> ServiceResult<PurchaseOrder> {
        self.require(PURCHASES, Action::Write)?;
        let mut order: PurchaseOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        if let Some(lines) = &patch.lines {
            let goods: Vec<GoodsId> = lines.iter().map(|l| l.goods_id).collect();
            self.orderable_goods(goods, order.base_id).await?;
        }
        order.update(patch, self.now())?;
        self.save(PURCHASES, &mut order, "updated").await?;
        Ok(order)
    }

    pub async fn cancel_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.require(PURCHASES, Action::Write)?;
        let mut order: PurchaseOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        order.cancel(self.now())?;
        self.save(PURCHASES, &mut order, "cancelled").await?;
        info!(tenant_id = %self.tenant_id(), purchase_order_id = %order.id, code = %order.code, "purchase order cancelled");
        Ok(order)
    }

    pub async fn delete_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<()> {
        self.require(PURCHASES, Action::Delete)?;
        let order: PurchaseOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        order.ensure_deletable()?;
        self.remove(PURCHASES, &order).await?;
        info!(tenant_id = %self.tenant_id(), purchase_order_id = %id, "purchase order deleted");
        Ok(())
    }

    // -------------------------
    // Arrivals
    // -------------------------

    pub async fn list_arrivals(&self, filter: ArrivalFilter, page: PageRequest) -> ServiceResult<Page<Arrival>> {
        self.require(ARRIVALS, Action::Read)?;
        let mut arrivals: Vec<Arrival> = self.list(filter.base_id).await?;
        arrivals.retain(|a| filter.matches(a));
        arrivals.sort_by(|a, b| b.arrived_on.cmp(&a.arrived_on).then_with(|| b.code.cmp(&a.code)));
        Ok(paginate(arrivals, &page))
    }

    pub async fn get_arrival(&self, id: ArrivalId) -> ServiceResult<Arrival> {
        self.require(ARRIVALS, Action::Read)?;
        self.find(&id).await
    }

    /// Book goods in against a purchase order. The order, the stock and the
    /// supplier payable change in one commit.
    pub async fn record_arrival(&self, input: ArrivalInput) -> ServiceResult<Arrival> {
        self.require(ARRIVALS, Action::Write)?;
        let mut order: PurchaseOrder = self.find(&input.purchase_order_id).await?;
        self.writable_base(order.base_id).await?;
        let location: Location = self.find(&input.location_id).await?;

        let today = self.today();
        let now = self.now();
        let code = self
            .next_code(DocumentPrefix::Arrival, input.arrived_on.unwrap_or(today))
            .await?;
        let mut arrival = Arrival::record(&mut order, &location, input, code, today, now)?;

        let slots: Vec<StockSlot> = arrival
            .lines
            .iter()
            .map(|l| StockSlot::new(arrival.base_id, arrival.location_id, l.goods_id))
            .collect();
        let reference = MovementRef::new("arrival", arrival.id, Some(&arrival.code));
        let mut posting = self.stock_posting(&slots, reference, now).await?;
        for (slot, line) in slots.iter().zip(&arrival.lines) {
            posting.post(*slot, line.quantity, MovementReason::Arrival, None)?;
        }

        let mut payable = match self.repo::<Payable>().get(&PayableId::for_order(order.id)).await? {
            Some(payable) => payable,
            None => Payable::open(&order, now),
        };
        payable.accrue(arrival.amount, now)?;

        let mut batch = WriteBatch::new();
        batch.put(&mut order)?;
        batch.put(&mut arrival)?;
        batch.put(&mut payable)?;
        let mut changes = vec![
            Change::new(ARRIVALS, arrival.id, "created"),
            Change::new(PURCHASES, order.id, "updated"),
            Change::new(PAYABLES, payable.id, "updated"),
        ];
        self.stage_posting(&mut batch, posting, &mut changes)?;
        self.commit(batch, changes).await?;

        info!(
            tenant_id = %self.tenant_id(),
            base_id = %arrival.base_id,
            arrival_id = %arrival.id,
            code = %arrival.code,
            purchase_order = %order.code,
            amount = arrival.amount,
            "arrival recorded"
        );
        Ok(arrival)
    }

    /// Reverse an arrival on its order, the stock and the payable.
    pub async fn void_arrival(&self, id: ArrivalId) -> ServiceResult<Arrival> {
        self.require(ARRIVALS, Action::Write)?;
        let mut arrival: Arrival = self.find(&id).await?;
        self.require_base(arrival.base_id)?;
        let mut order: PurchaseOrder = self.find(&arrival.purchase_order_id).await?;
        let mut payable: Payable = self.find(&PayableId::for_order(order.id)).await?;

        let now = self.now();
        arrival.void(&mut order, now)?;

        let slots: Vec<StockSlot> = arrival
            .lines
            .iter()
            .map(|l| StockSlot::new(arrival.base_id, arrival.location_id, l.goods_id))
            .collect();
        let reference = MovementRef::new("arrival", arrival.id, Some(&arrival.code));
        let mut posting = self.stock_posting(&slots, reference, now).await?;
        for (slot, line) in slots.iter().zip(&arrival.lines) {
            posting
                .post(*slot, -line.quantity, MovementReason::ArrivalVoid, None)
                .map_err(|_| {
                    DomainError::invariant(format!(
                        "arrival {} cannot be voided: its stock has already been consumed",
                        arrival.code
                    ))
                })?;
        }
        payable.reverse(arrival.amount, now)?;

        let mut batch = WriteBatch::new();
        batch.put(&mut order)?;
        batch.put(&mut arrival)?;
        batch.put(&mut payable)?;
        let mut changes = vec![
            Change::new(ARRIVALS, arrival.id, "voided"),
            Change::new(PURCHASES, order.id, "updated"),
            Change::new(PAYABLES, payable.id, "updated"),
        ];
        self.stage_posting(&mut batch, posting, &mut changes)?;
        self.commit(batch, changes).await?;

        info!(
            tenant_id = %self.tenant_id(),
            base_id = %arrival.base_id,
            arrival_id = %arrival.id,
            code = %arrival.code,
            "arrival voided"
        );
        Ok(arrival)
    }

    // -------------------------
    // Payables
    // -------------------------

    pub async fn list_payables(&self, filter: PayableFilter, page: PageRequest) -> ServiceResult<Page<PayableView>> {
        self.require(PAYABLES, Action::Read)?;
        let mut payables: Vec<Payable> = self.list(filter.base_id).await?;
        payables.retain(|p| filter.matches(p));
        payables.sort_by(|a, b| b.timestamps.updated_at.cmp(&a.timestamps.updated_at));
        Ok(paginate(payables, &page).map(PayableView::from))
    }

    pub async fn get_payable(&self, id: PayableId) -> ServiceResult<PayableView> {
        self.require(PAYABLES, Action::Read)?;
        Ok(self.find::<Payable>(&id).await?.into())
    }

    pub async fn record_payment(&self, id: PayableId, input: PaymentInput) -> ServiceResult<PayableView> {
        self.require(PAYABLES, Action::Write)?;
        let mut payable: Payable = self.find(&id).await?;
        self.require_base(payable.base_id)?;
        let amount = input.amount;
        payable.record_payment(input, self.today(), self.now())?;
        self.save(PAYABLES, &mut payable, "paid").await?;
        info!(
            tenant_id = %self.tenant_id(),
            payable_id = %payable.id,
            amount,
            outstanding = payable.outstanding(),
            "payment recorded"
        );
        Ok(payable.into())
    }
}
