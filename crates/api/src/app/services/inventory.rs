//! Stock levels, the movement ledger, manual adjustments and stock-outs.

use chrono::{DateTime, Utc};
use tracing::info;

use livebase_auth::Action;
use livebase_bases::Location;
use livebase_core::{DocumentPrefix, DomainError, EntityId, Page, PageRequest, paginate, required_text};
use livebase_infra::WriteBatch;
use livebase_inventory::{
    AdjustmentInput, LevelFilter, MovementFilter, MovementReason, MovementRef, StockLevel,
    StockMovement, StockOut, StockOutCategory, StockOutFilter, StockOutId, StockOutInput,
    StockPosting, StockSlot,
};
use livebase_products::Goods;
use livebase_sales::PointOrder;

use super::sales::POINT_ORDERS;
use super::{Change, TenantServices};
use crate::app::errors::ServiceResult;

pub const INVENTORY: &str = "inventory";
pub const STOCK_OUTS: &str = "stock_outs";

impl TenantServices {
    /// A posting primed with the current levels of `slots`.
    pub(crate) async fn stock_posting(
        &self,
        slots: &[StockSlot],
        reference: MovementRef,
        now: DateTime<Utc>,
    ) -> ServiceResult<StockPosting> {
        let repo = self.repo::<StockLevel>();
        let mut existing = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(level) = repo.get(&slot.level_id()).await? {
                existing.push(level);
            }
        }
        Ok(StockPosting::new(existing, reference, Some(self.user_id()), now))
    }

    /// Queue the posting's levels and movements on `batch`.
    pub(crate) fn stage_posting(
        &self,
        batch: &mut WriteBatch,
        posting: StockPosting,
        changes: &mut Vec<Change>,
    ) -> ServiceResult<Vec<StockMovement>> {
        let (levels, mut movements) = posting.into_parts();
        for mut level in levels {
            batch.put(&mut level)?;
            changes.push(Change::new(INVENTORY, level.id, "updated"));
        }
        for movement in &mut movements {
            batch.put(movement)?;
        }
        Ok(movements)
    }

    // -------------------------
    // Levels and movements
    // -------------------------

    pub async fn list_stock_levels(
        &self,
        filter: LevelFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<StockLevel>> {
        self.require(INVENTORY, Action::Read)?;
        let mut levels: Vec<StockLevel> = self.list(filter.base_id).await?;
        levels.retain(|l| filter.matches(l));
        levels.sort_by_key(|l| (l.base_id, l.location_id, l.goods_id));
        Ok(paginate(levels, &page))
    }

    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<StockMovement>> {
        self.require(INVENTORY, Action::Read)?;
        let mut movements: Vec<StockMovement> = self.list(filter.base_id).await?;
        movements.retain(|m| filter.matches(m));
        movements.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(paginate(movements, &page))
    }

    pub async fn adjust_stock(&self, input: AdjustmentInput) -> ServiceResult<StockMovement> {
        self.require(INVENTORY, Action::Write)?;
        let location: Location = self.find(&input.location_id).await?;
        self.writable_base(location.base_id).await?;
        let goods: Goods = self.find(&input.goods_id).await?;
        if !goods.available_in(location.base_id) {
            return Err(DomainError::invariant(format!(
                "goods {} belongs to another base",
                goods.code
            ))
            .into());
        }
        let note = required_text("note", &input.note, 500)?;

        let now = self.now();
        let slot = StockSlot::new(location.base_id, location.id, goods.id);
        let reference = MovementRef::new("adjustment", EntityId::new(), None);
        let mut posting = self.stock_posting(&[slot], reference, now).await?;
        posting.post(slot, input.delta, MovementReason::Adjustment, Some(note))?;

        let mut batch = WriteBatch::new();
        let mut changes = Vec::new();
        let movements = self.stage_posting(&mut batch, posting, &mut changes)?;
        self.commit(batch, changes).await?;
        info!(
            tenant_id = %self.tenant_id(),
            base_id = %location.base_id,
            location_id = %location.id,
            goods_id = %goods.id,
            delta = input.delta,
            "stock adjusted"
        );
        movements
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::invariant("adjustment produced no movement").into())
    }

    // -------------------------
    // Stock-outs
    // -------------------------

    pub async fn list_stock_outs(
        &self,
        filter: StockOutFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<StockOut>> {
        self.require(STOCK_OUTS, Action::Read)?;
        let mut items: Vec<StockOut> = self.list(filter.base_id).await?;
        items.retain(|s| filter.matches(s));
        items.sort_by(|a, b| b.occurred_on.cmp(&a.occurred_on).then_with(|| b.code.cmp(&a.code)));
        Ok(paginate(items, &page))
    }

    pub async fn get_stock_out(&self, id: StockOutId) -> ServiceResult<StockOut> {
        self.require(STOCK_OUTS, Action::Read)?;
        self.find(&id).await
    }

    /// Take stock out of a location; transfers land at the target location
    /// and point-order stock-outs fulfil the order, all in one commit.
    pub async fn create_stock_out(&self, input: StockOutInput) -> ServiceResult<StockOut> {
        self.require(STOCK_OUTS, Action::Write)?;
        let source: Location = self.find(&input.location_id).await?;
        self.writable_base(source.base_id).await?;

        let mut target: Option<Location> = None;
        let mut point_order: Option<PointOrder> = None;
        match &input.category {
            StockOutCategory::Transfer {
                target_base_id,
                target_location_id,
            } => {
                self.writable_base(*target_base_id).await?;
                target = Some(self.find(target_location_id).await?);
            }
            StockOutCategory::PointOrder { point_order_id } => {
                let order: PointOrder = self.find(point_order_id).await?;
                if order.base_id != source.base_id {
                    return Err(DomainError::invariant(format!(
                        "point order {} is not in the source location's base",
                        order.code
                    ))
                    .into());
                }
                point_order = Some(order);
            }
            StockOutCategory::Manual { .. } => {}
        }

        for line in &input.lines {
            let goods: Goods = self.find(&line.goods_id).await?;
            let usable = goods.available_in(source.base_id)
                && target.as_ref().is_none_or(|t| goods.available_in(t.base_id));
            if !usable {
                return Err(DomainError::invariant(format!(
                    "goods {} belongs to another base",
                    goods.code
                ))
                .into());
            }
        }

        let today = self.today();
        let now = self.now();
        let code = self
            .next_code(DocumentPrefix::StockOut, input.occurred_on.unwrap_or(today))
            .await?;
        let mut stock_out = StockOut::create(input, &source, target.as_ref(), code, today, now)?;

        let reference = MovementRef::new("stock_out", stock_out.id, Some(&stock_out.code));
        let mut posting = self.stock_posting(&stock_out.slots(), reference, now).await?;
        stock_out.post(&mut posting)?;

        let mut batch = WriteBatch::new();
        let mut changes = vec![Change::new(STOCK_OUTS, stock_out.id, "created")];
        if let Some(order) = point_order.as_mut() {
            order.fulfill(&stock_out.quantities(), &stock_out.code, now)?;
            batch.put(order)?;
            changes.push(Change::new(POINT_ORDERS, order.id, "fulfilled"));
        }
        batch.put(&mut stock_out)?;
        self.stage_posting(&mut batch, posting, &mut changes)?;
        self.commit(batch, changes).await?;

        info!(
            tenant_id = %self.tenant_id(),
            base_id = %stock_out.base_id,
            stock_out_id = %stock_out.id,
            code = %stock_out.code,
            category = stock_out.category.kind(),
            "stock-out recorded"
        );
        Ok(stock_out)
    }
}
