//! Retail points, their orders, field visits and distribution orders.

use tracing::info;

use livebase_auth::Action;
use livebase_bases::{Location, LocationId, Personnel, SubDistrict, SubDistrictId};
use livebase_core::{BaseId, DocumentPrefix, DomainError, Page, PageRequest, paginate};
use livebase_infra::WriteBatch;
use livebase_inventory::{MovementReason, MovementRef, StockSlot};
use livebase_parties::{PartyId, PartyKind};
use livebase_products::GoodsId;
use livebase_sales::{
    lines, DistributionOrder, DistributionOrderFilter, DistributionOrderId, DistributionOrderInput,
    DistributionOrderUpdate, Point, PointFilter, PointId, PointInput, PointOrder, PointOrderFilter,
    PointOrderId, PointOrderInput, PointOrderUpdate, PointUpdate, SalesLineInput, Visit, VisitFilter,
    VisitId, VisitInput,
};

use super::{Change, TenantServices};
use crate::app::errors::ServiceResult;

pub const POINTS: &str = "points";
pub const VISITS: &str = "visits";
pub const POINT_ORDERS: &str = "point_orders";
pub const SALES: &str = "sales";

fn goods_of(lines: &[SalesLineInput]) -> Vec<GoodsId> {
    lines.iter().map(|l| l.goods_id).collect()
}

impl TenantServices {
    // -------------------------
    // Points
    // -------------------------

    pub async fn list_points(&self, filter: PointFilter, page: PageRequest) -> ServiceResult<Page<Point>> {
        self.require(POINTS, Action::Read)?;
        let mut points: Vec<Point> = self.list(filter.base_id).await?;
        points.retain(|p| filter.matches(p));
        points.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(paginate(points, &page))
    }

    pub async fn get_point(&self, id: PointId) -> ServiceResult<Point> {
        self.require(POINTS, Action::Read)?;
        self.find(&id).await
    }

    async fn check_point_refs(
        &self,
        base_id: BaseId,
        sub_district_id: Option<SubDistrictId>,
        dealer_id: Option<PartyId>,
    ) -> ServiceResult<()> {
        if let Some(id) = sub_district_id {
            let sub: SubDistrict = self.find(&id).await?;
            if sub.base_id != base_id {
                return Err(DomainError::invariant(format!(
                    "sub-district {} is in another base",
                    sub.code
                ))
                .into());
            }
        }
        if let Some(id) = dealer_id {
            self.trading_party(id, PartyKind::Customer, base_id).await?;
        }
        Ok(())
    }

    pub async fn create_point(&self, input: PointInput) -> ServiceResult<Point> {
        self.require(POINTS, Action::Write)?;
        self.writable_base(input.base_id).await?;
        self.check_point_refs(input.base_id, input.sub_district_id, input.dealer_id)
            .await?;
        let mut point = Point::create(input, self.now())?;
        let existing: Vec<Point> = self.list_all().await?;
        if existing
            .iter()
            .any(|p| p.base_id == point.base_id && p.code == point.code)
        {
            return Err(DomainError::conflict(format!(
                "point code {} already exists in this base",
                point.code
            ))
            .into());
        }
        self.save(POINTS, &mut point, "created").await?;
        info!(tenant_id = %self.tenant_id(), base_id = %point.base_id, point_id = %point.id, code = %point.code, "point created");
        Ok(point)
    }

    pub async fn update_point(&self, id: PointId, patch: PointUpdate) -> ServiceResult<Point> {
        self.require(POINTS, Action::Write)?;
        let mut point: Point = self.find(&id).await?;
        self.require_base(point.base_id)?;
        self.check_point_refs(
            point.base_id,
            patch.sub_district_id.flatten(),
            patch.dealer_id.flatten(),
        )
        .await?;
        point.update(patch, self.now())?;
        self.save(POINTS, &mut point, "updated").await?;
        Ok(point)
    }

    pub async fn delete_point(&self, id: PointId) -> ServiceResult<()> {
        self.require(POINTS, Action::Delete)?;
        let point: Point = self.find(&id).await?;
        self.require_base(point.base_id)?;
        let ordered = self
            .list_all::<PointOrder>()
            .await?
            .iter()
            .any(|o| o.point_id == id);
        let visited = self
            .list_all::<Visit>()
            .await?
            .iter()
            .any(|v| v.point_id == id);
        if ordered || visited {
            return Err(DomainError::conflict(format!(
                "point {} has orders or visits; close it instead",
                point.code
            ))
            .into());
        }
        self.remove(POINTS, &point).await?;
        info!(tenant_id = %self.tenant_id(), point_id = %id, "point deleted");
        Ok(())
    }

    // -------------------------
    // Visits
    // -------------------------

    pub async fn list_visits(&self, filter: VisitFilter, page: PageRequest) -> ServiceResult<Page<Visit>> {
        self.require(VISITS, Action::Read)?;
        let mut visits: Vec<Visit> = self.list(filter.base_id).await?;
        visits.retain(|v| filter.matches(v));
        visits.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
        Ok(paginate(visits, &page))
    }

    pub async fn record_visit(&self, input: VisitInput) -> ServiceResult<Visit> {
        self.require(VISITS, Action::Write)?;
        let point: Point = self.find(&input.point_id).await?;
        self.writable_base(point.base_id).await?;
        let personnel: Personnel = self.find(&input.personnel_id).await?;
        let mut visit = Visit::record(&point, &personnel, input, self.now())?;
        self.save(VISITS, &mut visit, "created").await?;
        info!(
            tenant_id = %self.tenant_id(),
            point_id = %visit.point_id,
            personnel_id = %visit.personnel_id,
            visit_id = %visit.id,
            "visit recorded"
        );
        Ok(visit)
    }

    pub async fn delete_visit(&self, id: VisitId) -> ServiceResult<()> {
        self.require(VISITS, Action::Delete)?;
        let visit: Visit = self.find(&id).await?;
        self.require_base(visit.base_id)?;
        self.remove(VISITS, &visit).await
    }

    // -------------------------
    // Point orders
    // -------------------------

    pub async fn list_point_orders(
        &self,
        filter: PointOrderFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<PointOrder>> {
        self.require(POINT_ORDERS, Action::Read)?;
        let mut orders: Vec<PointOrder> = self.list(filter.base_id).await?;
        orders.retain(|o| filter.matches(o));
        orders.sort_by(|a, b| b.ordered_on.cmp(&a.ordered_on).then_with(|| b.code.cmp(&a.code)));
        Ok(paginate(orders, &page))
    }

    pub async fn get_point_order(&self, id: PointOrderId) -> ServiceResult<PointOrder> {
        self.require(POINT_ORDERS, Action::Read)?;
        self.find(&id).await
    }

    pub async fn create_point_order(&self, input: PointOrderInput) -> ServiceResult<PointOrder> {
        self.require(POINT_ORDERS, Action::Write)?;
        let point: Point = self.find(&input.point_id).await?;
        let base = self.writable_base(point.base_id).await?;
        self.orderable_goods(goods_of(&input.lines), base.id).await?;

        let today = self.today();
        let code = self
            .next_code(DocumentPrefix::PointOrder, input.ordered_on.unwrap_or(today))
            .await?;
        let mut order = PointOrder::create(&point, input, code, base.currency, today, self.now())?;
        self.save(POINT_ORDERS, &mut order, "created").await?;
        info!(
            tenant_id = %self.tenant_id(),
            base_id = %order.base_id,
            point_order_id = %order.id,
            code = %order.code,
            total_amount = order.total_amount,
            "point order created"
        );
        Ok(order)
    }

    pub async fn update_point_order(&self, id: PointOrderId, patch: PointOrderUpdate) -> ServiceResult<PointOrder> {
        self.require(POINT_ORDERS, Action::Write)?;
        let mut order: PointOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        if let Some(lines) = &patch.lines {
            self.orderable_goods(goods_of(lines), order.base_id).await?;
        }
        order.update(patch, self.now())?;
        self.save(POINT_ORDERS, &mut order, "updated").await?;
        Ok(order)
    }

    pub async fn cancel_point_order(&self, id: PointOrderId) -> ServiceResult<PointOrder> {
        self.require(POINT_ORDERS, Action::Write)?;
        let mut order: PointOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        order.cancel(self.now())?;
        self.save(POINT_ORDERS, &mut order, "cancelled").await?;
        info!(tenant_id = %self.tenant_id(), point_order_id = %order.id, code = %order.code, "point order cancelled");
        Ok(order)
    }

    pub async fn complete_point_order(&self, id: PointOrderId) -> ServiceResult<PointOrder> {
        self.require(POINT_ORDERS, Action::Write)?;
        let mut order: PointOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        order.complete(self.today(), self.now())?;
        self.save(POINT_ORDERS, &mut order, "completed").await?;
        info!(tenant_id = %self.tenant_id(), point_order_id = %order.id, code = %order.code, "point order completed");
        Ok(order)
    }

    // -------------------------
    // Distribution orders
    // -------------------------

    pub async fn list_distribution_orders(
        &self,
        filter: DistributionOrderFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<DistributionOrder>> {
        self.require(SALES, Action::Read)?;
        let mut orders: Vec<DistributionOrder> = self.list(filter.base_id).await?;
        orders.retain(|o| filter.matches(o));
        orders.sort_by(|a, b| b.ordered_on.cmp(&a.ordered_on).then_with(|| b.code.cmp(&a.code)));
        Ok(paginate(orders, &page))
    }

    pub async fn get_distribution_order(&self, id: DistributionOrderId) -> ServiceResult<DistributionOrder> {
        self.require(SALES, Action::Read)?;
        self.find(&id).await
    }

    async fn shipping_location(&self, id: LocationId, base_id: BaseId) -> ServiceResult<Location> {
        let location: Location = self.find(&id).await?;
        if location.base_id != base_id {
            return Err(DomainError::invariant(format!(
                "location {} is not in the order's base",
                location.code
            ))
            .into());
        }
        Ok(location)
    }

    pub async fn create_distribution_order(
        &self,
        input: DistributionOrderInput,
    ) -> ServiceResult<DistributionOrder> {
        self.require(SALES, Action::Write)?;
        let base = self.writable_base(input.base_id).await?;
        self.trading_party(input.customer_id, PartyKind::Customer, base.id)
            .await?;
        self.shipping_location(input.location_id, base.id).await?;
        self.orderable_goods(goods_of(&input.lines), base.id).await?;

        let currency = input.currency.unwrap_or(base.currency);
        let today = self.today();
        let code = self
            .next_code(DocumentPrefix::DistributionOrder, input.ordered_on.unwrap_or(today))
            .await?;
        let mut order = DistributionOrder::create(input, code, currency, today, self.now())?;
        self.save(SALES, &mut order, "created").await?;
        info!(
            tenant_id = %self.tenant_id(),
            base_id = %order.base_id,
            distribution_order_id = %order.id,
            code = %order.code,
            total_amount = order.total_amount,
            "distribution order created"
        );
        Ok(order)
    }

    pub async fn update_distribution_order(
        &self,
        id: DistributionOrderId,
        patch: DistributionOrderUpdate,
    ) -> ServiceResult<DistributionOrder> {
        self.require(SALES, Action::Write)?;
        let mut order: DistributionOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        if let Some(location_id) = patch.location_id {
            self.shipping_location(location_id, order.base_id).await?;
        }
        if let Some(lines) = &patch.lines {
            self.orderable_goods(goods_of(lines), order.base_id).await?;
        }
        order.update(patch, self.now())?;
        self.save(SALES, &mut order, "updated").await?;
        Ok(order)
    }

    pub async fn confirm_distribution_order(&self, id: DistributionOrderId) -> ServiceResult<DistributionOrder> {
        self.require(SALES, Action::Write)?;
        let mut order: DistributionOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        order.confirm(self.now())?;
        self.save(SALES, &mut order, "confirmed").await?;
        Ok(order)
    }

    /// Ship the order and deduct its goods from the shipping location.
    pub async fn ship_distribution_order(&self, id: DistributionOrderId) -> ServiceResult<DistributionOrder> {
        self.require(SALES, Action::Write)?;
        let mut order: DistributionOrder = self.find(&id).await?;
        self.writable_base(order.base_id).await?;

        let now = self.now();
        order.ship(self.today(), now)?;

        let reference = MovementRef::new("distribution_order", order.id, Some(&order.code));
        let shipped = lines::quantities(&order.lines);
        let slots: Vec<StockSlot> = shipped
            .keys()
            .map(|goods_id| StockSlot::new(order.base_id, order.location_id, *goods_id))
            .collect();
        let mut posting = self.stock_posting(&slots, reference, now).await?;
        for (slot, quantity) in slots.iter().zip(shipped.values()) {
            posting.post(*slot, -quantity, MovementReason::Sale, None)?;
        }

        let mut batch = WriteBatch::new();
        batch.put(&mut order)?;
        let mut changes = vec![Change::new(SALES, order.id, "shipped")];
        self.stage_posting(&mut batch, posting, &mut changes)?;
        self.commit(batch, changes).await?;

        info!(
            tenant_id = %self.tenant_id(),
            base_id = %order.base_id,
            distribution_order_id = %order.id,
            code = %order.code,
            "distribution order shipped"
        );
        Ok(order)
    }

    pub async fn settle_distribution_order(&self, id: DistributionOrderId) -> ServiceResult<DistributionOrder> {
        self.require(SALES, Action::Write)?;
        let mut order: DistributionOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        order.settle(self.today(), self.now())?;
        self.save(SALES, &mut order, "settled").await?;
        info!(tenant_id = %self.tenant_id(), distribution_order_id = %order.id, code = %order.code, "distribution order settled");
        Ok(order)
    }

    pub async fn cancel_distribution_order(&self, id: DistributionOrderId) -> ServiceResult<DistributionOrder> {
        self.require(SALES, Action::Write)?;
        let mut order: DistributionOrder = self.find(&id).await?;
        self.require_base(order.base_id)?;
        order.cancel(self.now())?;
        self.save(SALES, &mut order, "cancelled").await?;
        Ok(order)
    }
}
