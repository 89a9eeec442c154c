//! Goods and trading parties.

use tracing::info;

use livebase_auth::Action;
use livebase_core::{BaseId, DomainError, Page, PageRequest, paginate};
use livebase_inventory::StockLevel;
use livebase_parties::{Party, PartyFilter, PartyId, PartyInput, PartyKind, PartyUpdate};
use livebase_products::{Goods, GoodsFilter, GoodsId, GoodsInput, GoodsUpdate};
use livebase_purchasing::PurchaseOrder;
use livebase_sales::{DistributionOrder, PointOrder};

use super::TenantServices;
use crate::app::errors::ServiceResult;

pub const GOODS: &str = "goods";
pub const PARTIES: &str = "parties";

impl TenantServices {
    // -------------------------
    // Goods
    // -------------------------

    pub async fn list_goods(&self, filter: GoodsFilter, page: PageRequest) -> ServiceResult<Page<Goods>> {
        self.require(GOODS, Action::Read)?;
        let mut goods: Vec<Goods> = self.list(filter.base_id).await?;
        goods.retain(|g| filter.matches(g));
        goods.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(paginate(goods, &page))
    }

    pub async fn get_goods(&self, id: GoodsId) -> ServiceResult<Goods> {
        self.require(GOODS, Action::Read)?;
        self.find(&id).await
    }

    pub async fn create_goods(&self, input: GoodsInput) -> ServiceResult<Goods> {
        self.require(GOODS, Action::Write)?;
        if let Some(base_id) = input.base_id {
            self.writable_base(base_id).await?;
        }
        let mut goods = Goods::create(input, self.now())?;
        let existing: Vec<Goods> = self.list_all().await?;
        if existing.iter().any(|g| g.code == goods.code) {
            return Err(DomainError::conflict(format!("goods code {} already exists", goods.code)).into());
        }
        self.save(GOODS, &mut goods, "created").await?;
        info!(tenant_id = %self.tenant_id(), goods_id = %goods.id, code = %goods.code, "goods created");
        Ok(goods)
    }

    pub async fn update_goods(&self, id: GoodsId, patch: GoodsUpdate) -> ServiceResult<Goods> {
        self.require(GOODS, Action::Write)?;
        let mut goods: Goods = self.find(&id).await?;
        if let Some(base_id) = goods.base_id {
            self.require_base(base_id)?;
        }
        goods.update(patch, self.now())?;
        self.save(GOODS, &mut goods, "updated").await?;
        Ok(goods)
    }

    pub async fn set_goods_active(&self, id: GoodsId, active: bool) -> ServiceResult<Goods> {
        self.require(GOODS, Action::Write)?;
        let mut goods: Goods = self.find(&id).await?;
        if let Some(base_id) = goods.base_id {
            self.require_base(base_id)?;
        }
        let action = if active {
            goods.reactivate(self.now())?;
            "reactivated"
        } else {
            goods.discontinue(self.now())?;
            "discontinued"
        };
        self.save(GOODS, &mut goods, action).await?;
        info!(tenant_id = %self.tenant_id(), goods_id = %goods.id, action, "goods status changed");
        Ok(goods)
    }

    /// Goods referenced by stock or any order are discontinued, not deleted.
    pub async fn delete_goods(&self, id: GoodsId) -> ServiceResult<()> {
        self.require(GOODS, Action::Delete)?;
        let goods: Goods = self.find(&id).await?;
        if let Some(base_id) = goods.base_id {
            self.require_base(base_id)?;
        }
        let in_stock = self
            .list_all::<StockLevel>()
            .await?
            .iter()
            .any(|l| l.goods_id == id);
        let purchased = self
            .list_all::<PurchaseOrder>()
            .await?
            .iter()
            .any(|o| o.lines.iter().any(|l| l.goods_id == id));
        let sold = self
            .list_all::<PointOrder>()
            .await?
            .iter()
            .any(|o| o.lines.iter().any(|l| l.goods_id == id))
            || self
                .list_all::<DistributionOrder>()
                .await?
                .iter()
                .any(|o| o.lines.iter().any(|l| l.goods_id == id));
        if in_stock || purchased || sold {
            return Err(DomainError::conflict(format!(
                "goods {} is referenced by stock or orders; discontinue it instead",
                goods.code
            ))
            .into());
        }
        self.remove(GOODS, &goods).await
    }

    /// Goods that may go on a new order in `base`.
    pub(crate) async fn orderable_goods(&self, ids: impl IntoIterator<Item = GoodsId>, base: BaseId) -> ServiceResult<()> {
        for id in ids {
            let goods: Goods = self.find(&id).await?;
            goods.ensure_orderable(base)?;
        }
        Ok(())
    }

    // -------------------------
    // Parties
    // -------------------------

    pub async fn list_parties(&self, filter: PartyFilter, page: PageRequest) -> ServiceResult<Page<Party>> {
        self.require(PARTIES, Action::Read)?;
        let mut parties: Vec<Party> = self.list(filter.base_id).await?;
        parties.retain(|p| filter.matches(p));
        parties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(parties, &page))
    }

    pub async fn get_party(&self, id: PartyId) -> ServiceResult<Party> {
        self.require(PARTIES, Action::Read)?;
        self.find(&id).await
    }

    pub async fn register_party(&self, input: PartyInput) -> ServiceResult<Party> {
        self.require(PARTIES, Action::Write)?;
        if let Some(base_id) = input.base_id {
            self.writable_base(base_id).await?;
        }
        let mut party = Party::register(input, self.now())?;
        self.save(PARTIES, &mut party, "created").await?;
        info!(tenant_id = %self.tenant_id(), party_id = %party.id, kind = ?party.kind, "party registered");
        Ok(party)
    }

    pub async fn update_party(&self, id: PartyId, patch: PartyUpdate) -> ServiceResult<Party> {
        self.require(PARTIES, Action::Write)?;
        let mut party: Party = self.find(&id).await?;
        if let Some(base_id) = party.base_id {
            self.require_base(base_id)?;
        }
        party.update(patch, self.now())?;
        self.save(PARTIES, &mut party, "updated").await?;
        Ok(party)
    }

    pub async fn set_party_active(&self, id: PartyId, active: bool) -> ServiceResult<Party> {
        self.require(PARTIES, Action::Write)?;
        let mut party: Party = self.find(&id).await?;
        if let Some(base_id) = party.base_id {
            self.require_base(base_id)?;
        }
        let action = if active {
            party.reactivate(self.now())?;
            "reactivated"
        } else {
            party.suspend(self.now())?;
            "suspended"
        };
        self.save(PARTIES, &mut party, action).await?;
        info!(tenant_id = %self.tenant_id(), party_id = %party.id, action, "party status changed");
        Ok(party)
    }

    /// A party that may trade as `kind` in `base`.
    pub(crate) async fn trading_party(&self, id: PartyId, kind: PartyKind, base: BaseId) -> ServiceResult<Party> {
        let party: Party = self.find(&id).await?;
        party.ensure_can_transact_as(kind, base)?;
        Ok(party)
    }
}
