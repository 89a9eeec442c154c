use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use livebase_bases::LocationId;
use livebase_core::{BaseId, EntityId, Timestamps, entity_id, impl_record};
use livebase_products::GoodsId;

entity_id!(
    /// Derived from (location, goods); see [`StockSlot::level_id`].
    StockLevelId,
    "StockLevelId"
);

/// Where a quantity of goods sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockSlot {
    pub base_id: BaseId,
    pub location_id: LocationId,
    pub goods_id: GoodsId,
}

impl StockSlot {
    pub fn new(base_id: BaseId, location_id: LocationId, goods_id: GoodsId) -> Self {
        Self {
            base_id,
            location_id,
            goods_id,
        }
    }

    /// Deterministic level id, so a slot can be loaded without a lookup.
    pub fn level_id(&self) -> StockLevelId {
        let mut name = [0u8; 32];
        name[..16].copy_from_slice(self.location_id.as_uuid().as_bytes());
        name[16..].copy_from_slice(self.goods_id.as_uuid().as_bytes());
        StockLevelId(EntityId::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, &name)))
    }
}

/// Quantity on hand for one goods at one location. Never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: StockLevelId,
    pub base_id: BaseId,
    pub location_id: LocationId,
    pub goods_id: GoodsId,
    pub on_hand: i64,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(StockLevel, StockLevelId, "stock_levels", scoped);

impl StockLevel {
    pub fn empty(slot: StockSlot, now: DateTime<Utc>) -> Self {
        Self {
            id: slot.level_id(),
            base_id: slot.base_id,
            location_id: slot.location_id,
            goods_id: slot.goods_id,
            on_hand: 0,
            timestamps: Timestamps::new(now),
            version: 0,
        }
    }

    pub fn slot(&self) -> StockSlot {
        StockSlot::new(self.base_id, self.location_id, self.goods_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelFilter {
    pub base_id: Option<BaseId>,
    pub location_id: Option<LocationId>,
    pub goods_id: Option<GoodsId>,
    /// Only levels strictly below this quantity.
    pub low_stock_below: Option<i64>,
}

impl LevelFilter {
    pub fn matches(&self, l: &StockLevel) -> bool {
        self.base_id.is_none_or(|b| b == l.base_id)
            && self.location_id.is_none_or(|x| x == l.location_id)
            && self.goods_id.is_none_or(|g| g == l.goods_id)
            && self.low_stock_below.is_none_or(|n| l.on_hand < n)
    }
}
