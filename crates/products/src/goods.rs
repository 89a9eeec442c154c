use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_core::{
    BaseId, CurrencyCode, DomainError, DomainResult, Timestamps, entity_id, impl_record,
    matches_keyword, normalize_code, optional_text, required_text,
};

entity_id!(
    /// Identifier of a catalog item.
    GoodsId,
    "GoodsId"
);

/// Goods lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoodsStatus {
    #[default]
    Active,
    Discontinued,
}

/// A catalog item.
///
/// Goods with a `base_id` belong to that base; goods without one are shared
/// by every base of the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goods {
    pub id: GoodsId,
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: String,
    pub units_per_box: u32,
    pub barcode: Option<String>,
    /// Minor units.
    pub purchase_price: i64,
    /// Minor units.
    pub retail_price: i64,
    pub currency: CurrencyCode,
    pub image_url: Option<String>,
    pub base_id: Option<BaseId>,
    pub status: GoodsStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Goods, GoodsId, "goods", optionally_scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct GoodsInput {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: String,
    #[serde(default = "one")]
    pub units_per_box: u32,
    pub barcode: Option<String>,
    #[serde(default)]
    pub purchase_price: i64,
    #[serde(default)]
    pub retail_price: i64,
    pub currency: CurrencyCode,
    pub image_url: Option<String>,
    pub base_id: Option<BaseId>,
}

fn one() -> u32 {
    1
}

/// Partial update. Code and owning base are fixed at creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoodsUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub units_per_box: Option<u32>,
    pub barcode: Option<String>,
    pub purchase_price: Option<i64>,
    pub retail_price: Option<i64>,
    pub currency: Option<CurrencyCode>,
    pub image_url: Option<String>,
}

fn price(field: &str, value: i64) -> DomainResult<i64> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} must not be negative")));
    }
    Ok(value)
}

fn units_per_box(value: u32) -> DomainResult<u32> {
    if value == 0 {
        return Err(DomainError::validation("units_per_box must be at least 1"));
    }
    Ok(value)
}

fn barcode(value: Option<&str>) -> DomainResult<Option<String>> {
    let code = optional_text("barcode", value, 32)?;
    if let Some(c) = &code {
        if !c.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(DomainError::validation("barcode must be alphanumeric"));
        }
    }
    Ok(code)
}

impl Goods {
    pub fn create(input: GoodsInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: GoodsId::new(),
            code: normalize_code("code", &input.code)?,
            name: required_text("name", &input.name, 128)?,
            category: optional_text("category", input.category.as_deref(), 64)?,
            unit: required_text("unit", &input.unit, 16)?,
            units_per_box: units_per_box(input.units_per_box)?,
            barcode: barcode(input.barcode.as_deref())?,
            purchase_price: price("purchase_price", input.purchase_price)?,
            retail_price: price("retail_price", input.retail_price)?,
            currency: input.currency,
            image_url: optional_text("image_url", input.image_url.as_deref(), 512)?,
            base_id: input.base_id,
            status: GoodsStatus::Active,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: GoodsUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = required_text("name", &name, 128)?;
        }
        if patch.category.is_some() {
            self.category = optional_text("category", patch.category.as_deref(), 64)?;
        }
        if let Some(unit) = patch.unit {
            self.unit = required_text("unit", &unit, 16)?;
        }
        if let Some(n) = patch.units_per_box {
            self.units_per_box = units_per_box(n)?;
        }
        if patch.barcode.is_some() {
            self.barcode = barcode(patch.barcode.as_deref())?;
        }
        if let Some(p) = patch.purchase_price {
            self.purchase_price = price("purchase_price", p)?;
        }
        if let Some(p) = patch.retail_price {
            self.retail_price = price("retail_price", p)?;
        }
        if let Some(c) = patch.currency {
            self.currency = c;
        }
        if patch.image_url.is_some() {
            self.image_url = optional_text("image_url", patch.image_url.as_deref(), 512)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn discontinue(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == GoodsStatus::Discontinued {
            return Err(DomainError::invariant("goods already discontinued"));
        }
        self.status = GoodsStatus::Discontinued;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn reactivate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == GoodsStatus::Active {
            return Err(DomainError::invariant("goods already active"));
        }
        self.status = GoodsStatus::Active;
        self.timestamps.touch(now);
        Ok(())
    }

    /// Whether the goods may be used by documents of `base`: shared goods are
    /// visible everywhere, owned goods only in their own base.
    pub fn available_in(&self, base: BaseId) -> bool {
        self.base_id.is_none_or(|b| b == base)
    }

    /// Invariant check for putting the goods on a new order in `base`.
    pub fn ensure_orderable(&self, base: BaseId) -> DomainResult<()> {
        if self.status != GoodsStatus::Active {
            return Err(DomainError::invariant(format!(
                "goods {} is discontinued",
                self.code
            )));
        }
        if !self.available_in(base) {
            return Err(DomainError::invariant(format!(
                "goods {} belongs to another base",
                self.code
            )));
        }
        Ok(())
    }

    /// Split a unit quantity into whole boxes and loose units.
    pub fn box_breakdown(&self, quantity: i64) -> (i64, i64) {
        let per_box = i64::from(self.units_per_box.max(1));
        (quantity / per_box, quantity % per_box)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoodsFilter {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub status: Option<GoodsStatus>,
    /// Goods usable in this base (owned by it or shared).
    pub base_id: Option<BaseId>,
}

impl GoodsFilter {
    pub fn matches(&self, g: &Goods) -> bool {
        matches_keyword(
            self.keyword.as_deref(),
            &[&g.code, &g.name, g.barcode.as_deref().unwrap_or_default()],
        ) && self
            .category
            .as_deref()
            .is_none_or(|c| g.category.as_deref() == Some(c))
            && self.status.is_none_or(|s| s == g.status)
            && self.base_id.is_none_or(|b| g.available_in(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> GoodsInput {
        GoodsInput {
            code: "tea-001".into(),
            name: "Longjing tea".into(),
            category: Some("tea".into()),
            unit: "box".into(),
            units_per_box: 12,
            barcode: Some("6901234567890".into()),
            purchase_price: 4_500,
            retail_price: 8_800,
            currency: CurrencyCode::parse("CNY").unwrap(),
            image_url: None,
            base_id: None,
        }
    }

    #[test]
    fn create_validates_prices_and_box_size() {
        let g = Goods::create(input(), Utc::now()).unwrap();
        assert_eq!(g.code, "TEA-001");

        let mut bad = input();
        bad.purchase_price = -1;
        assert!(Goods::create(bad, Utc::now()).is_err());

        let mut bad = input();
        bad.units_per_box = 0;
        assert!(Goods::create(bad, Utc::now()).is_err());

        let mut bad = input();
        bad.barcode = Some("69-01".into());
        assert!(Goods::create(bad, Utc::now()).is_err());
    }

    #[test]
    fn discontinued_goods_cannot_be_ordered() {
        let mut g = Goods::create(input(), Utc::now()).unwrap();
        let base = BaseId::new();
        g.ensure_orderable(base).unwrap();
        g.discontinue(Utc::now()).unwrap();
        assert!(g.ensure_orderable(base).is_err());
        assert!(g.discontinue(Utc::now()).is_err());
        g.reactivate(Utc::now()).unwrap();
        g.ensure_orderable(base).unwrap();
    }

    #[test]
    fn owned_goods_are_limited_to_their_base() {
        let owner = BaseId::new();
        let mut i = input();
        i.base_id = Some(owner);
        let g = Goods::create(i, Utc::now()).unwrap();
        assert!(g.ensure_orderable(owner).is_ok());
        assert!(g.ensure_orderable(BaseId::new()).is_err());

        let f = GoodsFilter {
            base_id: Some(BaseId::new()),
            ..Default::default()
        };
        assert!(!f.matches(&g));
    }

    #[test]
    fn box_breakdown_splits_quantity() {
        let g = Goods::create(input(), Utc::now()).unwrap();
        assert_eq!(g.box_breakdown(30), (2, 6));
        assert_eq!(g.box_breakdown(12), (1, 0));
        assert_eq!(g.box_breakdown(5), (0, 5));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Boxes and loose units always recompose the original quantity.
            #[test]
            fn box_breakdown_recomposes(per_box in 1u32..500, qty in 0i64..1_000_000) {
                let mut i = input();
                i.units_per_box = per_box;
                let g = Goods::create(i, Utc::now()).unwrap();
                let (boxes, loose) = g.box_breakdown(qty);
                prop_assert!(loose < i64::from(per_box));
                prop_assert_eq!(boxes * i64::from(per_box) + loose, qty);
            }
        }
    }
}
