use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use livebase_bases::LocationId;
use livebase_core::{
    BaseId, CurrencyCode, DomainError, DomainResult, Timestamps, date_in_range, entity_id,
    impl_record, matches_keyword, optional_text,
};
use livebase_parties::PartyId;

use crate::lines::{SalesLine, SalesLineInput, build_lines, total};

entity_id!(DistributionOrderId, "DistributionOrderId");

/// Distribution order status lifecycle.
///
/// `draft → confirmed → shipped → settled`; `cancelled` from draft or
/// confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    Draft,
    Confirmed,
    Shipped,
    Settled,
    Cancelled,
}

/// Wholesale order to a customer, shipped from one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionOrder {
    pub id: DistributionOrderId,
    pub code: String,
    pub base_id: BaseId,
    pub customer_id: PartyId,
    pub location_id: LocationId,
    pub currency: CurrencyCode,
    pub lines: Vec<SalesLine>,
    pub total_amount: i64,
    pub status: DistributionStatus,
    pub ordered_on: NaiveDate,
    pub shipped_on: Option<NaiveDate>,
    pub settled_on: Option<NaiveDate>,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(DistributionOrder, DistributionOrderId, "distribution_orders", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct DistributionOrderInput {
    pub base_id: BaseId,
    pub customer_id: PartyId,
    pub location_id: LocationId,
    pub currency: Option<CurrencyCode>,
    pub lines: Vec<SalesLineInput>,
    pub ordered_on: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributionOrderUpdate {
    pub location_id: Option<LocationId>,
    pub lines: Option<Vec<SalesLineInput>>,
    pub ordered_on: Option<NaiveDate>,
    pub note: Option<String>,
}

impl DistributionOrder {
    pub fn create(
        input: DistributionOrderInput,
        code: String,
        currency: CurrencyCode,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let lines = build_lines(&input.lines)?;
        Ok(Self {
            id: DistributionOrderId::new(),
            code,
            base_id: input.base_id,
            customer_id: input.customer_id,
            location_id: input.location_id,
            currency,
            total_amount: total(&lines)?,
            lines,
            status: DistributionStatus::Draft,
            ordered_on: input.ordered_on.unwrap_or(today),
            shipped_on: None,
            settled_on: None,
            note: optional_text("note", input.note.as_deref(), 500)?,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, DistributionStatus::Draft)
    }

    pub fn update(&mut self, patch: DistributionOrderUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant("only draft orders can be modified"));
        }
        if let Some(lines) = patch.lines {
            let lines = build_lines(&lines)?;
            self.total_amount = total(&lines)?;
            self.lines = lines;
        }
        if let Some(location) = patch.location_id {
            self.location_id = location;
        }
        if let Some(d) = patch.ordered_on {
            self.ordered_on = d;
        }
        if patch.note.is_some() {
            self.note = optional_text("note", patch.note.as_deref(), 500)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    fn transition(
        &mut self,
        from: &[DistributionStatus],
        to: DistributionStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !from.contains(&self.status) {
            return Err(DomainError::invariant(format!(
                "cannot move order {} from {:?} to {:?}",
                self.code, self.status, to
            )));
        }
        self.status = to;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(&[DistributionStatus::Draft], DistributionStatus::Confirmed, now)
    }

    /// The caller deducts the stock in the same commit.
    pub fn ship(&mut self, today: NaiveDate, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(&[DistributionStatus::Confirmed], DistributionStatus::Shipped, now)?;
        self.shipped_on = Some(today);
        Ok(())
    }

    pub fn settle(&mut self, today: NaiveDate, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(&[DistributionStatus::Shipped], DistributionStatus::Settled, now)?;
        self.settled_on = Some(today);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(
            &[DistributionStatus::Draft, DistributionStatus::Confirmed],
            DistributionStatus::Cancelled,
            now,
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributionOrderFilter {
    pub base_id: Option<BaseId>,
    pub customer_id: Option<PartyId>,
    pub status: Option<DistributionStatus>,
    pub keyword: Option<String>,
    pub ordered_from: Option<NaiveDate>,
    pub ordered_to: Option<NaiveDate>,
}

impl DistributionOrderFilter {
    pub fn matches(&self, o: &DistributionOrder) -> bool {
        self.base_id.is_none_or(|b| b == o.base_id)
            && self.customer_id.is_none_or(|c| c == o.customer_id)
            && self.status.is_none_or(|s| s == o.status)
            && matches_keyword(self.keyword.as_deref(), &[&o.code])
            && date_in_range(o.ordered_on, self.ordered_from, self.ordered_to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livebase_products::GoodsId;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn order() -> DistributionOrder {
        DistributionOrder::create(
            DistributionOrderInput {
                base_id: BaseId::new(),
                customer_id: PartyId::new(),
                location_id: LocationId::new(),
                currency: None,
                lines: vec![SalesLineInput {
                    goods_id: GoodsId::new(),
                    quantity: 10,
                    unit_price: 99,
                }],
                ordered_on: None,
                note: None,
            },
            "DO-20240601-0001".into(),
            CurrencyCode::parse("USD").unwrap(),
            today(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn full_lifecycle_draft_to_settled() {
        let mut o = order();
        assert_eq!(o.total_amount, 990);
        assert!(o.ship(today(), Utc::now()).is_err());
        o.confirm(Utc::now()).unwrap();
        assert!(o.update(DistributionOrderUpdate::default(), Utc::now()).is_err());
        o.ship(today(), Utc::now()).unwrap();
        assert_eq!(o.shipped_on, Some(today()));
        assert!(o.cancel(Utc::now()).is_err());
        o.settle(today(), Utc::now()).unwrap();
        assert_eq!(o.status, DistributionStatus::Settled);
    }

    #[test]
    fn cancel_from_draft_or_confirmed() {
        let mut o = order();
        o.cancel(Utc::now()).unwrap();
        assert!(o.confirm(Utc::now()).is_err());

        let mut o = order();
        o.confirm(Utc::now()).unwrap();
        o.cancel(Utc::now()).unwrap();
        assert_eq!(o.status, DistributionStatus::Cancelled);
    }
}
