use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livebase_bases::{Personnel, PersonnelId};
use livebase_core::{
    BaseId, DomainError, DomainResult, Timestamps, date_in_range, entity_id, impl_record,
    required_text,
};

use crate::point::{Point, PointId};

entity_id!(VisitId, "VisitId");

const MAX_PHOTOS: usize = 9;

/// A field visit to a point by base personnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub base_id: BaseId,
    pub point_id: PointId,
    pub personnel_id: PersonnelId,
    pub visited_at: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Visit, VisitId, "visits", scoped);

#[derive(Debug, Clone, Deserialize)]
pub struct VisitInput {
    pub point_id: PointId,
    pub personnel_id: PersonnelId,
    /// Defaults to now.
    pub visited_at: Option<DateTime<Utc>>,
    pub summary: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

impl Visit {
    pub fn record(
        point: &Point,
        personnel: &Personnel,
        input: VisitInput,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if point.base_id != personnel.base_id {
            return Err(DomainError::invariant(
                "personnel and point belong to different bases",
            ));
        }
        if !personnel.is_active() {
            return Err(DomainError::invariant(format!("{} has left", personnel.name)));
        }
        let visited_at = input.visited_at.unwrap_or(now);
        if visited_at > now {
            return Err(DomainError::validation("visited_at must not be in the future"));
        }
        if input.photo_urls.len() > MAX_PHOTOS {
            return Err(DomainError::validation(format!(
                "at most {MAX_PHOTOS} photos per visit"
            )));
        }
        let photo_urls = input
            .photo_urls
            .iter()
            .map(|u| required_text("photo_url", u, 512))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Self {
            id: VisitId::new(),
            base_id: point.base_id,
            point_id: point.id,
            personnel_id: personnel.id,
            visited_at,
            summary: required_text("summary", &input.summary, 2000)?,
            photo_urls,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitFilter {
    pub base_id: Option<BaseId>,
    pub point_id: Option<PointId>,
    pub personnel_id: Option<PersonnelId>,
    pub from: Option<chrono::NaiveDate>,
    pub to: Option<chrono::NaiveDate>,
}

impl VisitFilter {
    pub fn matches(&self, v: &Visit) -> bool {
        self.base_id.is_none_or(|b| b == v.base_id)
            && self.point_id.is_none_or(|p| p == v.point_id)
            && self.personnel_id.is_none_or(|p| p == v.personnel_id)
            && date_in_range(v.visited_at.date_naive(), self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::tests::point;
    use livebase_bases::{PersonnelInput, Position};

    fn sales_rep(base: BaseId) -> Personnel {
        Personnel::create(
            PersonnelInput {
                base_id: base,
                name: "Zhao".into(),
                phone: None,
                position: Position::Sales,
                joined_on: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn input(p: &Point, who: &Personnel) -> VisitInput {
        VisitInput {
            point_id: p.id,
            personnel_id: who.id,
            visited_at: None,
            summary: "Restocked shelf, owner asked for new flavours".into(),
            photo_urls: vec!["https://cdn.example/v1.jpg".into()],
        }
    }

    #[test]
    fn records_visit_in_same_base() {
        let base = BaseId::new();
        let p = point(base);
        let who = sales_rep(base);
        let v = Visit::record(&p, &who, input(&p, &who), Utc::now()).unwrap();
        assert_eq!(v.base_id, base);
        assert_eq!(v.photo_urls.len(), 1);
    }

    #[test]
    fn rejects_cross_base_and_future_visits() {
        let p = point(BaseId::new());
        let who = sales_rep(BaseId::new());
        assert!(Visit::record(&p, &who, input(&p, &who), Utc::now()).is_err());

        let who = sales_rep(p.base_id);
        let mut future = input(&p, &who);
        future.visited_at = Some(Utc::now() + chrono::Duration::days(1));
        assert!(Visit::record(&p, &who, future, Utc::now()).is_err());
    }
}
