//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::BaseId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing revision, bumped by the store on every write.
    fn version(&self) -> u64;
}

/// A tenant-owned record persisted as a document.
///
/// `KIND` names the collection; `base_id` drives data scoping (tenant-wide
/// records return `None`).
pub trait Record: Entity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn base_id(&self) -> Option<BaseId> {
        None
    }

    /// Called by the store after a successful write or on load.
    fn set_version(&mut self, version: u64);

    /// Storage key; the display form of the id.
    fn key(&self) -> String {
        self.id().to_string()
    }
}

/// Implement [`Entity`] and [`Record`] for a struct with `id` and `version`
/// fields.
///
/// - `impl_record!(Goods, GoodsId, "goods")`: tenant-wide
/// - `impl_record!(Point, PointId, "points", scoped)`: `base_id: BaseId`
/// - `impl_record!(Party, PartyId, "parties", optionally_scoped)`: `base_id: Option<BaseId>`
#[macro_export]
macro_rules! impl_record {
    (@entity $t:ty, $id:ty) => {
        impl $crate::Entity for $t {
            type Id = $id;

            fn id(&self) -> &Self::Id {
                &self.id
            }

            fn version(&self) -> u64 {
                self.version
            }
        }
    };
    ($t:ty, $id:ty, $kind:literal) => {
        $crate::impl_record!(@entity $t, $id);

        impl $crate::Record for $t {
            const KIND: &'static str = $kind;

            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
        }
    };
    ($t:ty, $id:ty, $kind:literal, scoped) => {
        $crate::impl_record!(@entity $t, $id);

        impl $crate::Record for $t {
            const KIND: &'static str = $kind;

            fn base_id(&self) -> Option<$crate::BaseId> {
                Some(self.base_id)
            }

            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
        }
    };
    ($t:ty, $id:ty, $kind:literal, optionally_scoped) => {
        $crate::impl_record!(@entity $t, $id);

        impl $crate::Record for $t {
            const KIND: &'static str = $kind;

            fn base_id(&self) -> Option<$crate::BaseId> {
                self.base_id
            }

            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
        }
    };
}

/// Optimistic concurrency expectation for a stored record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent upserts, migrations, etc.).
    Any,
    /// The record must not exist yet.
    New,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `actual` is `None` when the record does not exist.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Any, _) => true,
            (ExpectedVersion::New, None) => true,
            (ExpectedVersion::New, Some(_)) => false,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            (ExpectedVersion::Exact(_), None) => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

/// Creation/update timestamps carried by every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Patch field that can be cleared: absent stays `None`, `null` becomes
/// `Some(None)`. Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_version_semantics() {
        assert!(ExpectedVersion::Any.matches(None));
        assert!(ExpectedVersion::Any.matches(Some(4)));
        assert!(ExpectedVersion::New.matches(None));
        assert!(!ExpectedVersion::New.matches(Some(1)));
        assert!(ExpectedVersion::Exact(2).matches(Some(2)));
        assert!(!ExpectedVersion::Exact(2).matches(Some(3)));
        assert!(!ExpectedVersion::Exact(2).matches(None));
    }

    #[derive(Debug, Default, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        parent: Option<Option<u32>>,
    }

    #[test]
    fn nullable_tells_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent, None);
        let cleared: Patch = serde_json::from_str(r#"{"parent":null}"#).unwrap();
        assert_eq!(cleared.parent, Some(None));
        let set: Patch = serde_json::from_str(r#"{"parent":7}"#).unwrap();
        assert_eq!(set.parent, Some(Some(7)));
    }

    #[test]
    fn failed_check_is_conflict() {
        let err = ExpectedVersion::Exact(1).check(Some(2)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
