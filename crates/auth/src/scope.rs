use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use livebase_core::BaseId;

/// Which bases' records a principal may see and touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "base_ids", rename_all = "snake_case")]
pub enum DataScope {
    /// Every base of the tenant.
    All,
    /// Only the listed bases.
    Bases(BTreeSet<BaseId>),
}

impl DataScope {
    pub fn allows(&self, base_id: BaseId) -> bool {
        match self {
            DataScope::All => true,
            DataScope::Bases(set) => set.contains(&base_id),
        }
    }

    /// Records without a base (tenant-wide) are visible to every scope.
    pub fn allows_optional(&self, base_id: Option<BaseId>) -> bool {
        base_id.is_none_or(|b| self.allows(b))
    }

    /// Base filter for storage queries; `None` means unrestricted.
    pub fn base_filter(&self) -> Option<Vec<BaseId>> {
        match self {
            DataScope::All => None,
            DataScope::Bases(set) => Some(set.iter().copied().collect()),
        }
    }

    /// Narrow a caller-requested base filter to this scope.
    pub fn narrow(&self, requested: Option<BaseId>) -> Option<Vec<BaseId>> {
        match (requested, self) {
            (Some(b), scope) if scope.allows(b) => Some(vec![b]),
            (Some(_), _) => Some(Vec::new()),
            (None, scope) => scope.base_filter(),
        }
    }
}
