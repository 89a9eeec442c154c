//! Batch of stock movements applied against a working set of levels.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use livebase_core::{DomainResult, UserId};

use crate::level::{StockLevel, StockLevelId, StockSlot};
use crate::movement::{MovementReason, MovementRef, StockMovement, apply_movement};

/// Collects movements for one business operation.
///
/// Seed it with the current levels of every slot the operation touches
/// (missing slots start empty). Every posting is checked immediately, so a
/// later outbound line sees the effect of earlier ones.
#[derive(Debug, Clone)]
pub struct StockPosting {
    levels: BTreeMap<StockLevelId, StockLevel>,
    touched: Vec<StockLevelId>,
    movements: Vec<StockMovement>,
    reference: MovementRef,
    moved_by: Option<UserId>,
    now: DateTime<Utc>,
}

impl StockPosting {
    pub fn new(
        existing: impl IntoIterator<Item = StockLevel>,
        reference: MovementRef,
        moved_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            levels: existing.into_iter().map(|l| (l.id, l)).collect(),
            touched: Vec::new(),
            movements: Vec::new(),
            reference,
            moved_by,
            now,
        }
    }

    pub fn post(
        &mut self,
        slot: StockSlot,
        quantity: i64,
        reason: MovementReason,
        note: Option<String>,
    ) -> DomainResult<()> {
        let mut movement = StockMovement::new(
            slot,
            quantity,
            reason,
            self.reference.clone(),
            self.moved_by,
            note,
            self.now,
        )?;
        let id = slot.level_id();
        let now = self.now;
        let level = self
            .levels
            .entry(id)
            .or_insert_with(|| StockLevel::empty(slot, now));
        apply_movement(level, &mut movement)?;
        if !self.touched.contains(&id) {
            self.touched.push(id);
        }
        self.movements.push(movement);
        Ok(())
    }

    pub fn on_hand(&self, slot: StockSlot) -> i64 {
        self.levels
            .get(&slot.level_id())
            .map(|l| l.on_hand)
            .unwrap_or(0)
    }

    /// Changed levels (in first-touched order) and the new movements.
    pub fn into_parts(mut self) -> (Vec<StockLevel>, Vec<StockMovement>) {
        let levels = self
            .touched
            .iter()
            .filter_map(|id| self.levels.remove(id))
            .collect();
        (levels, self.movements)
    }
}
