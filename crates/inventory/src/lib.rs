//! Inventory domain module: stock levels per location, the append-only
//! movement ledger and outbound stock-outs.
//!
//! This crate contains business rules for inventory, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod level;
pub mod movement;
pub mod posting;
pub mod stock_out;

pub use level::{LevelFilter, StockLevel, StockLevelId, StockSlot};
pub use movement::{
    AdjustmentInput, MovementFilter, MovementReason, MovementRef, StockMovement, StockMovementId,
    apply_movement,
};
pub use posting::StockPosting;
pub use stock_out::{
    StockOut, StockOutCategory, StockOutFilter, StockOutId, StockOutInput, StockOutLine,
};
