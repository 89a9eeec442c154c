//! Goods catalog domain module.
//!
//! This crate contains business rules for the goods catalog, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod goods;

pub use goods::{Goods, GoodsFilter, GoodsId, GoodsInput, GoodsStatus, GoodsUpdate};
