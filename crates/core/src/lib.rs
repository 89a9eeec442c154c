//! `livebase-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, optimistic versioning, currency codes,
//! paging and document code formatting.

pub mod code;
pub mod currency;
pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod text;

pub use code::{DocumentCode, DocumentPrefix};
pub use currency::{CurrencyCode, line_amount, sum_amounts};
pub use entity::{Entity, ExpectedVersion, Record, Timestamps, nullable};
pub use error::{DomainError, DomainResult};
pub use id::{BaseId, EntityId, TenantId, UserId};
pub use page::{Page, PageRequest, date_in_range, paginate};
pub use text::{matches_keyword, normalize_code, optional_text, required_text};
