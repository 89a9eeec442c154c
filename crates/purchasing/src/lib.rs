//! Purchasing domain module: purchase orders, arrivals against them and the
//! payables they accrue.
//!
//! This crate contains business rules for procurement, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod arrival;
pub mod order;
pub mod payable;

pub use arrival::{Arrival, ArrivalFilter, ArrivalId, ArrivalInput, ArrivalLine, ArrivalLineInput, ArrivalStatus};
pub use order::{
    PurchaseLine, PurchaseLineInput, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderId,
    PurchaseOrderInput, PurchaseOrderStatus, PurchaseOrderUpdate,
};
pub use payable::{Payable, PayableFilter, PayableId, PayableStatus, Payment, PaymentInput};
