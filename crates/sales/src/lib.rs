//! Sales domain module: retail points, their orders, distribution (wholesale)
//! orders to customers and field visits.
//!
//! This crate contains business rules for sales, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod distribution;
pub mod lines;
pub mod point;
pub mod point_order;
pub mod visit;

pub use distribution::{
    DistributionOrder, DistributionOrderFilter, DistributionOrderId, DistributionOrderInput,
    DistributionOrderUpdate, DistributionStatus,
};
pub use lines::{SalesLine, SalesLineInput};
pub use point::{Point, PointFilter, PointId, PointInput, PointStatus, PointUpdate};
pub use point_order::{
    PointOrder, PointOrderFilter, PointOrderId, PointOrderInput, PointOrderStatus, PointOrderUpdate,
};
pub use visit::{Visit, VisitFilter, VisitId, VisitInput};
