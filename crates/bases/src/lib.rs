//! Bases domain module: live-stream bases / offline regions and what hangs
//! directly off them (sub-districts, storage locations, personnel and
//! warehouse keeper assignments).
//!
//! Pure domain logic: no IO, no HTTP, no storage.

pub mod base;
pub mod keeper;
pub mod location;
pub mod personnel;
pub mod sub_district;

pub use base::{Base, BaseFilter, BaseInput, BaseKind, BaseStatus, BaseUpdate};
pub use keeper::{KeeperFilter, WarehouseKeeper, WarehouseKeeperId, WarehouseKeeperInput};
pub use location::{Location, LocationFilter, LocationId, LocationInput, LocationKind, LocationUpdate};
pub use personnel::{
    Personnel, PersonnelFilter, PersonnelId, PersonnelInput, PersonnelStatus, PersonnelUpdate,
    Position,
};
pub use sub_district::{SubDistrict, SubDistrictFilter, SubDistrictId, SubDistrictInput, SubDistrictUpdate};
