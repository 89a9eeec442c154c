//! Bases and what hangs off them: sub-districts, locations, personnel and
//! warehouse keeper assignments.

use tracing::info;

use livebase_auth::{Action, DataScope};
use livebase_bases::{
    Base, BaseFilter, BaseInput, BaseUpdate, KeeperFilter, Location, LocationFilter, LocationId,
    LocationInput, LocationUpdate, Personnel, PersonnelFilter, PersonnelId, PersonnelInput,
    PersonnelUpdate, SubDistrict, SubDistrictFilter, SubDistrictId, SubDistrictInput,
    SubDistrictUpdate, WarehouseKeeper, WarehouseKeeperId, WarehouseKeeperInput,
};
use livebase_core::{BaseId, DomainError, Page, PageRequest, Record, paginate};
use livebase_infra::WriteBatch;
use livebase_inventory::{StockLevel, StockMovement, StockOut};
use livebase_parties::Party;
use livebase_products::Goods;
use livebase_purchasing::{Arrival, Payable, PurchaseOrder};
use livebase_sales::{DistributionOrder, Point, PointOrder, Visit};

use super::{Change, TenantServices};
use crate::app::errors::ServiceResult;

pub const BASES: &str = "bases";
pub const SUB_DISTRICTS: &str = "sub_districts";
pub const LOCATIONS: &str = "locations";
pub const PERSONNEL: &str = "personnel";
pub const WAREHOUSE_KEEPERS: &str = "warehouse_keepers";

/// Record kinds that pin a base in place while any of them exists.
const BASE_SCOPED_KINDS: &[&str] = &[
    SubDistrict::KIND,
    Location::KIND,
    Personnel::KIND,
    WarehouseKeeper::KIND,
    Goods::KIND,
    Party::KIND,
    Point::KIND,
    Visit::KIND,
    PurchaseOrder::KIND,
    Arrival::KIND,
    Payable::KIND,
    StockLevel::KIND,
    StockMovement::KIND,
    StockOut::KIND,
    PointOrder::KIND,
    DistributionOrder::KIND,
];

impl TenantServices {
    // -------------------------
    // Bases
    // -------------------------

    pub async fn list_bases(&self, filter: BaseFilter, page: PageRequest) -> ServiceResult<Page<Base>> {
        self.require(BASES, Action::Read)?;
        let mut bases: Vec<Base> = self.list(None).await?;
        bases.retain(|b| filter.matches(b));
        bases.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(paginate(bases, &page))
    }

    pub async fn get_base(&self, id: BaseId) -> ServiceResult<Base> {
        self.require(BASES, Action::Read)?;
        self.find(&id).await
    }

    pub async fn create_base(&self, input: BaseInput) -> ServiceResult<Base> {
        self.require(BASES, Action::Write)?;
        if self.principal().scope != DataScope::All {
            return Err(DomainError::forbidden(
                "creating bases requires tenant-wide data scope",
            )
            .into());
        }
        let mut base = Base::create(input, self.now())?;
        let existing: Vec<Base> = self.list_all().await?;
        if existing.iter().any(|b| b.code == base.code) {
            return Err(DomainError::conflict(format!("base code {} already exists", base.code)).into());
        }
        self.save(BASES, &mut base, "created").await?;
        info!(tenant_id = %self.tenant_id(), base_id = %base.id, code = %base.code, "base created");
        Ok(base)
    }

    pub async fn update_base(&self, id: BaseId, patch: BaseUpdate) -> ServiceResult<Base> {
        self.require(BASES, Action::Write)?;
        self.require_base(id)?;
        let mut base: Base = self.find(&id).await?;
        base.update(patch, self.now())?;
        self.save(BASES, &mut base, "updated").await?;
        Ok(base)
    }

    pub async fn set_base_enabled(&self, id: BaseId, enabled: bool) -> ServiceResult<Base> {
        self.require(BASES, Action::Write)?;
        self.require_base(id)?;
        let mut base: Base = self.find(&id).await?;
        let action = if enabled {
            base.enable(self.now())?;
            "enabled"
        } else {
            base.disable(self.now())?;
            "disabled"
        };
        self.save(BASES, &mut base, action).await?;
        info!(tenant_id = %self.tenant_id(), base_id = %base.id, action, "base status changed");
        Ok(base)
    }

    pub async fn delete_base(&self, id: BaseId) -> ServiceResult<()> {
        self.require(BASES, Action::Delete)?;
        self.require_base(id)?;
        let base: Base = self.find(&id).await?;
        for kind in BASE_SCOPED_KINDS {
            let docs = self
                .app
                .store
                .list(self.tenant_id(), kind, Some(&[id]))
                .await?;
            if docs.iter().any(|d| d.base_id == Some(id)) {
                return Err(DomainError::conflict(format!(
                    "base {} is still referenced by {kind}",
                    base.code
                ))
                .into());
            }
        }
        self.remove(BASES, &base).await?;
        info!(tenant_id = %self.tenant_id(), base_id = %id, "base deleted");
        Ok(())
    }

    // -------------------------
    // Sub-districts
    // -------------------------

    pub async fn list_sub_districts(
        &self,
        filter: SubDistrictFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<SubDistrict>> {
        self.require(SUB_DISTRICTS, Action::Read)?;
        let mut items: Vec<SubDistrict> = self.list(filter.base_id).await?;
        items.retain(|d| filter.matches(d));
        items.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(paginate(items, &page))
    }

    pub async fn get_sub_district(&self, id: SubDistrictId) -> ServiceResult<SubDistrict> {
        self.require(SUB_DISTRICTS, Action::Read)?;
        self.find(&id).await
    }

    pub async fn create_sub_district(&self, input: SubDistrictInput) -> ServiceResult<SubDistrict> {
        self.require(SUB_DISTRICTS, Action::Write)?;
        self.writable_base(input.base_id).await?;
        let mut district = SubDistrict::create(input, self.now())?;
        let existing: Vec<SubDistrict> = self.list_all().await?;
        if existing
            .iter()
            .any(|d| d.base_id == district.base_id && d.code == district.code)
        {
            return Err(DomainError::conflict(format!(
                "sub-district code {} already exists in this base",
                district.code
            ))
            .into());
        }
        self.save(SUB_DISTRICTS, &mut district, "created").await?;
        Ok(district)
    }

    pub async fn update_sub_district(
        &self,
        id: SubDistrictId,
        patch: SubDistrictUpdate,
    ) -> ServiceResult<SubDistrict> {
        self.require(SUB_DISTRICTS, Action::Write)?;
        let mut district: SubDistrict = self.find(&id).await?;
        self.require_base(district.base_id)?;
        district.update(patch, self.now())?;
        self.save(SUB_DISTRICTS, &mut district, "updated").await?;
        Ok(district)
    }

    pub async fn delete_sub_district(&self, id: SubDistrictId) -> ServiceResult<()> {
        self.require(SUB_DISTRICTS, Action::Delete)?;
        let district: SubDistrict = self.find(&id).await?;
        self.require_base(district.base_id)?;
        let points: Vec<Point> = self.list_all().await?;
        if points.iter().any(|p| p.sub_district_id == Some(id)) {
            return Err(DomainError::conflict(format!(
                "sub-district {} still has points",
                district.code
            ))
            .into());
        }
        self.remove(SUB_DISTRICTS, &district).await
    }

    // -------------------------
    // Locations
    // -------------------------

    pub async fn list_locations(
        &self,
        filter: LocationFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Location>> {
        self.require(LOCATIONS, Action::Read)?;
        let mut items: Vec<Location> = self.list(filter.base_id).await?;
        items.retain(|l| filter.matches(l));
        items.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(paginate(items, &page))
    }

    pub async fn get_location(&self, id: LocationId) -> ServiceResult<Location> {
        self.require(LOCATIONS, Action::Read)?;
        self.find(&id).await
    }

    pub async fn create_location(&self, input: LocationInput) -> ServiceResult<Location> {
        self.require(LOCATIONS, Action::Write)?;
        self.writable_base(input.base_id).await?;
        let mut location = Location::create(input, self.now())?;
        let existing: Vec<Location> = self.list_all().await?;
        if existing
            .iter()
            .any(|l| l.base_id == location.base_id && l.code == location.code)
        {
            return Err(DomainError::conflict(format!(
                "location code {} already exists in this base",
                location.code
            ))
            .into());
        }
        self.save(LOCATIONS, &mut location, "created").await?;
        info!(
            tenant_id = %self.tenant_id(),
            base_id = %location.base_id,
            location_id = %location.id,
            "location created"
        );
        Ok(location)
    }

    pub async fn update_location(&self, id: LocationId, patch: LocationUpdate) -> ServiceResult<Location> {
        self.require(LOCATIONS, Action::Write)?;
        let mut location: Location = self.find(&id).await?;
        self.require_base(location.base_id)?;
        location.update(patch, self.now())?;
        self.save(LOCATIONS, &mut location, "updated").await?;
        Ok(location)
    }

    /// Refused while stock is held there; keeper assignments go with it.
    pub async fn delete_location(&self, id: LocationId) -> ServiceResult<()> {
        self.require(LOCATIONS, Action::Delete)?;
        let location: Location = self.find(&id).await?;
        self.require_base(location.base_id)?;
        let levels: Vec<StockLevel> = self.list(Some(location.base_id)).await?;
        if levels.iter().any(|l| l.location_id == id && l.on_hand > 0) {
            return Err(DomainError::conflict(format!(
                "location {} still holds stock",
                location.code
            ))
            .into());
        }

        let keepers: Vec<WarehouseKeeper> = self.list(Some(location.base_id)).await?;
        let mut batch = WriteBatch::new();
        let mut changes = vec![Change::new(LOCATIONS, id, "deleted")];
        for keeper in keepers.iter().filter(|k| k.location_id == id) {
            batch.delete(keeper);
            changes.push(Change::new(WAREHOUSE_KEEPERS, keeper.id, "deleted"));
        }
        for level in levels.iter().filter(|l| l.location_id == id) {
            batch.delete(level);
        }
        batch.delete(&location);
        self.commit(batch, changes).await
    }

    // -------------------------
    // Personnel
    // -------------------------

    pub async fn list_personnel(
        &self,
        filter: PersonnelFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Personnel>> {
        self.require(PERSONNEL, Action::Read)?;
        let mut items: Vec<Personnel> = self.list(filter.base_id).await?;
        items.retain(|p| filter.matches(p));
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(items, &page))
    }

    pub async fn get_personnel(&self, id: PersonnelId) -> ServiceResult<Personnel> {
        self.require(PERSONNEL, Action::Read)?;
        self.find(&id).await
    }

    pub async fn create_personnel(&self, input: PersonnelInput) -> ServiceResult<Personnel> {
        self.require(PERSONNEL, Action::Write)?;
        self.writable_base(input.base_id).await?;
        let mut person = Personnel::create(input, self.now())?;
        self.save(PERSONNEL, &mut person, "created").await?;
        Ok(person)
    }

    pub async fn update_personnel(
        &self,
        id: PersonnelId,
        patch: PersonnelUpdate,
    ) -> ServiceResult<Personnel> {
        self.require(PERSONNEL, Action::Write)?;
        let mut person: Personnel = self.find(&id).await?;
        self.require_base(person.base_id)?;
        person.update(patch, self.now())?;
        self.save(PERSONNEL, &mut person, "updated").await?;
        Ok(person)
    }

    pub async fn delete_personnel(&self, id: PersonnelId) -> ServiceResult<()> {
        self.require(PERSONNEL, Action::Delete)?;
        let person: Personnel = self.find(&id).await?;
        self.require_base(person.base_id)?;
        let keepers: Vec<WarehouseKeeper> = self.list(Some(person.base_id)).await?;
        let visits: Vec<Visit> = self.list(Some(person.base_id)).await?;
        if keepers.iter().any(|k| k.personnel_id == id) || visits.iter().any(|v| v.personnel_id == id) {
            return Err(DomainError::conflict(format!(
                "{} is still referenced by keeper assignments or visits; mark them as left instead",
                person.name
            ))
            .into());
        }
        self.remove(PERSONNEL, &person).await
    }

    // -------------------------
    // Warehouse keepers
    // -------------------------

    pub async fn list_keepers(
        &self,
        filter: KeeperFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<WarehouseKeeper>> {
        self.require(WAREHOUSE_KEEPERS, Action::Read)?;
        let mut items: Vec<WarehouseKeeper> = self.list(filter.base_id).await?;
        items.retain(|k| filter.matches(k));
        items.sort_by_key(|k| k.timestamps.created_at);
        Ok(paginate(items, &page))
    }

    pub async fn assign_keeper(&self, input: WarehouseKeeperInput) -> ServiceResult<WarehouseKeeper> {
        self.require(WAREHOUSE_KEEPERS, Action::Write)?;
        let location: Location = self.find(&input.location_id).await?;
        self.writable_base(location.base_id).await?;
        let person: Personnel = self.find(&input.personnel_id).await?;
        let existing: Vec<WarehouseKeeper> = self.list(Some(location.base_id)).await?;
        let mut keeper = WarehouseKeeper::assign(&person, &location, &existing, self.now())?;
        self.save(WAREHOUSE_KEEPERS, &mut keeper, "created").await?;
        info!(
            tenant_id = %self.tenant_id(),
            personnel_id = %person.id,
            location_id = %location.id,
            "warehouse keeper assigned"
        );
        Ok(keeper)
    }

    pub async fn unassign_keeper(&self, id: WarehouseKeeperId) -> ServiceResult<()> {
        self.require(WAREHOUSE_KEEPERS, Action::Delete)?;
        let keeper: WarehouseKeeper = self.find(&id).await?;
        self.require_base(keeper.base_id)?;
        self.remove(WAREHOUSE_KEEPERS, &keeper).await
    }
}
