//! Warehouse stock domain: quants, reservations and pallet relocation.
//!
//! This crate contains the warehouse business rules as deterministic domain
//! logic. Storage, sequence numbers and move execution are collaborators
//! behind traits; [`store::InMemoryQuantStore`] implements the stock-facing
//! ones for tests and embedding hosts.

pub mod expiry;
pub mod location;
pub mod lookup;
pub mod picking;
pub mod product;
pub mod quant;
pub mod relocation;
pub mod removal;
pub mod reservation;
pub mod returns;
pub mod store;
pub mod uom;

pub use expiry::{ClientExpiryRule, ExpiryWarning, check_expiration};
pub use location::{LocationNode, LocationTree};
pub use lookup::{LocationScope, LotFilter, QuantLookup, QuantQuery, QuantsCache, QuantsCacheKey, RefFilter};
pub use picking::{PickingContext, PickingState, PickingType, allowed_locations};
pub use product::{Packaging, PackagingReserveMethod, Product, ProductCatalog, Tracking};
pub use quant::{Quant, QuantGroupKey};
pub use relocation::{
    MoveExecutor, PackageContents, RelocationMove, RelocationMoveLine, RelocationPlan,
    RelocationRequest, SequenceSource, plan_relocation, relocate,
};
pub use removal::{FixedRemovalStrategy, RemovalStrategy, RemovalStrategyResolver, RemovalStrategyTable};
pub use reservation::{
    Allocation, GatherRequest, ReservationConsumer, ReservationDemand, ReservationEngine,
    ReservationLine, ReservationSettings, StockMove,
};
pub use returns::{ReturnLine, ReturnPlan, plan_package_return};
pub use store::InMemoryQuantStore;
pub use uom::{Uom, UomCatalog, UomConverter};
