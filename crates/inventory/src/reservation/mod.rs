//! Quantity reservation engine.
//!
//! - **gather**: pick the candidate quants for a product/location and order
//!   them by removal strategy.
//! - **reserve**: split a signed demand across the gathered quants.
//! - **apply**: fold an allocation into a consumer's reservation lines.
//!
//! The engine is a pure computation over the quants it reads. It takes no
//! locks; the host must run gather, reserve and the resulting writes inside one
//! transaction that excludes concurrent writers on the same quants.

mod apply;
mod gather;
mod reserve;
mod settings;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{LocationId, LotId, OwnerId, PackageId, UomId};

use crate::product::{Packaging, Product};
use crate::quant::Quant;

pub use apply::{LineMetadata, ReservationConsumer, ReservationLine, StockMove};
pub use gather::sort_for_removal;
pub use reserve::available_quantity;
pub use settings::{PRECISION_DIGITS_ENV, REMOVAL_STRATEGY_ENV, ReservationSettings};

/// Inputs of `gather`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherRequest<'a> {
    pub product: &'a Product,
    pub location: LocationId,
    pub lot: Option<LotId>,
    pub package: Option<PackageId>,
    pub owner: Option<OwnerId>,
    pub strict: bool,
    /// Demand, only used by strategies that size the candidate set.
    pub quantity: Decimal,
    pub container: Option<&'a str>,
}

impl GatherRequest<'_> {
    /// Downstream compatibility filter for loose gathers: the requested lot
    /// (or no lot), and the package/owner when one was asked for.
    pub fn is_compatible(&self, quant: &Quant) -> bool {
        let lot_ok = match self.lot {
            Some(lot) => quant.lot_id.is_none() || quant.lot_id == Some(lot),
            None => true,
        };
        let package_ok = self.package.is_none() || quant.package_id == self.package;
        let owner_ok = self.owner.is_none() || quant.owner_id == self.owner;
        lot_ok && package_ok && owner_ok
    }
}

/// A request to reserve (positive) or release (negative) stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationDemand {
    pub product: Product,
    pub location: LocationId,
    pub quantity: Decimal,
    #[serde(default)]
    pub packaging: Option<Packaging>,
    /// Unit the caller works in; defaults to the product unit.
    #[serde(default)]
    pub uom: Option<UomId>,
    #[serde(default)]
    pub lot: Option<LotId>,
    #[serde(default)]
    pub package: Option<PackageId>,
    #[serde(default)]
    pub owner: Option<OwnerId>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub strict: bool,
}

impl ReservationDemand {
    pub fn new(product: Product, location: LocationId, quantity: Decimal) -> Self {
        Self {
            product,
            location,
            quantity,
            packaging: None,
            uom: None,
            lot: None,
            package: None,
            owner: None,
            container: None,
            strict: false,
        }
    }

    pub fn with_packaging(mut self, packaging: Option<Packaging>) -> Self {
        self.packaging = packaging;
        self
    }

    pub fn with_uom(mut self, uom: UomId) -> Self {
        self.uom = Some(uom);
        self
    }

    pub fn with_lot(mut self, lot: Option<LotId>) -> Self {
        self.lot = lot;
        self
    }

    pub fn with_package(mut self, package: Option<PackageId>) -> Self {
        self.package = package;
        self
    }

    pub fn with_owner(mut self, owner: Option<OwnerId>) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn gather_request(&self) -> GatherRequest<'_> {
        GatherRequest {
            product: &self.product,
            location: self.location,
            lot: self.lot,
            package: self.package,
            owner: self.owner,
            strict: self.strict,
            quantity: self.quantity,
            container: self.container.as_deref(),
        }
    }
}

/// One slice of a demand taken from (or given back to) a quant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub quant: Quant,
    /// Signed, in the product unit.
    pub quantity: Decimal,
}

/// Sum of allocated quantities.
pub fn allocated_total(allocations: &[Allocation]) -> Decimal {
    allocations.iter().map(|a| a.quantity).sum()
}

/// The engine and its collaborators.
#[derive(Debug, Clone)]
pub struct ReservationEngine<L, S, U> {
    lookup: L,
    strategies: S,
    uoms: U,
    settings: ReservationSettings,
}

impl<L, S, U> ReservationEngine<L, S, U> {
    pub fn new(lookup: L, strategies: S, uoms: U) -> Self {
        Self {
            lookup,
            strategies,
            uoms,
            settings: ReservationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ReservationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ReservationSettings {
        &self.settings
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }
}
