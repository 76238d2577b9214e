use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{Entity, LocationId, LotId, OwnerId, PackageId, ProductId, QuantId};

/// Physical, trackable quantity of one product at one location.
///
/// `quantity` (on hand) and `reserved_quantity` are signed: an oversold quant
/// may carry more reservation than stock, and inventory corrections can push
/// on-hand below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quant {
    pub id: QuantId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    /// Complete hierarchical name of the location (`WH/Stock/A-01`).
    pub location_name: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub reserved_quantity: Decimal,
    #[serde(default)]
    pub lot_id: Option<LotId>,
    #[serde(default)]
    pub package_id: Option<PackageId>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    /// Quarantined / blocked stock: never relocated, consumed last.
    #[serde(default)]
    pub special_holding: bool,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub container: Option<String>,
    /// Destination picked for this pallet in a pending relocation.
    #[serde(default)]
    pub relocation_destination: Option<LocationId>,
}

/// Stock sharing location, lot, package and owner. Negative slack is tracked
/// per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantGroupKey {
    pub location_id: LocationId,
    pub lot_id: Option<LotId>,
    pub package_id: Option<PackageId>,
    pub owner_id: Option<OwnerId>,
}

impl Quant {
    pub fn new(
        id: QuantId,
        product_id: ProductId,
        location_id: LocationId,
        location_name: impl Into<String>,
        quantity: Decimal,
    ) -> Self {
        Self {
            id,
            product_id,
            location_id,
            location_name: location_name.into(),
            quantity,
            reserved_quantity: Decimal::ZERO,
            lot_id: None,
            package_id: None,
            package_name: None,
            owner_id: None,
            special_holding: false,
            expiration_date: None,
            container: None,
            relocation_destination: None,
        }
    }

    pub fn with_reserved(mut self, reserved: Decimal) -> Self {
        self.reserved_quantity = reserved;
        self
    }

    pub fn with_lot(mut self, lot: LotId) -> Self {
        self.lot_id = Some(lot);
        self
    }

    pub fn with_package(mut self, package: PackageId, name: impl Into<String>) -> Self {
        self.package_id = Some(package);
        self.package_name = Some(name.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    pub fn on_special_holding(mut self) -> Self {
        self.special_holding = true;
        self
    }

    pub fn expiring(mut self, date: NaiveDate) -> Self {
        self.expiration_date = Some(date);
        self
    }

    pub fn in_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn relocating_to(mut self, destination: LocationId) -> Self {
        self.relocation_destination = Some(destination);
        self
    }

    /// On hand minus reserved. Negative for oversold quants.
    pub fn available_quantity(&self) -> Decimal {
        self.quantity - self.reserved_quantity
    }

    pub fn group_key(&self) -> QuantGroupKey {
        QuantGroupKey {
            location_id: self.location_id,
            lot_id: self.lot_id,
            package_id: self.package_id,
            owner_id: self.owner_id,
        }
    }

    pub fn package_label(&self) -> &str {
        self.package_name.as_deref().unwrap_or("")
    }
}

impl Entity for Quant {
    type Id = QuantId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
