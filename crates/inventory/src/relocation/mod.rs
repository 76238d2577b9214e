//! Pallet relocation: turning a selection of quants with assigned destinations
//! into moves, plus the checks run while destinations are being picked.

mod checks;
mod plan;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainResult, LocationId, LotId, OwnerId, PackageId, ProductId, QuantId};

use crate::quant::Quant;

pub use checks::{
    PalletAssignment, check_destination_assignment, ensure_relocatable, mixed_pallet_reminder,
    sort_by_batch,
};
pub use plan::{plan_relocation, relocate};

/// Sequence code the batch numbers are drawn from.
pub const RELOCATION_SEQUENCE: &str = "relocate.form.series";

/// Default name of relocation moves.
pub const DEFAULT_MOVE_NAME: &str = "Quantity Relocated";

/// A relocation order over a set of quants. Each quant's destination is its
/// `relocation_destination`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationRequest {
    pub quants: Vec<Quant>,
    /// Package every relocated quant is put into.
    #[serde(default)]
    pub dest_package: Option<PackageId>,
    /// Part of a pallet is being moved: quants leaving their pallet behind are
    /// unpacked unless a destination package is given.
    #[serde(default)]
    pub is_partial_package: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Warehouseman performing the relocation.
    #[serde(default)]
    pub operator: Option<String>,
}

/// The move-line half of a relocation move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationMoveLine {
    pub lot_id: Option<LotId>,
    pub package_id: Option<PackageId>,
    pub result_package_id: Option<PackageId>,
    pub owner_id: Option<OwnerId>,
    pub operator: Option<String>,
    pub batch_number: Option<String>,
}

/// Moves the whole quantity of one quant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationMove {
    pub name: String,
    pub quant_id: QuantId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub location_id: LocationId,
    pub location_dest_id: LocationId,
    /// Only stock of this partner may be moved.
    pub restrict_partner_id: Option<OwnerId>,
    pub line: RelocationMoveLine,
}

impl RelocationMove {
    pub fn unpacks(&self) -> bool {
        self.line.package_id.is_some() && self.line.result_package_id.is_none()
    }
}

/// Outcome of planning a relocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationPlan {
    pub batch_number: String,
    pub moves: Vec<RelocationMove>,
    /// (package, location) groups left alone for lack of a destination.
    pub skipped: Vec<(Option<PackageId>, LocationId)>,
}

/// Issues sequence numbers.
pub trait SequenceSource {
    fn next_value(&self, code: &str) -> DomainResult<String>;
}

impl<T> SequenceSource for &T
where
    T: SequenceSource + ?Sized,
{
    fn next_value(&self, code: &str) -> DomainResult<String> {
        (**self).next_value(code)
    }
}

/// Answers which quants a package currently holds.
pub trait PackageContents {
    fn quants_in_package(&self, package: PackageId) -> DomainResult<Vec<QuantId>>;
}

impl<T> PackageContents for &T
where
    T: PackageContents + ?Sized,
{
    fn quants_in_package(&self, package: PackageId) -> DomainResult<Vec<QuantId>> {
        (**self).quants_in_package(package)
    }
}

/// Executes planned moves: all of them or none.
pub trait MoveExecutor {
    fn execute(&self, moves: &[RelocationMove]) -> DomainResult<()>;
}

impl<T> MoveExecutor for &T
where
    T: MoveExecutor + ?Sized,
{
    fn execute(&self, moves: &[RelocationMove]) -> DomainResult<()> {
        (**self).execute(moves)
    }
}
