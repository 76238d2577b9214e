//! In-memory quant store.
//!
//! Intended for tests, the CLI and embedding hosts that keep stock in memory.
//! Implements the lookup, package-contents and move-execution collaborators.

use std::sync::RwLock;

use stockreloc_core::{DomainError, DomainResult, PackageId, QuantId};

use crate::location::LocationTree;
use crate::lookup::{QuantLookup, QuantQuery};
use crate::quant::Quant;
use crate::relocation::{MoveExecutor, PackageContents, RelocationMove};
use crate::removal::RemovalStrategy;
use crate::reservation::Allocation;

#[derive(Debug, Default)]
pub struct InMemoryQuantStore {
    locations: LocationTree,
    quants: RwLock<Vec<Quant>>,
}

impl InMemoryQuantStore {
    pub fn new(locations: LocationTree) -> Self {
        Self {
            locations,
            quants: RwLock::new(Vec::new()),
        }
    }

    pub fn with_quants(locations: LocationTree, quants: impl IntoIterator<Item = Quant>) -> Self {
        Self {
            locations,
            quants: RwLock::new(quants.into_iter().collect()),
        }
    }

    pub fn locations(&self) -> &LocationTree {
        &self.locations
    }

    pub fn insert(&self, quant: Quant) -> DomainResult<()> {
        let mut quants = self.write()?;
        if quants.iter().any(|q| q.id == quant.id) {
            return Err(DomainError::conflict(format!("quant {} already exists", quant.id)));
        }
        quants.push(quant);
        Ok(())
    }

    pub fn get(&self, id: QuantId) -> DomainResult<Quant> {
        self.read()?
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("quant {id}")))
    }

    /// Snapshot of every quant, in insertion order.
    pub fn snapshot(&self) -> DomainResult<Vec<Quant>> {
        Ok(self.read()?.clone())
    }

    /// Writes the reserved quantities of `allocations` back onto the quants.
    pub fn commit_reservation(&self, allocations: &[Allocation]) -> DomainResult<()> {
        let mut quants = self.write()?;
        let mut staged = quants.clone();
        for allocation in allocations {
            let quant = staged
                .iter_mut()
                .find(|q| q.id == allocation.quant.id)
                .ok_or_else(|| DomainError::not_found(format!("quant {}", allocation.quant.id)))?;
            quant.reserved_quantity += allocation.quantity;
        }
        *quants = staged;
        Ok(())
    }

    fn read(&self) -> DomainResult<std::sync::RwLockReadGuard<'_, Vec<Quant>>> {
        self.quants
            .read()
            .map_err(|_| DomainError::invariant("quant store lock poisoned"))
    }

    fn write(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, Vec<Quant>>> {
        self.quants
            .write()
            .map_err(|_| DomainError::invariant("quant store lock poisoned"))
    }
}

impl QuantLookup for InMemoryQuantStore {
    fn search(&self, query: &QuantQuery, _order: RemovalStrategy) -> DomainResult<Vec<Quant>> {
        Ok(self
            .read()?
            .iter()
            .filter(|q| query.matches(q, &self.locations))
            .cloned()
            .collect())
    }
}

impl PackageContents for InMemoryQuantStore {
    fn quants_in_package(&self, package: PackageId) -> DomainResult<Vec<QuantId>> {
        Ok(self
            .read()?
            .iter()
            .filter(|q| q.package_id == Some(package))
            .map(|q| q.id)
            .collect())
    }
}

impl MoveExecutor for InMemoryQuantStore {
    /// Applies every move to a staged copy and publishes it only when all of
    /// them succeed.
    fn execute(&self, moves: &[RelocationMove]) -> DomainResult<()> {
        let mut quants = self.write()?;
        let mut staged = quants.clone();

        for mv in moves {
            let source_idx = staged
                .iter()
                .position(|q| q.id == mv.quant_id)
                .ok_or_else(|| DomainError::not_found(format!("quant {}", mv.quant_id)))?;
            if !self.locations.contains(mv.location_dest_id) {
                return Err(DomainError::not_found(format!("location {}", mv.location_dest_id)));
            }

            let source = staged[source_idx].clone();
            if mv.quantity > source.quantity {
                return Err(DomainError::validation(format!(
                    "cannot move {} from quant {} holding {}",
                    mv.quantity, source.id, source.quantity
                )));
            }
            let remaining = &mut staged[source_idx];
            remaining.quantity -= mv.quantity;
            if remaining.reserved_quantity > remaining.quantity {
                remaining.reserved_quantity = remaining.quantity.max(rust_decimal::Decimal::ZERO);
            }
            if remaining.quantity.is_zero() {
                remaining.relocation_destination = None;
            }

            let existing = staged.iter_mut().find(|q| {
                q.product_id == mv.product_id
                    && q.location_id == mv.location_dest_id
                    && q.lot_id == mv.line.lot_id
                    && q.package_id == mv.line.result_package_id
                    && q.owner_id == mv.line.owner_id
                    && q.special_holding == source.special_holding
                    && q.expiration_date == source.expiration_date
                    && q.container == source.container
            });
            match existing {
                Some(dest) => dest.quantity += mv.quantity,
                None => {
                    let package_name = mv.line.result_package_id.and_then(|package| {
                        if source.package_id == Some(package) {
                            source.package_name.clone()
                        } else {
                            staged
                                .iter()
                                .find(|q| q.package_id == Some(package))
                                .and_then(|q| q.package_name.clone())
                        }
                    });
                    let location_name = self
                        .locations
                        .complete_name(mv.location_dest_id)
                        .unwrap_or_default();
                    staged.push(Quant {
                        id: QuantId::new(),
                        location_id: mv.location_dest_id,
                        location_name,
                        quantity: mv.quantity,
                        reserved_quantity: rust_decimal::Decimal::ZERO,
                        package_id: mv.line.result_package_id,
                        package_name,
                        relocation_destination: None,
                        ..source
                    });
                }
            }
        }

        tracing::debug!(moves = moves.len(), "moves executed");
        *quants = staged;
        Ok(())
    }
}
