use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainError, DomainResult, LocationId, OwnerId, PackageId, ProductId};

use crate::product::ProductCatalog;
use crate::quant::Quant;

use super::RelocationMove;

/// Rejects quants that may not be relocated: special-holding stock, and
/// stock with part of it reserved on a picking.
pub fn ensure_relocatable(quant: &Quant, products: &ProductCatalog) -> DomainResult<()> {
    if quant.special_holding {
        tracing::warn!(quant = %quant.id, "relocation refused: special holding");
        return Err(DomainError::validation(
            "You cannot relocate pallets that are on Special Holding State",
        ));
    }
    if quant.available_quantity() != quant.quantity {
        tracing::warn!(
            quant = %quant.id,
            reserved = %quant.reserved_quantity,
            "relocation refused: reserved stock"
        );
        return Err(DomainError::validation(format!(
            "Record with a Product of {} and a Pallet of {} seems to have quantities reserved on a picking record. \
             Please release them before relocating the stock record.",
            products.display_name(quant.product_id),
            quant.package_label()
        )));
    }
    Ok(())
}

/// Checks a destination picked for `quant` against the destinations already
/// assigned on `others`.
///
/// A destination belongs to one pallet, and a pallet goes to one destination.
pub fn check_destination_assignment(
    quant: &Quant,
    destination: LocationId,
    others: &[Quant],
) -> DomainResult<()> {
    for other in others.iter().filter(|o| o.id != quant.id) {
        if other.relocation_destination == Some(destination) && other.package_id != quant.package_id {
            return Err(DomainError::conflict(
                "It seems like the last location you've selected is already chosen as another relocation location. \
                 Please change the location.",
            ));
        }
        if quant.package_id.is_some() && other.package_id == quant.package_id {
            if let Some(assigned) = other.relocation_destination {
                if assigned != destination {
                    return Err(DomainError::conflict(
                        "You cannot move the same Pallet into multiple Locations.",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// A product put into a pallet by a planned line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletAssignment {
    pub product_id: ProductId,
    pub product_name: String,
    pub pallet: Option<PackageId>,
    pub pallet_name: String,
}

/// Reminder listing pallets that would end up holding several products.
/// Empty when every pallet holds a single product.
pub fn mixed_pallet_reminder(assignments: &[PalletAssignment]) -> String {
    let mut conflicts: Vec<(&str, Vec<&str>)> = Vec::new();
    for (idx, line) in assignments.iter().enumerate() {
        let Some(pallet) = line.pallet else { continue };
        for earlier in &assignments[..idx] {
            if earlier.pallet != Some(pallet) || earlier.product_id == line.product_id {
                continue;
            }
            let pos = match conflicts.iter().position(|(name, _)| *name == line.pallet_name) {
                Some(pos) => pos,
                None => {
                    conflicts.push((line.pallet_name.as_str(), vec![earlier.product_name.as_str()]));
                    conflicts.len() - 1
                }
            };
            let products = &mut conflicts[pos].1;
            if !products.contains(&line.product_name.as_str()) {
                products.push(line.product_name.as_str());
            }
        }
    }

    if conflicts.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = conflicts
        .iter()
        .map(|(pallet, products)| {
            format!("• Pallet: '{pallet}' contains multiple products: {}", products.join(", "))
        })
        .collect();
    format!(
        "Reminder:\n{}\n\nAre you sure you want to insert each line of multiple products into a single pallet?",
        lines.join("\n")
    )
}

/// Orders relocation lines for printing: by batch number, then owner name.
pub fn sort_by_batch<F>(moves: &mut [RelocationMove], owner_name: F)
where
    F: Fn(Option<OwnerId>) -> String,
{
    moves.sort_by_cached_key(|m| (m.line.batch_number.clone(), owner_name(m.line.owner_id)));
}
