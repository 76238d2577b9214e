//! Quant totals grouped by product, location or owner.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{LocationId, OwnerId, ProductId};
use stockreloc_inventory::Quant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Product,
    Location,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by", content = "id")]
pub enum GroupKey {
    Product(ProductId),
    Location(LocationId),
    /// `None` is company-owned stock.
    Owner(Option<OwnerId>),
}

impl GroupKey {
    pub fn of(quant: &Quant, by: GroupBy) -> Self {
        match by {
            GroupBy::Product => Self::Product(quant.product_id),
            GroupBy::Location => Self::Location(quant.location_id),
            GroupBy::Owner => Self::Owner(quant.owner_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantTotal {
    pub key: GroupKey,
    pub quant_count: usize,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    pub available: Decimal,
}

/// Sums on-hand, reserved and available quantity per group, in the order each
/// group is first seen.
pub fn quant_totals(quants: &[Quant], by: GroupBy) -> Vec<QuantTotal> {
    let mut totals: Vec<QuantTotal> = Vec::new();
    for quant in quants {
        let key = GroupKey::of(quant, by);
        let index = match totals.iter().position(|t| t.key == key) {
            Some(index) => index,
            None => {
                totals.push(QuantTotal {
                    key,
                    quant_count: 0,
                    on_hand: Decimal::ZERO,
                    reserved: Decimal::ZERO,
                    available: Decimal::ZERO,
                });
                totals.len() - 1
            }
        };
        let total = &mut totals[index];
        total.quant_count += 1;
        total.on_hand += quant.quantity;
        total.reserved += quant.reserved_quantity;
        total.available += quant.available_quantity();
    }
    totals
}
