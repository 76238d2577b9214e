//! Returning delivered pallets to the warehouse.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainError, DomainResult, LocationId, PackageId, ProductId, UomId};

/// One delivered line offered for return.
///
/// The `actual_*` values are what was delivered; the others are what is being
/// returned and may only be reduced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    #[serde(default)]
    pub selected: bool,
    pub product_id: ProductId,
    #[serde(default)]
    pub package: Option<PackageId>,
    #[serde(default)]
    pub pallet_series_id: Option<String>,
    /// Where the pallet came from; it goes back there.
    pub location_dest_id: LocationId,
    pub quantity: Decimal,
    pub actual_quantity: Decimal,
    #[serde(default)]
    pub pack_units: Decimal,
    #[serde(default)]
    pub actual_pack_units: Decimal,
    #[serde(default)]
    pub min_units: Decimal,
    #[serde(default)]
    pub actual_min_units: Decimal,
    #[serde(default)]
    pub pack_uom: Option<UomId>,
    #[serde(default)]
    pub min_uom: Option<UomId>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub production_date: Option<NaiveDate>,
    #[serde(default)]
    pub container_number: Option<String>,
    #[serde(default)]
    pub return_count: u32,
}

impl ReturnLine {
    /// A line returning everything that was delivered.
    pub fn delivered(
        product_id: ProductId,
        package: Option<PackageId>,
        location_dest_id: LocationId,
        quantity: Decimal,
        pack_units: Decimal,
        min_units: Decimal,
    ) -> Self {
        Self {
            selected: false,
            product_id,
            package,
            pallet_series_id: None,
            location_dest_id,
            quantity,
            actual_quantity: quantity,
            pack_units,
            actual_pack_units: pack_units,
            min_units,
            actual_min_units: min_units,
            pack_uom: None,
            min_uom: None,
            expiration_date: None,
            production_date: None,
            container_number: None,
            return_count: 0,
        }
    }

    pub fn select(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Quantities when the line is reduced.
    pub fn reduce(mut self, quantity: Decimal, pack_units: Decimal, min_units: Decimal) -> Self {
        self.quantity = quantity;
        self.pack_units = pack_units;
        self.min_units = min_units;
        self
    }

    fn is_reduced(&self) -> bool {
        self.pack_units < self.actual_pack_units
            || self.min_units < self.actual_min_units
            || self.quantity < self.actual_quantity
    }

    /// Values left at their delivered amount.
    fn unchanged_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.pack_units == self.actual_pack_units {
            fields.push("Packaging Unit");
        }
        if self.min_units == self.actual_min_units {
            fields.push("Minimum Unit");
        }
        if self.quantity == self.actual_quantity {
            fields.push("Quantity");
        }
        fields
    }
}

/// Return demand for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedProduct {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub line_count: u32,
    pub demand_packaging: Decimal,
    pub demand_min: Decimal,
    pub pack_uom: Option<UomId>,
    pub min_uom: Option<UomId>,
}

/// One pallet coming back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedPackage {
    pub product_id: ProductId,
    pub package: Option<PackageId>,
    pub location_dest_id: LocationId,
    pub quantity: Decimal,
    pub pack_units: Decimal,
    pub min_units: Decimal,
    pub pack_uom: Option<UomId>,
    pub min_uom: Option<UomId>,
    pub pallet_series_id: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub production_date: Option<NaiveDate>,
    pub container_number: Option<String>,
    pub return_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPlan {
    pub products: Vec<ReturnedProduct>,
    pub packages: Vec<ReturnedPackage>,
}

/// Turns the selected lines into per-product demand and per-pallet lines.
pub fn plan_package_return(lines: &[ReturnLine]) -> DomainResult<ReturnPlan> {
    let selected: Vec<&ReturnLine> = lines.iter().filter(|l| l.selected).collect();
    if selected.is_empty() {
        return Err(DomainError::validation("Please select at least 1 Move Line."));
    }

    for line in &selected {
        if line.is_reduced() {
            let unchanged = line.unchanged_fields();
            if !unchanged.is_empty() {
                return Err(DomainError::validation(format!(
                    "The following fields must also be reduced to maintain synchronization: {}.",
                    unchanged.join(", ")
                )));
            }
        }
    }

    let mut plan = ReturnPlan::default();
    for line in &selected {
        match plan.products.iter_mut().find(|p| p.product_id == line.product_id) {
            Some(product) => {
                product.quantity += line.quantity;
                product.line_count += 1;
                product.demand_packaging += line.pack_units;
                product.demand_min += line.min_units;
                product.pack_uom = line.pack_uom;
                product.min_uom = line.min_uom;
            }
            None => plan.products.push(ReturnedProduct {
                product_id: line.product_id,
                quantity: line.quantity,
                line_count: 1,
                demand_packaging: line.pack_units,
                demand_min: line.min_units,
                pack_uom: line.pack_uom,
                min_uom: line.min_uom,
            }),
        }
        plan.packages.push(ReturnedPackage {
            product_id: line.product_id,
            package: line.package,
            location_dest_id: line.location_dest_id,
            quantity: line.quantity,
            pack_units: line.pack_units,
            min_units: line.min_units,
            pack_uom: line.pack_uom,
            min_uom: line.min_uom,
            pallet_series_id: line.pallet_series_id.clone(),
            expiration_date: line.expiration_date,
            production_date: line.production_date,
            container_number: line.container_number.clone(),
            return_count: line.return_count + 1,
        });
    }

    tracing::info!(
        products = plan.products.len(),
        packages = plan.packages.len(),
        "package return planned"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const DOCK: LocationId = LocationId::from_u128(1);

    fn line(product: u128, pallet: u128, qty: Decimal) -> ReturnLine {
        ReturnLine::delivered(
            ProductId::from_u128(product),
            Some(PackageId::from_u128(pallet)),
            DOCK,
            qty,
            dec!(1),
            dec!(40),
        )
    }

    #[test]
    fn nothing_selected_is_rejected() {
        let err = plan_package_return(&[line(1, 1, dec!(400))]).unwrap_err();
        assert_eq!(err, DomainError::validation("Please select at least 1 Move Line."));
    }

    #[test]
    fn partial_reduction_lists_every_untouched_field() {
        let reduced = line(1, 1, dec!(400)).select().reduce(dec!(200), dec!(1), dec!(40));
        let err = plan_package_return(&[reduced]).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                "The following fields must also be reduced to maintain synchronization: Packaging Unit, Minimum Unit."
            )
        );

        let consistent = line(1, 1, dec!(400)).select().reduce(dec!(200), dec!(0.5), dec!(20));
        assert!(plan_package_return(&[consistent]).is_ok());
    }

    #[test]
    fn products_aggregate_and_pallets_count_returns() {
        let mut again = line(1, 2, dec!(300)).select();
        again.return_count = 2;
        let plan = plan_package_return(&[
            line(1, 1, dec!(400)).select(),
            line(2, 3, dec!(100)).select(),
            again,
            line(2, 4, dec!(50)),
        ])
        .unwrap();

        assert_eq!(plan.products.len(), 2);
        assert_eq!(plan.products[0].product_id, ProductId::from_u128(1));
        assert_eq!(plan.products[0].quantity, dec!(700));
        assert_eq!(plan.products[0].line_count, 2);
        assert_eq!(plan.products[0].demand_min, dec!(80));
        assert_eq!(plan.packages.len(), 3);
        assert_eq!(plan.packages[0].return_count, 1);
        assert_eq!(plan.packages[2].return_count, 3);
    }
}
