//! Removal strategies: which stock leaves first.

use core::str::FromStr;
use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainError, LocationId, PackageId, Precision, ProductId};

use crate::location::LocationTree;
use crate::product::Product;
use crate::quant::Quant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStrategy {
    /// First in, first out.
    #[default]
    Fifo,
    /// Last in, first out.
    Lifo,
    /// First expired, first out.
    Fefo,
    /// Nearest location name first.
    Closest,
    /// Touch as few packages as possible.
    LeastPackages,
}

impl RemovalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalStrategy::Fifo => "fifo",
            RemovalStrategy::Lifo => "lifo",
            RemovalStrategy::Fefo => "fefo",
            RemovalStrategy::Closest => "closest",
            RemovalStrategy::LeastPackages => "least_packages",
        }
    }
}

impl core::fmt::Display for RemovalStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemovalStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(RemovalStrategy::Fifo),
            "lifo" => Ok(RemovalStrategy::Lifo),
            "fefo" => Ok(RemovalStrategy::Fefo),
            "closest" => Ok(RemovalStrategy::Closest),
            "least_packages" | "least-packages" => Ok(RemovalStrategy::LeastPackages),
            other => Err(DomainError::validation(format!(
                "unknown removal strategy '{other}'"
            ))),
        }
    }
}

/// Resolves the removal strategy for a product at a location.
pub trait RemovalStrategyResolver {
    fn resolve(&self, product: &Product, location: LocationId) -> RemovalStrategy;
}

impl<T> RemovalStrategyResolver for &T
where
    T: RemovalStrategyResolver + ?Sized,
{
    fn resolve(&self, product: &Product, location: LocationId) -> RemovalStrategy {
        (**self).resolve(product, location)
    }
}

/// Same strategy everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedRemovalStrategy(pub RemovalStrategy);

impl RemovalStrategyResolver for FixedRemovalStrategy {
    fn resolve(&self, _product: &Product, _location: LocationId) -> RemovalStrategy {
        self.0
    }
}

/// Product override first, then the nearest location (walking up the tree)
/// that sets a strategy, then the default.
#[derive(Debug, Clone, Default)]
pub struct RemovalStrategyTable {
    default: RemovalStrategy,
    products: HashMap<ProductId, RemovalStrategy>,
    locations: HashMap<LocationId, RemovalStrategy>,
    parents: HashMap<LocationId, LocationId>,
}

impl RemovalStrategyTable {
    pub fn new(default: RemovalStrategy) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    /// Picks up every location-level strategy and the parent links of `tree`.
    pub fn from_tree(tree: &LocationTree, default: RemovalStrategy) -> Self {
        let mut table = Self::new(default);
        for node in tree.iter() {
            if let Some(strategy) = node.removal_strategy {
                table.locations.insert(node.id, strategy);
            }
            if let Some(parent) = node.parent {
                table.parents.insert(node.id, parent);
            }
        }
        table
    }

    pub fn set_product(&mut self, product: ProductId, strategy: RemovalStrategy) {
        self.products.insert(product, strategy);
    }

    pub fn set_location(&mut self, location: LocationId, strategy: RemovalStrategy) {
        self.locations.insert(location, strategy);
    }
}

impl RemovalStrategyResolver for RemovalStrategyTable {
    fn resolve(&self, product: &Product, location: LocationId) -> RemovalStrategy {
        if let Some(strategy) = self.products.get(&product.id) {
            return *strategy;
        }
        let mut current = Some(location);
        let mut hops = 0;
        while let Some(loc) = current {
            if let Some(strategy) = self.locations.get(&loc) {
                return *strategy;
            }
            hops += 1;
            if hops > self.parents.len() {
                break;
            }
            current = self.parents.get(&loc).copied();
        }
        self.default
    }
}

/// Smallest set of packages whose free stock covers `demand`.
///
/// The largest packages fill all slots but the last; the last slot takes the
/// smallest remaining package that still covers what is left, so the set
/// leaves as little broken stock behind as possible. `None` when no set of
/// packages can cover the demand.
pub fn least_packages(quants: &[Quant], demand: Decimal, precision: Precision) -> Option<Vec<PackageId>> {
    if !precision.is_positive(demand) {
        return None;
    }

    let mut packages: Vec<(PackageId, Decimal)> = Vec::new();
    for quant in quants {
        let Some(package) = quant.package_id else {
            continue;
        };
        let free = quant.available_quantity().max(Decimal::ZERO);
        match packages.iter_mut().find(|(id, _)| *id == package) {
            Some((_, total)) => *total += free,
            None => packages.push((package, free)),
        }
    }
    packages.retain(|(_, free)| precision.is_positive(*free));
    packages.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut covered = Decimal::ZERO;
    let mut needed = None;
    for (idx, (_, free)) in packages.iter().enumerate() {
        covered += *free;
        if precision.compare(covered, demand).is_ge() {
            needed = Some(idx + 1);
            break;
        }
    }
    let count = needed?;

    let mut chosen: Vec<PackageId> = packages[..count - 1].iter().map(|(id, _)| *id).collect();
    let filled: Decimal = packages[..count - 1].iter().map(|(_, free)| *free).sum();
    let remainder = demand - filled;
    let last = packages[count - 1..]
        .iter()
        .filter(|(_, free)| precision.compare(*free, remainder).is_ge())
        .min_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))?;
    chosen.push(last.0);
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationNode;
    use crate::uom::Uom;
    use rust_decimal_macros::dec;
    use stockreloc_core::{QuantId, UomId};

    fn product() -> Product {
        let uom = Uom::reference(UomId::from_u128(1), "Units", "Unit", dec!(1)).unwrap();
        Product::new(ProductId::from_u128(1), "Peas", uom)
    }

    fn pallet(n: u128, qty: Decimal) -> Quant {
        Quant::new(
            QuantId::from_u128(n),
            ProductId::from_u128(1),
            LocationId::from_u128(1),
            "WH/Stock",
            qty,
        )
        .with_package(PackageId::from_u128(n), format!("P{n}"))
    }

    #[test]
    fn parses_config_spellings() {
        assert_eq!("FEFO".parse::<RemovalStrategy>().unwrap(), RemovalStrategy::Fefo);
        assert_eq!(
            "least-packages".parse::<RemovalStrategy>().unwrap(),
            RemovalStrategy::LeastPackages
        );
        assert!("nearest".parse::<RemovalStrategy>().is_err());
    }

    #[test]
    fn table_prefers_product_then_nearest_location() {
        let wh = LocationId::from_u128(1);
        let bin = LocationId::from_u128(2);
        let tree = LocationTree::new()
            .with(LocationNode::new(wh, "WH").with_removal_strategy(RemovalStrategy::Closest))
            .with(LocationNode::new(bin, "Bin").with_parent(wh));
        let mut table = RemovalStrategyTable::from_tree(&tree, RemovalStrategy::Fifo);

        assert_eq!(table.resolve(&product(), bin), RemovalStrategy::Closest);
        assert_eq!(
            table.resolve(&product(), LocationId::from_u128(9)),
            RemovalStrategy::Fifo
        );

        table.set_product(product().id, RemovalStrategy::Fefo);
        assert_eq!(table.resolve(&product(), bin), RemovalStrategy::Fefo);
    }

    #[test]
    fn least_packages_uses_fewest_pallets_with_tightest_last_pick() {
        let quants = vec![
            pallet(1, dec!(40)),
            pallet(2, dec!(30)),
            pallet(3, dec!(12)),
            pallet(4, dec!(5)),
        ];
        let chosen = least_packages(&quants, dec!(50), Precision::units()).unwrap();
        // 40 + one more; 12 is the smallest pallet covering the remaining 10.
        assert_eq!(chosen, vec![PackageId::from_u128(1), PackageId::from_u128(3)]);
    }

    #[test]
    fn least_packages_single_pallet_when_one_suffices() {
        let quants = vec![pallet(1, dec!(40)), pallet(2, dec!(30)), pallet(3, dec!(12))];
        let chosen = least_packages(&quants, dec!(25), Precision::units()).unwrap();
        assert_eq!(chosen, vec![PackageId::from_u128(2)]);
    }

    #[test]
    fn least_packages_gives_up_when_stock_is_short() {
        let quants = vec![pallet(1, dec!(4)), pallet(2, dec!(3))];
        assert!(least_packages(&quants, dec!(10), Precision::units()).is_none());
        assert!(least_packages(&quants, dec!(0), Precision::units()).is_none());
    }
}
