//! Quant lookup collaborator and the typed filter handed to it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainResult, LocationId, LotId, OwnerId, PackageId, ProductId};

use crate::location::LocationTree;
use crate::quant::Quant;
use crate::removal::RemovalStrategy;

/// Which locations a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationScope {
    Exact(LocationId),
    /// The location and everything below it.
    ChildOf(LocationId),
}

/// Lot condition of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotFilter {
    #[default]
    Any,
    /// Only quants without a lot.
    NoLot,
    /// The given lot, or quants without a lot.
    LotOrNone(LotId),
}

/// Exact-match condition on an optional reference (package, owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefFilter<T> {
    #[default]
    Any,
    /// Must equal the value, `None` meaning "must be unset".
    Is(Option<T>),
}

impl<T: PartialEq> RefFilter<T> {
    pub fn accepts(&self, value: Option<&T>) -> bool {
        match self {
            RefFilter::Any => true,
            RefFilter::Is(expected) => expected.as_ref() == value,
        }
    }
}

/// Typed quant filter. The engine builds it; the lookup interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantQuery {
    pub product_id: ProductId,
    pub location: LocationScope,
    #[serde(default)]
    pub lot: LotFilter,
    #[serde(default)]
    pub package: RefFilter<PackageId>,
    #[serde(default)]
    pub owner: RefFilter<OwnerId>,
}

impl QuantQuery {
    /// Exact location / lot / package / owner combination.
    pub fn strict(
        product_id: ProductId,
        location: LocationId,
        lot: Option<LotId>,
        package: Option<PackageId>,
        owner: Option<OwnerId>,
    ) -> Self {
        Self {
            product_id,
            location: LocationScope::Exact(location),
            lot: lot.map_or(LotFilter::NoLot, LotFilter::LotOrNone),
            package: RefFilter::Is(package),
            owner: RefFilter::Is(owner),
        }
    }

    /// Everything for the product at or below `location`.
    pub fn loose(product_id: ProductId, location: LocationId) -> Self {
        Self {
            product_id,
            location: LocationScope::ChildOf(location),
            lot: LotFilter::Any,
            package: RefFilter::Any,
            owner: RefFilter::Any,
        }
    }

    pub fn matches(&self, quant: &Quant, locations: &LocationTree) -> bool {
        if quant.product_id != self.product_id {
            return false;
        }
        let in_scope = match self.location {
            LocationScope::Exact(id) => quant.location_id == id,
            LocationScope::ChildOf(id) => {
                quant.location_id == id || locations.is_child_of(quant.location_id, id)
            }
        };
        if !in_scope {
            return false;
        }
        let lot_ok = match self.lot {
            LotFilter::Any => true,
            LotFilter::NoLot => quant.lot_id.is_none(),
            LotFilter::LotOrNone(lot) => quant.lot_id.is_none() || quant.lot_id == Some(lot),
        };
        lot_ok
            && self.package.accepts(quant.package_id.as_ref())
            && self.owner.accepts(quant.owner_id.as_ref())
    }
}

/// Quant lookup collaborator.
///
/// `order` is a hint; callers re-sort the result deterministically.
pub trait QuantLookup: Send + Sync {
    fn search(&self, query: &QuantQuery, order: RemovalStrategy) -> DomainResult<Vec<Quant>>;
}

impl<T> QuantLookup for &T
where
    T: QuantLookup + ?Sized,
{
    fn search(&self, query: &QuantQuery, order: RemovalStrategy) -> DomainResult<Vec<Quant>> {
        (**self).search(query, order)
    }
}

impl<T> QuantLookup for Arc<T>
where
    T: QuantLookup + ?Sized,
{
    fn search(&self, query: &QuantQuery, order: RemovalStrategy) -> DomainResult<Vec<Quant>> {
        (**self).search(query, order)
    }
}

/// Key of the pre-fetched quants cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantsCacheKey {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub lot_id: Option<LotId>,
    pub package_id: Option<PackageId>,
    pub owner_id: Option<OwnerId>,
}

impl QuantsCacheKey {
    pub fn of(quant: &Quant) -> Self {
        Self {
            product_id: quant.product_id,
            location_id: quant.location_id,
            lot_id: quant.lot_id,
            package_id: quant.package_id,
            owner_id: quant.owner_id,
        }
    }
}

/// Quants fetched once for a batch of reservations, bucketed by their exact
/// (product, location, lot, package, owner) combination.
#[derive(Debug, Clone, Default)]
pub struct QuantsCache {
    entries: HashMap<QuantsCacheKey, Vec<Quant>>,
}

impl QuantsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quants(quants: impl IntoIterator<Item = Quant>) -> Self {
        let mut cache = Self::new();
        for quant in quants {
            cache.insert(quant);
        }
        cache
    }

    pub fn insert(&mut self, quant: Quant) {
        self.entries
            .entry(QuantsCacheKey::of(&quant))
            .or_default()
            .push(quant);
    }

    /// Empty slice for unknown keys.
    pub fn get(&self, key: &QuantsCacheKey) -> &[Quant] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
