use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainError, DomainResult, Precision, ProductId, RoundingMethod};

use crate::uom::Uom;

/// How individual units of a product are identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tracking {
    #[default]
    None,
    /// Batches: many units share one lot.
    Lot,
    /// One unit per serial number.
    Serial,
}

/// Product-category policy for reservations made with a packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingReserveMethod {
    /// Reserve whatever is available.
    #[default]
    Partial,
    /// Only reserve whole packagings.
    Full,
}

/// Snapshot of the product fields the warehouse logic reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub display_name: String,
    /// Native (stock-keeping) unit.
    pub uom: Uom,
    #[serde(default)]
    pub tracking: Tracking,
    #[serde(default)]
    pub packaging_reserve_method: PackagingReserveMethod,
    /// Brand variant value, matched against client expiry rules.
    #[serde(default)]
    pub brand: Option<String>,
}

impl Product {
    pub fn new(id: ProductId, display_name: impl Into<String>, uom: Uom) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            uom,
            tracking: Tracking::None,
            packaging_reserve_method: PackagingReserveMethod::Partial,
            brand: None,
        }
    }

    pub fn with_tracking(mut self, tracking: Tracking) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn with_packaging_reserve_method(mut self, method: PackagingReserveMethod) -> Self {
        self.packaging_reserve_method = method;
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Rounding used for every quantity comparison on this product.
    pub fn precision(&self) -> Precision {
        self.uom.precision()
    }

    pub fn is_serial(&self) -> bool {
        self.tracking == Tracking::Serial
    }

    pub fn requires_full_packaging(&self) -> bool {
        self.packaging_reserve_method == PackagingReserveMethod::Full
    }
}

/// A packaging of a product (box of 12, pallet of 40, ...), in the product's unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packaging {
    pub name: String,
    pub qty: Decimal,
}

impl Packaging {
    pub fn new(name: impl Into<String>, qty: Decimal) -> Self {
        Self {
            name: name.into(),
            qty,
        }
    }

    /// Brings `product_qty` onto a whole number of packagings.
    ///
    /// Returns the input untouched when it already is a multiple (at the
    /// product precision) or when either side is zero.
    pub fn check_qty(&self, product_qty: Decimal, precision: Precision, method: RoundingMethod) -> Decimal {
        if product_qty.is_zero() || self.qty.is_zero() {
            return product_qty;
        }
        let packs = Precision::units().round_with(product_qty / self.qty, method);
        let rounded = packs * self.qty;
        if precision.equals(rounded, product_qty) {
            product_qty
        } else {
            rounded
        }
    }
}

/// Products by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Product>", into = "Vec<Product>")]
pub struct ProductCatalog {
    products: HashMap<ProductId, Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn get(&self, id: ProductId) -> DomainResult<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    /// Display name, falling back to the id for unknown products.
    pub fn display_name(&self, id: ProductId) -> String {
        self.products
            .get(&id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

impl From<Vec<Product>> for ProductCatalog {
    fn from(products: Vec<Product>) -> Self {
        let mut catalog = Self::new();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }
}

impl From<ProductCatalog> for Vec<Product> {
    fn from(catalog: ProductCatalog) -> Self {
        let mut products: Vec<Product> = catalog.products.into_values().collect();
        products.sort_by_key(|p| p.id);
        products
    }
}
