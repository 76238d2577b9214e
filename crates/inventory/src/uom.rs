//! Units of measure and quantity conversion.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainError, DomainResult, Precision, RoundingMethod, UomId};

/// A unit of measure.
///
/// `ratio` is the number of reference units of the category contained in one
/// of this unit (`Dozen` = 12 when `Units` is the reference). Storing the ratio
/// rather than its inverse keeps conversions between whole-number units exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uom {
    pub id: UomId,
    pub name: String,
    pub category: String,
    pub ratio: Decimal,
    pub rounding: Precision,
}

impl Uom {
    pub fn new(
        id: UomId,
        name: impl Into<String>,
        category: impl Into<String>,
        ratio: Decimal,
        rounding: Decimal,
    ) -> DomainResult<Self> {
        let name = name.into();
        if ratio <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "unit '{name}' must have a positive ratio"
            )));
        }
        Ok(Self {
            id,
            name,
            category: category.into(),
            ratio,
            rounding: Precision::from_rounding(rounding)?,
        })
    }

    /// Reference unit of a category (ratio 1).
    pub fn reference(
        id: UomId,
        name: impl Into<String>,
        category: impl Into<String>,
        rounding: Decimal,
    ) -> DomainResult<Self> {
        Self::new(id, name, category, Decimal::ONE, rounding)
    }

    pub fn precision(&self) -> Precision {
        self.rounding
    }

    /// Converts `qty` expressed in `self` into `to`, rounded on `to`'s grid.
    pub fn convert_to(&self, qty: Decimal, to: &Uom, method: RoundingMethod) -> DomainResult<Decimal> {
        if qty.is_zero() {
            return Ok(qty);
        }
        if self.id != to.id && self.category != to.category {
            return Err(DomainError::validation(format!(
                "cannot convert '{}' ({}) into '{}' ({}): units belong to different categories",
                self.name, self.category, to.name, to.category
            )));
        }
        let amount = if self.id == to.id {
            qty
        } else {
            qty * self.ratio / to.ratio
        };
        Ok(to.rounding.round_with(amount, method))
    }
}

/// Unit conversion collaborator.
pub trait UomConverter {
    fn convert(
        &self,
        qty: Decimal,
        from: UomId,
        to: UomId,
        method: RoundingMethod,
    ) -> DomainResult<Decimal>;
}

impl<T> UomConverter for &T
where
    T: UomConverter + ?Sized,
{
    fn convert(
        &self,
        qty: Decimal,
        from: UomId,
        to: UomId,
        method: RoundingMethod,
    ) -> DomainResult<Decimal> {
        (**self).convert(qty, from, to, method)
    }
}

/// Registry of known units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Uom>", into = "Vec<Uom>")]
pub struct UomCatalog {
    units: HashMap<UomId, Uom>,
}

impl UomCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uom: Uom) {
        self.units.insert(uom.id, uom);
    }

    pub fn with(mut self, uom: Uom) -> Self {
        self.insert(uom);
        self
    }

    pub fn get(&self, id: UomId) -> DomainResult<&Uom> {
        self.units
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("unit of measure {id}")))
    }
}

impl From<Vec<Uom>> for UomCatalog {
    fn from(units: Vec<Uom>) -> Self {
        units.into_iter().fold(Self::new(), Self::with)
    }
}

impl From<UomCatalog> for Vec<Uom> {
    fn from(catalog: UomCatalog) -> Self {
        let mut units: Vec<Uom> = catalog.units.into_values().collect();
        units.sort_by_key(|u| u.id);
        units
    }
}

impl UomConverter for UomCatalog {
    fn convert(
        &self,
        qty: Decimal,
        from: UomId,
        to: UomId,
        method: RoundingMethod,
    ) -> DomainResult<Decimal> {
        let from = self.get(from)?;
        let to = self.get(to)?;
        from.convert_to(qty, to, method)
    }
}
