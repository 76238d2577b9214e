//! Client expiry thresholds.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use stockreloc_core::OwnerId;

use crate::product::Product;

pub const EXPIRY_WARNING_TITLE: &str = "Expiration Threshold Warning!";

/// A client's minimum remaining shelf life for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientExpiryRule {
    pub client: OwnerId,
    #[serde(default)]
    pub brand: Option<String>,
    /// Days of shelf life the client requires from today.
    pub min_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryWarning {
    pub title: String,
    pub message: String,
    /// Earliest expiration the client accepts.
    pub acceptable_from: NaiveDate,
}

/// Checks an entered expiration date against the product's client rules.
///
/// Only rules for `owner` apply and the first one that is breached wins. A
/// rule is breached when the date falls before today plus its minimum days and
/// the product's brand is one of the brands named across the product's rules.
pub fn check_expiration(
    product: &Product,
    rules: &[ClientExpiryRule],
    owner: Option<OwnerId>,
    expiration: NaiveDate,
    today: NaiveDate,
) -> Option<ExpiryWarning> {
    let owner = owner?;
    let brands: Vec<&str> = rules.iter().filter_map(|r| r.brand.as_deref()).collect();
    let branded = product
        .brand
        .as_deref()
        .is_some_and(|brand| brands.contains(&brand));

    for rule in rules.iter().filter(|r| r.client == owner) {
        let acceptable_from = today.checked_add_days(Days::new(u64::from(rule.min_days)))?;
        if expiration < acceptable_from && branded {
            tracing::debug!(
                product = %product.id,
                owner = %owner,
                %expiration,
                %acceptable_from,
                "expiration below client threshold"
            );
            return Some(ExpiryWarning {
                title: EXPIRY_WARNING_TITLE.to_string(),
                message: format!(
                    "Expiration date is outside the acceptable expiration date range. Please review the Product.\n\n\
                     Entered Expiration Date: {}\n\
                     Acceptable Expiration Date Range: {}",
                    expiration.format("%B %d, %Y"),
                    acceptable_from.format("%B %d, %Y")
                ),
                acceptable_from,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uom::Uom;
    use rust_decimal_macros::dec;
    use stockreloc_core::{ProductId, UomId};

    fn product(brand: &str) -> Product {
        let uom = Uom::reference(UomId::from_u128(1), "kg", "Weight", dec!(0.01)).unwrap();
        Product::new(ProductId::from_u128(1), "Chicken Wings", uom).with_brand(brand)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rules() -> Vec<ClientExpiryRule> {
        vec![
            ClientExpiryRule {
                client: OwnerId::from_u128(1),
                brand: Some("Magnolia".to_string()),
                min_days: 90,
            },
            ClientExpiryRule {
                client: OwnerId::from_u128(2),
                brand: Some("Bounty".to_string()),
                min_days: 30,
            },
        ]
    }

    #[test]
    fn short_dated_stock_is_flagged_with_readable_dates() {
        let warning = check_expiration(
            &product("Magnolia"),
            &rules(),
            Some(OwnerId::from_u128(1)),
            date(2024, 3, 1),
            date(2024, 1, 15),
        )
        .unwrap();
        assert_eq!(warning.title, EXPIRY_WARNING_TITLE);
        assert_eq!(warning.acceptable_from, date(2024, 4, 14));
        assert!(warning.message.contains("Entered Expiration Date: March 01, 2024"));
        assert!(warning.message.contains("Acceptable Expiration Date Range: April 14, 2024"));
    }

    #[test]
    fn brand_list_spans_every_rule() {
        // Owner 1's rule names Magnolia, but Bounty is listed by another rule.
        let warning = check_expiration(
            &product("Bounty"),
            &rules(),
            Some(OwnerId::from_u128(1)),
            date(2024, 2, 1),
            date(2024, 1, 15),
        );
        assert!(warning.is_some());
    }

    #[test]
    fn other_owners_and_unknown_brands_pass() {
        let p = product("Magnolia");
        assert!(check_expiration(&p, &rules(), Some(OwnerId::from_u128(3)), date(2024, 1, 20), date(2024, 1, 15)).is_none());
        assert!(check_expiration(&p, &rules(), None, date(2024, 1, 20), date(2024, 1, 15)).is_none());
        let unbranded = product("Generic");
        assert!(
            check_expiration(&unbranded, &rules(), Some(OwnerId::from_u128(1)), date(2024, 1, 20), date(2024, 1, 15))
                .is_none()
        );
    }

    #[test]
    fn dates_on_the_threshold_are_accepted() {
        let warning = check_expiration(
            &product("Bounty"),
            &rules(),
            Some(OwnerId::from_u128(2)),
            date(2024, 2, 14),
            date(2024, 1, 15),
        );
        assert!(warning.is_none());
    }
}
