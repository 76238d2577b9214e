use core::cmp::Ordering;

use stockreloc_core::DomainResult;

use crate::lookup::{QuantLookup, QuantQuery, QuantsCache, QuantsCacheKey};
use crate::quant::Quant;
use crate::removal::{RemovalStrategy, RemovalStrategyResolver, least_packages};

use super::{GatherRequest, ReservationEngine};

impl<L, S, U> ReservationEngine<L, S, U>
where
    L: QuantLookup,
    S: RemovalStrategyResolver,
{
    /// Candidate quants for `request`, in consumption order.
    ///
    /// With a `cache`, strict gathers read the cached buckets instead of
    /// searching, except under the least-packages strategy which needs the
    /// full set to size its package selection.
    pub fn gather(
        &self,
        request: &GatherRequest<'_>,
        cache: Option<&QuantsCache>,
    ) -> DomainResult<Vec<Quant>> {
        let strategy = self.strategies.resolve(request.product, request.location);
        let mut quants = self.gather_candidates(request, strategy, cache)?;
        sort_for_removal(&mut quants, strategy, request.container);
        Ok(quants)
    }

    /// Candidates in lookup (or cache) order, before removal sorting.
    pub(super) fn gather_candidates(
        &self,
        request: &GatherRequest<'_>,
        strategy: RemovalStrategy,
        cache: Option<&QuantsCache>,
    ) -> DomainResult<Vec<Quant>> {
        if let Some(cache) = cache.filter(|_| request.strict && strategy != RemovalStrategy::LeastPackages) {
            let key = QuantsCacheKey {
                product_id: request.product.id,
                location_id: request.location,
                lot_id: None,
                package_id: request.package,
                owner_id: request.owner,
            };
            let mut quants: Vec<Quant> = Vec::new();
            if let Some(lot) = request.lot {
                quants.extend_from_slice(cache.get(&QuantsCacheKey {
                    lot_id: Some(lot),
                    ..key
                }));
            }
            for quant in cache.get(&key) {
                if !quants.iter().any(|q| q.id == quant.id) {
                    quants.push(quant.clone());
                }
            }
            tracing::debug!(
                product = %request.product.id,
                location = %request.location,
                candidates = quants.len(),
                "gathered quants from cache"
            );
            return Ok(quants);
        }

        let query = if request.strict {
            QuantQuery::strict(
                request.product.id,
                request.location,
                request.lot,
                request.package,
                request.owner,
            )
        } else {
            QuantQuery::loose(request.product.id, request.location)
        };
        let mut quants = self.lookup.search(&query, strategy)?;
        if !request.strict {
            quants.retain(|q| request.is_compatible(q));
        }
        if strategy == RemovalStrategy::LeastPackages {
            if let Some(packages) = least_packages(&quants, request.quantity, request.product.precision()) {
                quants.retain(|q| q.package_id.is_some_and(|p| packages.contains(&p)));
            }
        }

        tracing::debug!(
            product = %request.product.id,
            location = %request.location,
            strategy = %strategy,
            strict = request.strict,
            candidates = quants.len(),
            "gathered quants"
        );
        Ok(quants)
    }
}

/// Orders quants for consumption.
///
/// `Closest` sorts by location name (newest quant first on ties). Otherwise a
/// given container is drained first, then earliest expiration (undated stock
/// last), then identity. A final stable pass pushes special-holding stock to
/// the back and puts lot-tracked stock ahead of untracked stock.
pub fn sort_for_removal(quants: &mut [Quant], strategy: RemovalStrategy, container: Option<&str>) {
    match (strategy, container) {
        (RemovalStrategy::Closest, _) => quants.sort_by(|a, b| {
            a.location_name
                .cmp(&b.location_name)
                .then_with(|| b.id.cmp(&a.id))
        }),
        (_, Some(container)) => quants.sort_by(|a, b| {
            let a_other = a.container.as_deref() != Some(container);
            let b_other = b.container.as_deref() != Some(container);
            a_other
                .cmp(&b_other)
                .then_with(|| by_expiration(a, b))
                .then_with(|| a.id.cmp(&b.id))
        }),
        (_, None) => quants.sort_by(|a, b| by_expiration(a, b).then_with(|| a.id.cmp(&b.id))),
    }
    quants.sort_by_key(|q| (q.special_holding, q.lot_id.is_none()));
}

fn by_expiration(a: &Quant, b: &Quant) -> Ordering {
    match (a.expiration_date, b.expiration_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use stockreloc_core::{LocationId, LotId, ProductId, QuantId};

    fn quant(n: u128) -> Quant {
        Quant::new(
            QuantId::from_u128(n),
            ProductId::from_u128(1),
            LocationId::from_u128(1),
            "WH/Stock",
            dec!(10),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(quants: &[Quant]) -> Vec<u128> {
        quants.iter().map(|q| q.id.as_uuid().as_u128()).collect()
    }

    #[test]
    fn earliest_expiration_first_then_identity() {
        let mut quants = vec![
            quant(3).expiring(date(2024, 2, 1)),
            quant(2),
            quant(1).expiring(date(2024, 2, 1)),
            quant(4).expiring(date(2024, 1, 1)),
        ];
        sort_for_removal(&mut quants, RemovalStrategy::Fefo, None);
        assert_eq!(ids(&quants), vec![4, 1, 3, 2]);
    }

    #[test]
    fn container_match_beats_expiration() {
        let mut quants = vec![
            quant(1).expiring(date(2024, 1, 1)).in_container("MSCU1"),
            quant(2).expiring(date(2024, 3, 1)).in_container("TGHU9"),
            quant(3).expiring(date(2024, 2, 1)).in_container("TGHU9"),
        ];
        sort_for_removal(&mut quants, RemovalStrategy::Fifo, Some("TGHU9"));
        assert_eq!(ids(&quants), vec![3, 2, 1]);
    }

    #[test]
    fn closest_sorts_by_location_name_newest_first() {
        let mut a = quant(1);
        a.location_name = "WH/Stock/B-01".to_string();
        let mut b = quant(2);
        b.location_name = "WH/Stock/A-01".to_string();
        let mut c = quant(3);
        c.location_name = "WH/Stock/A-01".to_string();
        let mut quants = vec![a, b, c];
        sort_for_removal(&mut quants, RemovalStrategy::Closest, Some("ignored"));
        assert_eq!(ids(&quants), vec![3, 2, 1]);
    }

    #[test]
    fn special_holding_last_and_lots_first() {
        let mut quants = vec![
            quant(1).expiring(date(2024, 1, 1)).on_special_holding(),
            quant(2).expiring(date(2024, 2, 1)),
            quant(3).expiring(date(2024, 3, 1)).with_lot(LotId::from_u128(1)),
            quant(4)
                .expiring(date(2023, 1, 1))
                .with_lot(LotId::from_u128(2))
                .on_special_holding(),
        ];
        sort_for_removal(&mut quants, RemovalStrategy::Fefo, None);
        assert_eq!(ids(&quants), vec![3, 2, 4, 1]);
    }
}
