use std::collections::HashMap;

use rust_decimal::Decimal;

use stockreloc_core::{DomainError, DomainResult, LotId, Precision, RoundingMethod};

use crate::lookup::{QuantLookup, QuantsCache};
use crate::product::{Product, Tracking};
use crate::quant::{Quant, QuantGroupKey};
use crate::removal::RemovalStrategyResolver;
use crate::uom::UomConverter;

use super::gather::sort_for_removal;
use super::{Allocation, ReservationDemand, ReservationEngine};

impl<L, S, U> ReservationEngine<L, S, U>
where
    L: QuantLookup,
    S: RemovalStrategyResolver,
    U: UomConverter,
{
    /// Splits a signed demand across the gathered quants.
    ///
    /// Positive demand is clamped to what is available and never fails for
    /// lack of stock; callers compare the allocated total with what they asked
    /// for. Negative demand releases existing reservations and fails when it
    /// exceeds them.
    pub fn reserve(
        &self,
        demand: &ReservationDemand,
        cache: Option<&QuantsCache>,
    ) -> DomainResult<Vec<Allocation>> {
        let product = &demand.product;
        let precision = product.precision();
        let request = demand.gather_request();
        let strategy = self.strategies.resolve(product, demand.location);

        let candidates = self.gather_candidates(&request, strategy, cache)?;
        let mut ordered = candidates.clone();
        sort_for_removal(&mut ordered, strategy, request.container);

        let mut available = available_quantity(&candidates, product, demand.lot, demand.strict, precision);
        if let Some(packaging) = &demand.packaging {
            if product.requires_full_packaging() {
                available = packaging.check_qty(available, precision, RoundingMethod::Down);
            }
        }

        let mut quantity = demand.quantity;
        if quantity > available {
            quantity = available;
        }

        if let Some(uom) = demand.uom {
            if uom != product.uom.id && !demand.strict {
                let in_caller_unit = self.uoms.convert(quantity, product.uom.id, uom, RoundingMethod::Down)?;
                quantity = self
                    .uoms
                    .convert(in_caller_unit, uom, product.uom.id, RoundingMethod::HalfUp)?;
            }
        }

        if product.tracking == Tracking::Serial && !precision.is_whole(quantity) {
            quantity = Decimal::ZERO;
        }

        tracing::debug!(
            product = %product.id,
            location = %demand.location,
            strategy = %strategy,
            requested = %demand.quantity,
            available = %available,
            reservable = %quantity,
            candidates = candidates.len(),
            "reserve"
        );

        if precision.is_positive(quantity) {
            Ok(take(&ordered, quantity, precision))
        } else if precision.is_negative(quantity) {
            let reserved: Decimal = candidates.iter().map(|q| q.reserved_quantity).sum();
            if precision.compare(quantity.abs(), reserved).is_gt() {
                tracing::warn!(
                    product = %product.id,
                    requested = %quantity,
                    reserved = %reserved,
                    "release exceeds reserved quantity"
                );
                return Err(DomainError::validation(format!(
                    "It is not possible to unreserve more products of {} than you have in stock.",
                    product.display_name
                )));
            }
            Ok(give_back(&candidates, quantity, precision))
        } else {
            Ok(Vec::new())
        }
    }
}

/// Positive side: walks `ordered`, repaying each group's negative slack
/// before crediting the quant's headroom.
fn take(ordered: &[Quant], quantity: Decimal, precision: Precision) -> Vec<Allocation> {
    let mut slack: HashMap<QuantGroupKey, Decimal> = HashMap::new();
    for quant in ordered {
        let free = quant.available_quantity();
        if precision.is_negative(free) {
            *slack.entry(quant.group_key()).or_default() += free;
        }
    }

    let mut remaining = quantity;
    let mut remaining_available: Decimal = ordered
        .iter()
        .filter(|q| precision.is_positive(q.quantity))
        .map(|q| q.quantity)
        .sum::<Decimal>()
        - ordered.iter().map(|q| q.reserved_quantity).sum::<Decimal>();

    let mut allocations = Vec::new();
    for quant in ordered {
        let mut headroom = quant.available_quantity();
        if !precision.is_positive(headroom) {
            continue;
        }
        if let Some(deficit) = slack.get_mut(&quant.group_key()) {
            if !deficit.is_zero() {
                let repaid = deficit.abs().min(headroom);
                *deficit += repaid;
                headroom -= repaid;
            }
        }
        if !precision.is_positive(headroom) {
            continue;
        }

        let amount = headroom.min(remaining);
        allocations.push(Allocation {
            quant: quant.clone(),
            quantity: amount,
        });
        remaining -= amount;
        remaining_available -= amount;
        if precision.is_zero(remaining) {
            break;
        }
    }

    tracing::debug!(
        allocations = allocations.len(),
        unfilled = %remaining,
        remaining_available = %remaining_available,
        "reservation split"
    );
    allocations
}

/// Negative side: gives back existing reservations in lookup order.
fn give_back(candidates: &[Quant], quantity: Decimal, precision: Precision) -> Vec<Allocation> {
    let mut remaining = quantity.abs();
    let mut allocations = Vec::new();
    for quant in candidates {
        if precision.is_zero(remaining) {
            break;
        }
        let amount = quant.reserved_quantity.min(remaining);
        if !precision.is_positive(amount) {
            continue;
        }
        allocations.push(Allocation {
            quant: quant.clone(),
            quantity: -amount,
        });
        remaining -= amount;
    }
    allocations
}

/// Quantity that can still be reserved across `quants`.
///
/// Untracked products net all on-hand against all reservations, floored at
/// zero. Tracked products net per lot and only count lots with stock left, so
/// an oversold lot does not eat into another lot's availability. With `strict`
/// and a requested lot, quants without a lot are ignored.
pub fn available_quantity(
    quants: &[Quant],
    product: &Product,
    lot: Option<LotId>,
    strict: bool,
    precision: Precision,
) -> Decimal {
    if product.tracking == Tracking::None {
        let available: Decimal = quants.iter().map(Quant::available_quantity).sum();
        return available.max(Decimal::ZERO);
    }

    let mut per_lot: Vec<(Option<LotId>, Decimal)> = Vec::new();
    for quant in quants {
        if quant.lot_id.is_none() && strict && lot.is_some() {
            continue;
        }
        match per_lot.iter_mut().find(|(l, _)| *l == quant.lot_id) {
            Some((_, total)) => *total += quant.available_quantity(),
            None => per_lot.push((quant.lot_id, quant.available_quantity())),
        }
    }
    per_lot
        .into_iter()
        .map(|(_, total)| total)
        .filter(|total| precision.is_positive(*total))
        .sum()
}
