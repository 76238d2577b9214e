use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{
    DomainError, DomainResult, LocationId, LotId, OwnerId, PackageId, ProductId, QuantId,
    RoundingMethod, UomId,
};

use crate::lookup::{QuantLookup, QuantsCache};
use crate::product::{Packaging, Product};
use crate::quant::Quant;
use crate::removal::RemovalStrategyResolver;
use crate::uom::UomConverter;

use super::{Allocation, ReservationDemand, ReservationEngine};

/// Caller-supplied payload copied onto every new reservation line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMetadata {
    #[serde(default)]
    pub batch_tag: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub client_reference: Option<String>,
}

/// A reservation line of a consumer (a move line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub quant_id: Option<QuantId>,
    pub product_id: ProductId,
    pub location_id: LocationId,
    #[serde(default)]
    pub lot_id: Option<LotId>,
    #[serde(default)]
    pub package_id: Option<PackageId>,
    /// Package the stock is put into at the destination.
    #[serde(default)]
    pub result_package_id: Option<PackageId>,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    pub uom: UomId,
    /// Reserved quantity, in `uom`.
    pub quantity: Decimal,
    #[serde(default)]
    pub metadata: LineMetadata,
}

/// Something that holds reservation lines and can absorb allocations.
pub trait ReservationConsumer {
    fn product(&self) -> &Product;

    fn lines(&self) -> &[ReservationLine];

    /// Whether `line` may absorb `quantity` taken from `quant` in place.
    fn is_line_updatable(&self, line: &ReservationLine, quantity: Decimal, quant: &Quant) -> bool;

    /// Unit new lines are expressed in when the quantity survives the round trip.
    fn line_uom(&self) -> UomId;

    /// Adds `quantity` (in the line's unit) to the line at `index`.
    fn increase_line(&mut self, index: usize, quantity: Decimal, quant: &Quant) -> DomainResult<()>;

    /// Builds a new line for `quantity` (in `uom`) taken from `quant`.
    fn prepare_line(&self, quantity: Decimal, uom: UomId, quant: &Quant) -> ReservationLine;

    fn add_lines(&mut self, lines: Vec<ReservationLine>);
}

impl<L, S, U> ReservationEngine<L, S, U>
where
    U: UomConverter,
{
    /// Folds allocations into the consumer's lines and returns the total taken.
    ///
    /// An allocation grows an updatable line when its quantity survives the
    /// conversion into the line's unit and back; otherwise a new line is made.
    /// Serial products get one line per unit. Edits are staged and reach the
    /// consumer only once every allocation has been placed, so a failure
    /// leaves its lines untouched.
    pub fn apply_reservation<C>(&self, consumer: &mut C, allocations: &[Allocation]) -> DomainResult<Decimal>
    where
        C: ReservationConsumer + ?Sized,
    {
        let precision = self.settings.precision();
        let product_uom = consumer.product().uom.id;
        let serial = consumer.product().is_serial();

        let existing = consumer.lines().len();
        let mut staged: Vec<ReservationLine> = consumer.lines().to_vec();
        let mut increases: Vec<(usize, Decimal, &Quant)> = Vec::new();
        let mut taken = Decimal::ZERO;

        for Allocation { quant, quantity } in allocations {
            let quantity = *quantity;
            taken += quantity;

            let target = staged
                .iter()
                .position(|line| consumer.is_line_updatable(line, quantity, quant));
            if let Some(index) = target {
                let line_uom = staged[index].uom;
                let converted = precision.round(self.uoms.convert(
                    quantity,
                    product_uom,
                    line_uom,
                    RoundingMethod::HalfUp,
                )?);
                let back = self
                    .uoms
                    .convert(converted, line_uom, product_uom, RoundingMethod::HalfUp)?;
                if precision.equals(quantity, back) {
                    staged[index].quantity += converted;
                    if index < existing {
                        increases.push((index, converted, quant));
                    }
                    continue;
                }
            }

            if !precision.is_positive(quantity) {
                return Err(DomainError::validation(format!(
                    "no reservation line of {} can release {} from quant {}",
                    consumer.product().display_name,
                    quantity.abs(),
                    quant.id
                )));
            }

            if serial {
                let mut units = quantity.trunc();
                while units >= Decimal::ONE {
                    staged.push(self.new_line(&*consumer, Decimal::ONE, quant)?);
                    units -= Decimal::ONE;
                }
            } else {
                staged.push(self.new_line(&*consumer, quantity, quant)?);
            }
        }

        for (index, quantity, quant) in increases {
            consumer.increase_line(index, quantity, quant)?;
        }
        let created = staged.split_off(existing);
        if !created.is_empty() {
            consumer.add_lines(created);
        }

        tracing::debug!(
            product = %consumer.product().id,
            allocations = allocations.len(),
            taken = %taken,
            "reservation applied"
        );
        Ok(taken)
    }

    fn new_line<C>(&self, consumer: &C, quantity: Decimal, quant: &Quant) -> DomainResult<ReservationLine>
    where
        C: ReservationConsumer + ?Sized,
    {
        let precision = self.settings.precision();
        let product_uom = consumer.product().uom.id;
        let line_uom = consumer.line_uom();
        let converted = precision.round(self.uoms.convert(
            quantity,
            product_uom,
            line_uom,
            RoundingMethod::HalfUp,
        )?);
        let back = self
            .uoms
            .convert(converted, line_uom, product_uom, RoundingMethod::HalfUp)?;
        Ok(if precision.equals(quantity, back) {
            consumer.prepare_line(converted, line_uom, quant)
        } else {
            consumer.prepare_line(quantity, product_uom, quant)
        })
    }
}

/// A stock move: the usual reservation consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMove {
    pub product: Product,
    /// Unit the move's demand is expressed in.
    pub uom: UomId,
    /// Delivery partner; reservations only take stock this partner owns.
    #[serde(default)]
    pub partner: Option<OwnerId>,
    pub location_id: LocationId,
    pub location_dest_id: LocationId,
    #[serde(default)]
    pub packaging: Option<Packaging>,
    #[serde(default)]
    pub lines: Vec<ReservationLine>,
    /// Payload stamped on lines created by this move.
    #[serde(default)]
    pub line_template: LineMetadata,
}

impl StockMove {
    pub fn new(product: Product, location_id: LocationId, location_dest_id: LocationId) -> Self {
        Self {
            uom: product.uom.id,
            product,
            partner: None,
            location_id,
            location_dest_id,
            packaging: None,
            lines: Vec::new(),
            line_template: LineMetadata::default(),
        }
    }

    pub fn with_partner(mut self, partner: OwnerId) -> Self {
        self.partner = Some(partner);
        self
    }

    pub fn with_uom(mut self, uom: UomId) -> Self {
        self.uom = uom;
        self
    }

    pub fn with_line_template(mut self, metadata: LineMetadata) -> Self {
        self.line_template = metadata;
        self
    }

    /// Reserves (or releases) `need` from `location` and records it as lines.
    ///
    /// Stock is always taken from the partner's own quants. Returns the
    /// quantity actually taken, in the product unit.
    #[allow(clippy::too_many_arguments)]
    pub fn update_reserved_quantity<L, S, U>(
        &mut self,
        engine: &ReservationEngine<L, S, U>,
        need: Decimal,
        location: LocationId,
        lot: Option<LotId>,
        package: Option<PackageId>,
        strict: bool,
        cache: Option<&QuantsCache>,
    ) -> DomainResult<Decimal>
    where
        L: QuantLookup,
        S: RemovalStrategyResolver,
        U: UomConverter,
    {
        let demand = ReservationDemand::new(self.product.clone(), location, need)
            .with_packaging(self.packaging.clone())
            .with_uom(self.uom)
            .with_lot(lot)
            .with_package(package)
            .with_owner(self.partner)
            .strict(strict);
        let allocations = engine.reserve(&demand, cache)?;
        engine.apply_reservation(self, &allocations)
    }

    /// Total reserved across lines, in each line's own unit.
    pub fn reserved_lines_total(&self) -> Decimal {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

impl ReservationConsumer for StockMove {
    fn product(&self) -> &Product {
        &self.product
    }

    fn lines(&self) -> &[ReservationLine] {
        &self.lines
    }

    /// Serial lines hold at most one unit, so they only absorb a change that
    /// keeps them between zero and one.
    fn is_line_updatable(&self, line: &ReservationLine, quantity: Decimal, quant: &Quant) -> bool {
        let fits = !self.product.is_serial() || {
            let after = line.quantity + quantity;
            after >= Decimal::ZERO && after <= Decimal::ONE
        };
        fits && line.location_id == quant.location_id
            && line.lot_id == quant.lot_id
            && line.package_id == quant.package_id
            && line.owner_id == quant.owner_id
            && line.result_package_id.is_none()
    }

    fn line_uom(&self) -> UomId {
        self.uom
    }

    fn increase_line(&mut self, index: usize, quantity: Decimal, _quant: &Quant) -> DomainResult<()> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or_else(|| DomainError::not_found(format!("reservation line {index}")))?;
        line.quantity += quantity;
        Ok(())
    }

    fn prepare_line(&self, quantity: Decimal, uom: UomId, quant: &Quant) -> ReservationLine {
        ReservationLine {
            quant_id: Some(quant.id),
            product_id: self.product.id,
            location_id: quant.location_id,
            lot_id: quant.lot_id,
            package_id: quant.package_id,
            result_package_id: None,
            owner_id: quant.owner_id,
            uom,
            quantity,
            metadata: self.line_template.clone(),
        }
    }

    fn add_lines(&mut self, lines: Vec<ReservationLine>) {
        self.lines.extend(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{LocationNode, LocationTree};
    use crate::product::Tracking;
    use crate::removal::{FixedRemovalStrategy, RemovalStrategy};
    use crate::store::InMemoryQuantStore;
    use crate::uom::{Uom, UomCatalog};
    use rust_decimal_macros::dec;

    const STOCK: LocationId = LocationId::from_u128(10);
    const OUT: LocationId = LocationId::from_u128(11);

    fn units() -> Uom {
        Uom::reference(UomId::from_u128(1), "Units", "Unit", dec!(0.01)).unwrap()
    }

    fn dozens() -> Uom {
        Uom::new(UomId::from_u128(2), "Dozens", "Unit", dec!(12), dec!(0.01)).unwrap()
    }

    fn peas() -> Product {
        Product::new(ProductId::from_u128(1), "Frozen Peas", units())
    }

    fn quant(n: u128, qty: Decimal) -> Quant {
        Quant::new(QuantId::from_u128(n), ProductId::from_u128(1), STOCK, "WH/Stock", qty)
    }

    fn engine(quants: Vec<Quant>) -> ReservationEngine<InMemoryQuantStore, FixedRemovalStrategy, UomCatalog> {
        let tree = LocationTree::new()
            .with(LocationNode::new(STOCK, "Stock"))
            .with(LocationNode::new(OUT, "Output"));
        ReservationEngine::new(
            InMemoryQuantStore::with_quants(tree, quants),
            FixedRemovalStrategy(RemovalStrategy::Fifo),
            UomCatalog::new().with(units()).with(dozens()),
        )
    }

    fn alloc(quant: &Quant, quantity: Decimal) -> Allocation {
        Allocation {
            quant: quant.clone(),
            quantity,
        }
    }

    #[test]
    fn new_lines_carry_quant_identity_and_template() {
        let engine = engine(Vec::new());
        let q = quant(1, dec!(10)).with_package(PackageId::from_u128(4), "P4");
        let template = LineMetadata {
            batch_tag: Some("RL-0001".to_string()),
            operator: Some("mara".to_string()),
            client_reference: None,
        };
        let mut mv = StockMove::new(peas(), STOCK, OUT).with_line_template(template.clone());

        let taken = engine.apply_reservation(&mut mv, &[alloc(&q, dec!(4))]).unwrap();
        assert_eq!(taken, dec!(4));
        assert_eq!(mv.lines.len(), 1);
        let line = &mv.lines[0];
        assert_eq!(line.quant_id, Some(q.id));
        assert_eq!(line.package_id, q.package_id);
        assert_eq!(line.metadata, template);
    }

    #[test]
    fn matching_line_grows_in_place() {
        let engine = engine(Vec::new());
        let q = quant(1, dec!(10));
        let mut mv = StockMove::new(peas(), STOCK, OUT);
        engine.apply_reservation(&mut mv, &[alloc(&q, dec!(4))]).unwrap();
        engine.apply_reservation(&mut mv, &[alloc(&q, dec!(3))]).unwrap();
        assert_eq!(mv.lines.len(), 1);
        assert_eq!(mv.lines[0].quantity, dec!(7));

        engine.apply_reservation(&mut mv, &[alloc(&q, dec!(-5))]).unwrap();
        assert_eq!(mv.lines[0].quantity, dec!(2));
    }

    #[test]
    fn line_with_result_package_is_not_updated() {
        let engine = engine(Vec::new());
        let q = quant(1, dec!(10));
        let mut mv = StockMove::new(peas(), STOCK, OUT);
        engine.apply_reservation(&mut mv, &[alloc(&q, dec!(4))]).unwrap();
        mv.lines[0].result_package_id = Some(PackageId::from_u128(9));
        engine.apply_reservation(&mut mv, &[alloc(&q, dec!(1))]).unwrap();
        assert_eq!(mv.lines.len(), 2);
    }

    #[test]
    fn unrepresentable_quantity_falls_back_to_product_unit() {
        let engine = engine(Vec::new());
        let q = quant(1, dec!(10));
        let mut mv = StockMove::new(peas(), STOCK, OUT).with_uom(dozens().id);

        engine.apply_reservation(&mut mv, &[alloc(&q, dec!(24))]).unwrap();
        assert_eq!(mv.lines[0].uom, dozens().id);
        assert_eq!(mv.lines[0].quantity, dec!(2));

        // 5 units is 0.42 dozens on the dozens grid, which comes back as 5.04.
        let other = quant(2, dec!(10)).with_owner(OwnerId::from_u128(3));
        engine.apply_reservation(&mut mv, &[alloc(&other, dec!(5))]).unwrap();
        assert_eq!(mv.lines[1].uom, units().id);
        assert_eq!(mv.lines[1].quantity, dec!(5));
    }

    #[test]
    fn serial_products_get_one_line_per_unit() {
        let engine = engine(Vec::new());
        let q = quant(1, dec!(10));
        let mut mv = StockMove::new(peas().with_tracking(Tracking::Serial), STOCK, OUT);
        let taken = engine.apply_reservation(&mut mv, &[alloc(&q, dec!(3))]).unwrap();
        assert_eq!(taken, dec!(3));
        assert_eq!(mv.lines.len(), 3);
        assert!(mv.lines.iter().all(|l| l.quantity == Decimal::ONE));
    }

    #[test]
    fn serial_reservation_is_released_from_its_lot_line() {
        let engine = engine(Vec::new());
        let lot = LotId::from_u128(21);
        let q = quant(1, dec!(1)).with_lot(lot);
        let other = quant(2, dec!(1)).with_lot(LotId::from_u128(22));
        let mut mv = StockMove::new(peas().with_tracking(Tracking::Serial), STOCK, OUT);

        engine
            .apply_reservation(&mut mv, &[alloc(&q, dec!(1)), alloc(&other, dec!(1))])
            .unwrap();
        assert_eq!(mv.lines.len(), 2);

        let taken = engine.apply_reservation(&mut mv, &[alloc(&q, dec!(-1))]).unwrap();
        assert_eq!(taken, dec!(-1));
        assert_eq!(mv.lines.len(), 2);
        assert_eq!(mv.lines[0].lot_id, Some(lot));
        assert_eq!(mv.lines[0].quantity, Decimal::ZERO);
        assert_eq!(mv.lines[1].quantity, Decimal::ONE);

        // A full serial line cannot take a second unit of the same lot.
        engine.apply_reservation(&mut mv, &[alloc(&other, dec!(1))]).unwrap();
        assert_eq!(mv.lines.len(), 3);
    }

    #[test]
    fn failed_apply_leaves_lines_untouched() {
        let engine = engine(Vec::new());
        let q1 = quant(1, dec!(10));
        let q2 = quant(2, dec!(10)).with_package(PackageId::from_u128(9), "P9");
        let mut mv = StockMove::new(peas(), STOCK, OUT);
        engine.apply_reservation(&mut mv, &[alloc(&q1, dec!(5))]).unwrap();
        let before = mv.lines.clone();

        let err = engine
            .apply_reservation(
                &mut mv,
                &[alloc(&q1, dec!(-2)), alloc(&q1, dec!(1)), alloc(&q2, dec!(-3))],
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(mv.lines, before);
    }

    #[test]
    fn lines_created_earlier_in_the_batch_can_be_released() {
        let engine = engine(Vec::new());
        let q = quant(1, dec!(10));
        let mut mv = StockMove::new(peas(), STOCK, OUT);
        let taken = engine
            .apply_reservation(&mut mv, &[alloc(&q, dec!(4)), alloc(&q, dec!(-1))])
            .unwrap();
        assert_eq!(taken, dec!(3));
        assert_eq!(mv.lines.len(), 1);
        assert_eq!(mv.lines[0].quantity, dec!(3));
    }

    #[test]
    fn release_without_a_line_is_rejected() {
        let engine = engine(Vec::new());
        let q = quant(1, dec!(10)).with_reserved(dec!(3));
        let mut mv = StockMove::new(peas(), STOCK, OUT);
        let err = engine.apply_reservation(&mut mv, &[alloc(&q, dec!(-3))]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn move_reserves_only_partner_stock() {
        let partner = OwnerId::from_u128(7);
        let engine = engine(vec![
            quant(1, dec!(10)),
            quant(2, dec!(6)).with_owner(partner),
        ]);
        let mut mv = StockMove::new(peas(), STOCK, OUT).with_partner(partner);
        let taken = mv
            .update_reserved_quantity(&engine, dec!(8), STOCK, None, None, true, None)
            .unwrap();
        assert_eq!(taken, dec!(6));
        assert_eq!(mv.lines.len(), 1);
        assert_eq!(mv.lines[0].quant_id, Some(QuantId::from_u128(2)));
        assert_eq!(mv.lines[0].owner_id, Some(partner));
    }
}
