//! Scenario files: a warehouse snapshot plus the operation to run on it.

use std::cell::Cell;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainResult, PackageId, QuantId};
use stockreloc_inventory::reservation::allocated_total;
use stockreloc_inventory::{
    Allocation, InMemoryQuantStore, LocationNode, LocationTree, Product, ProductCatalog, Quant,
    RelocationPlan, RelocationRequest, RemovalStrategyTable, ReservationDemand, ReservationEngine,
    ReservationSettings, SequenceSource, Uom, UomCatalog, relocate,
};
use stockreloc_reports::{GroupBy, QuantTotal, quant_totals};

/// What to run over a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reserve,
    Relocate,
    Totals,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub locations: Vec<LocationNode>,
    #[serde(default)]
    pub uoms: Vec<Uom>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub quants: Vec<Quant>,
}

impl Snapshot {
    fn store(&self) -> InMemoryQuantStore {
        InMemoryQuantStore::with_quants(LocationTree::from(self.locations.clone()), self.quants.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReserveScenario {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub demand: ReservationDemand,
}

#[derive(Debug, Serialize)]
pub struct ReserveOutcome {
    pub requested: Decimal,
    pub reserved: Decimal,
    pub allocations: Vec<Allocation>,
    pub quants: Vec<Quant>,
}

#[derive(Debug, Deserialize)]
pub struct RelocateScenario {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// Quants to relocate, in selection order. Empty selects every quant.
    #[serde(default)]
    pub selection: Vec<QuantId>,
    #[serde(default)]
    pub dest_package: Option<PackageId>,
    #[serde(default)]
    pub is_partial_package: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    /// Last batch number already issued.
    #[serde(default)]
    pub last_batch: u32,
}

#[derive(Debug, Serialize)]
pub struct RelocateOutcome {
    pub plan: RelocationPlan,
    pub quants: Vec<Quant>,
}

#[derive(Debug, Deserialize)]
pub struct TotalsScenario {
    pub quants: Vec<Quant>,
    pub group_by: GroupBy,
}

/// Issues `RL00001`, `RL00002`, ... after the last issued number.
struct BatchCounter(Cell<u32>);

impl SequenceSource for BatchCounter {
    fn next_value(&self, _code: &str) -> DomainResult<String> {
        let next = self.0.get() + 1;
        self.0.set(next);
        Ok(format!("RL{next:05}"))
    }
}

/// Runs `operation` over the JSON scenario in `input`.
pub fn run(operation: Operation, input: &str, settings: ReservationSettings) -> anyhow::Result<serde_json::Value> {
    let output = match operation {
        Operation::Reserve => {
            let scenario: ReserveScenario = serde_json::from_str(input).context("invalid reserve scenario")?;
            serde_json::to_value(reserve(scenario, settings)?)?
        }
        Operation::Relocate => {
            let scenario: RelocateScenario = serde_json::from_str(input).context("invalid relocate scenario")?;
            serde_json::to_value(relocate_selection(scenario)?)?
        }
        Operation::Totals => {
            let scenario: TotalsScenario = serde_json::from_str(input).context("invalid totals scenario")?;
            serde_json::to_value(totals(&scenario))?
        }
    };
    Ok(output)
}

/// Reserves the demand and commits it to the snapshot.
pub fn reserve(scenario: ReserveScenario, settings: ReservationSettings) -> anyhow::Result<ReserveOutcome> {
    let store = scenario.snapshot.store();
    let mut uoms = UomCatalog::from(scenario.snapshot.uoms.clone());
    uoms.insert(scenario.demand.product.uom.clone());
    let strategies = RemovalStrategyTable::from_tree(store.locations(), settings.default_removal_strategy);
    let engine = ReservationEngine::new(&store, strategies, uoms).with_settings(settings);

    let allocations = engine
        .reserve(&scenario.demand, None)
        .with_context(|| format!("reserving {}", scenario.demand.product.display_name))?;
    store.commit_reservation(&allocations)?;

    let reserved = allocated_total(&allocations);
    tracing::info!(
        product = %scenario.demand.product.id,
        requested = %scenario.demand.quantity,
        %reserved,
        "reservation committed"
    );
    Ok(ReserveOutcome {
        requested: scenario.demand.quantity,
        reserved,
        allocations,
        quants: store.snapshot()?,
    })
}

/// Relocates the selected quants and executes the moves on the snapshot.
pub fn relocate_selection(scenario: RelocateScenario) -> anyhow::Result<RelocateOutcome> {
    let store = scenario.snapshot.store();
    let products = ProductCatalog::from(scenario.snapshot.products.clone());

    let quants = if scenario.selection.is_empty() {
        store.snapshot()?
    } else {
        scenario
            .selection
            .iter()
            .map(|id| store.get(*id))
            .collect::<Result<Vec<_>, _>>()
            .context("selection refers to an unknown quant")?
    };
    let request = RelocationRequest {
        quants,
        dest_package: scenario.dest_package,
        is_partial_package: scenario.is_partial_package,
        message: scenario.message,
        operator: scenario.operator,
    };

    let sequences = BatchCounter(Cell::new(scenario.last_batch));
    let plan = relocate(&request, &products, &sequences, &store, &store).context("relocation failed")?;
    Ok(RelocateOutcome {
        plan,
        quants: store.snapshot()?,
    })
}

pub fn totals(scenario: &TotalsScenario) -> Vec<QuantTotal> {
    quant_totals(&scenario.quants, scenario.group_by)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KG: &str = "00000000-0000-0000-0000-000000000001";
    const BEEF: &str = "00000000-0000-0000-0000-000000000002";
    const WH: &str = "00000000-0000-0000-0000-000000000003";
    const BIN_A: &str = "00000000-0000-0000-0000-000000000004";
    const BIN_B: &str = "00000000-0000-0000-0000-000000000005";
    const Q1: &str = "00000000-0000-0000-0000-000000000006";
    const Q2: &str = "00000000-0000-0000-0000-000000000007";

    fn snapshot() -> serde_json::Value {
        let kg = json!({"id": KG, "name": "kg", "category": "Weight", "ratio": "1", "rounding": "0.01"});
        json!({
            "locations": [
                {"id": WH, "name": "WH"},
                {"id": BIN_A, "name": "A-01", "parent": WH},
                {"id": BIN_B, "name": "B-01", "parent": WH}
            ],
            "uoms": [kg],
            "products": [{"id": BEEF, "display_name": "Beef Brisket", "uom": kg}],
            "quants": [
                {"id": Q1, "product_id": BEEF, "location_id": BIN_A, "location_name": "WH/A-01",
                 "quantity": "10", "expiration_date": "2024-05-01", "relocation_destination": BIN_B},
                {"id": Q2, "product_id": BEEF, "location_id": BIN_B, "location_name": "WH/B-01",
                 "quantity": "10", "expiration_date": "2024-04-01"}
            ]
        })
    }

    #[test]
    fn reserve_commits_earliest_expiry_first() {
        let mut input = snapshot();
        input["demand"] = json!({
            "product": input["products"][0].clone(),
            "location": WH,
            "quantity": "12"
        });
        let out = run(Operation::Reserve, &input.to_string(), ReservationSettings::default()).unwrap();
        assert_eq!(out["reserved"], json!("12"));
        assert_eq!(out["allocations"][0]["quant"]["id"], json!(Q2));
        assert_eq!(out["allocations"][0]["quantity"], json!("10"));
        assert_eq!(out["quants"][0]["reserved_quantity"], json!("2"));
    }

    #[test]
    fn relocate_numbers_the_batch_after_the_last_one() {
        let mut input = snapshot();
        input["selection"] = json!([Q1]);
        input["last_batch"] = json!(41);
        input["operator"] = json!("santos");
        let out = run(Operation::Relocate, &input.to_string(), ReservationSettings::default()).unwrap();
        assert_eq!(out["plan"]["batch_number"], json!("RL00042"));
        assert_eq!(out["plan"]["moves"][0]["line"]["operator"], json!("santos"));
        // Q2 at the destination expires earlier, so the moved stock stays a
        // quant of its own.
        let quants = out["quants"].as_array().unwrap();
        assert_eq!(quants.len(), 3);
        assert_eq!(quants[0]["quantity"], json!("0"));
        assert_eq!(quants[1]["quantity"], json!("10"));
        assert_eq!(quants[2]["location_id"], json!(BIN_B));
        assert_eq!(quants[2]["quantity"], json!("10"));
        assert_eq!(quants[2]["expiration_date"], json!("2024-05-01"));
    }

    #[test]
    fn malformed_scenario_and_unknown_selection_are_reported() {
        let err = run(Operation::Reserve, "{}", ReservationSettings::default()).unwrap_err();
        assert!(err.to_string().contains("invalid reserve scenario"));

        let mut input = snapshot();
        input["selection"] = json!(["00000000-0000-0000-0000-0000000000ff"]);
        assert!(run(Operation::Relocate, &input.to_string(), ReservationSettings::default()).is_err());
    }

    #[test]
    fn totals_group_by_location() {
        let input = json!({"quants": snapshot()["quants"].clone(), "group_by": "location"});
        let out = run(Operation::Totals, &input.to_string(), ReservationSettings::default()).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 2);
        assert_eq!(out[0]["key"], json!({"by": "location", "id": BIN_A}));
        assert_eq!(out[0]["on_hand"], json!("10"));
    }
}
