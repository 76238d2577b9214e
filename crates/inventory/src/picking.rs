//! Locations a picking may use as source or destination.

use serde::{Deserialize, Serialize};

use stockreloc_core::{LocationId, OwnerId};

use crate::location::{LocationNode, LocationTree};
use crate::quant::Quant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickingType {
    Incoming,
    Outgoing,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickingState {
    #[default]
    Draft,
    Waiting,
    Assigned,
    Done,
    Cancelled,
}

/// The picking fields the allowed-location rule depends on. Recompute when
/// any of them change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingContext {
    pub picking_type: PickingType,
    #[serde(default)]
    pub state: PickingState,
    #[serde(default)]
    pub partner: Option<OwnerId>,
    #[serde(default)]
    pub warehouse_code: Option<String>,
    #[serde(default)]
    pub is_blast_freezer: bool,
}

/// Locations the picking may be booked against, in tree order.
///
/// Deliveries from a blast freezer offer the freezer locations holding the
/// partner's stock; other deliveries offer warehouse locations with a bin two
/// or three levels down occupied by the partner. Receipts into a blast freezer
/// offer every freezer location; other receipts offer warehouse racks (nodes
/// with a parent and grandchildren, other than `Stock` and the `BF` areas).
pub fn allowed_locations(picking: &PickingContext, tree: &LocationTree, quants: &[Quant]) -> Vec<LocationId> {
    if picking.state == PickingState::Done {
        return Vec::new();
    }
    let Some(partner) = picking.partner else {
        return Vec::new();
    };
    let same_warehouse = |node: &LocationNode| node.warehouse_code == picking.warehouse_code;

    match (picking.picking_type, picking.is_blast_freezer) {
        (PickingType::Outgoing, true) => {
            let mut locations: Vec<LocationId> = Vec::new();
            for quant in quants.iter().filter(|q| q.owner_id == Some(partner)) {
                let in_freezer = tree.get(quant.location_id).is_some_and(|n| n.is_blast_freezer);
                if in_freezer && !locations.contains(&quant.location_id) {
                    locations.push(quant.location_id);
                }
            }
            locations
        }
        (PickingType::Outgoing, false) => tree
            .iter()
            .filter(|node| same_warehouse(node))
            .filter(|node| {
                [2, 3].into_iter().any(|depth| {
                    tree.descendants_at(node.id, depth)
                        .iter()
                        .any(|bin| bin.occupied_by == Some(partner))
                })
            })
            .map(|node| node.id)
            .collect(),
        (PickingType::Incoming, true) => tree
            .iter()
            .filter(|node| node.is_blast_freezer)
            .map(|node| node.id)
            .collect(),
        (PickingType::Incoming, false) => tree
            .iter()
            .filter(|node| same_warehouse(node))
            .filter(|node| node.parent.is_some())
            .filter(|node| node.name != "Stock" && !node.name.to_lowercase().contains("bf"))
            .filter(|node| !tree.descendants_at(node.id, 2).is_empty())
            .map(|node| node.id)
            .collect(),
        (PickingType::Internal, _) => Vec::new(),
    }
}
