//! Stock location hierarchy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainError, DomainResult, Entity, LocationId, OwnerId};

use crate::removal::RemovalStrategy;

/// One node of the location tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<LocationId>,
    #[serde(default)]
    pub warehouse_code: Option<String>,
    #[serde(default)]
    pub is_blast_freezer: bool,
    /// Client currently renting this slot.
    #[serde(default)]
    pub occupied_by: Option<OwnerId>,
    #[serde(default)]
    pub removal_strategy: Option<RemovalStrategy>,
}

impl LocationNode {
    pub fn new(id: LocationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            warehouse_code: None,
            is_blast_freezer: false,
            occupied_by: None,
            removal_strategy: None,
        }
    }

    pub fn with_parent(mut self, parent: LocationId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_warehouse(mut self, code: impl Into<String>) -> Self {
        self.warehouse_code = Some(code.into());
        self
    }

    pub fn blast_freezer(mut self) -> Self {
        self.is_blast_freezer = true;
        self
    }

    pub fn occupied_by(mut self, owner: OwnerId) -> Self {
        self.occupied_by = Some(owner);
        self
    }

    pub fn with_removal_strategy(mut self, strategy: RemovalStrategy) -> Self {
        self.removal_strategy = Some(strategy);
        self
    }
}

impl Entity for LocationNode {
    type Id = LocationId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Locations indexed by id, keeping insertion order for listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<LocationNode>", into = "Vec<LocationNode>")]
pub struct LocationTree {
    nodes: HashMap<LocationId, LocationNode>,
    order: Vec<LocationId>,
}

impl LocationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: LocationNode) {
        if !self.nodes.contains_key(&node.id) {
            self.order.push(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    pub fn with(mut self, node: LocationNode) -> Self {
        self.insert(node);
        self
    }

    pub fn get(&self, id: LocationId) -> Option<&LocationNode> {
        self.nodes.get(&id)
    }

    pub fn require(&self, id: LocationId) -> DomainResult<&LocationNode> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found(format!("location {id}")))
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LocationNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// `id` itself, then its parent, up to the root.
    ///
    /// Stops after visiting every node once, so a corrupt parent cycle cannot
    /// loop forever.
    pub fn ancestors(&self, id: LocationId) -> Vec<&LocationNode> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id);
        while let Some(node) = current {
            if chain.len() > self.nodes.len() {
                break;
            }
            chain.push(node);
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        chain
    }

    /// Full hierarchical name, e.g. `WH/Stock/Rack A/A-01`.
    pub fn complete_name(&self, id: LocationId) -> Option<String> {
        let chain = self.ancestors(id);
        if chain.is_empty() {
            return None;
        }
        let names: Vec<&str> = chain.iter().rev().map(|n| n.name.as_str()).collect();
        Some(names.join("/"))
    }

    /// True when `id` is `ancestor` or lies below it.
    pub fn is_child_of(&self, id: LocationId, ancestor: LocationId) -> bool {
        self.ancestors(id).iter().any(|n| n.id == ancestor)
    }

    pub fn children(&self, id: LocationId) -> Vec<&LocationNode> {
        self.iter().filter(|n| n.parent == Some(id)).collect()
    }

    /// Nodes exactly `depth` levels below `id` (1 = children).
    pub fn descendants_at(&self, id: LocationId, depth: usize) -> Vec<&LocationNode> {
        let mut level = vec![id];
        for _ in 0..depth {
            level = self
                .iter()
                .filter(|n| n.parent.is_some_and(|p| level.contains(&p)))
                .map(|n| n.id)
                .collect();
        }
        level.iter().filter_map(|l| self.nodes.get(l)).collect()
    }
}

impl From<Vec<LocationNode>> for LocationTree {
    fn from(nodes: Vec<LocationNode>) -> Self {
        nodes.into_iter().fold(Self::new(), Self::with)
    }
}

impl From<LocationTree> for Vec<LocationNode> {
    fn from(mut tree: LocationTree) -> Self {
        tree.order
            .iter()
            .filter_map(|id| tree.nodes.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(n: u128) -> LocationId {
        LocationId::from_u128(n)
    }

    fn tree() -> LocationTree {
        LocationTree::new()
            .with(LocationNode::new(loc(1), "WH"))
            .with(LocationNode::new(loc(2), "Stock").with_parent(loc(1)))
            .with(LocationNode::new(loc(3), "Rack A").with_parent(loc(2)))
            .with(LocationNode::new(loc(4), "A-01").with_parent(loc(3)))
            .with(LocationNode::new(loc(5), "A-02").with_parent(loc(3)))
    }

    #[test]
    fn complete_name_joins_the_hierarchy() {
        assert_eq!(tree().complete_name(loc(4)).as_deref(), Some("WH/Stock/Rack A/A-01"));
        assert_eq!(tree().complete_name(loc(1)).as_deref(), Some("WH"));
        assert_eq!(tree().complete_name(loc(9)), None);
    }

    #[test]
    fn child_of_includes_self_and_descendants() {
        let t = tree();
        assert!(t.is_child_of(loc(4), loc(2)));
        assert!(t.is_child_of(loc(2), loc(2)));
        assert!(!t.is_child_of(loc(2), loc(4)));
    }

    #[test]
    fn descendants_by_depth() {
        let t = tree();
        let ids: Vec<_> = t.descendants_at(loc(2), 2).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![loc(4), loc(5)]);
        assert_eq!(t.children(loc(2)).len(), 1);
        assert!(t.descendants_at(loc(4), 1).is_empty());
    }

    #[test]
    fn parent_cycle_terminates() {
        let t = LocationTree::new()
            .with(LocationNode::new(loc(1), "A").with_parent(loc(2)))
            .with(LocationNode::new(loc(2), "B").with_parent(loc(1)));
        assert!(!t.is_child_of(loc(1), loc(3)));
    }
}
