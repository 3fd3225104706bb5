//! Core types for per-level diagram graphs
//!
//! These types define the content of a single diagram: typed nodes
//! (entity, process, datastore) and the flows connecting them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::item_ids;
use crate::error::DfdError;

/// Unique identifier for an item inside a diagram
pub type ItemId = String;

/// The kind of an item in a diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// External source or sink of data
    Entity,
    /// Transforms data; may be decomposed into its own diagram
    Process,
    /// Data at rest
    Datastore,
    /// Data moving between two items
    Flow,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Entity => "entity",
            ItemType::Process => "process",
            ItemType::Datastore => "datastore",
            ItemType::Flow => "flow",
        }
    }

    /// Whether this type is a node (anything but a flow)
    pub fn is_node(&self) -> bool {
        !matches!(self, ItemType::Flow)
    }

    /// Whether items of this type carry a positional identifier
    pub fn has_id_label(&self) -> bool {
        matches!(self, ItemType::Process | ItemType::Datastore)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = DfdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity" => Ok(ItemType::Entity),
            "process" => Ok(ItemType::Process),
            "datastore" => Ok(ItemType::Datastore),
            "flow" => Ok(ItemType::Flow),
            other => Err(DfdError::InvalidCellType(other.to_string())),
        }
    }
}

fn new_item_id(prefix: &str) -> ItemId {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// A node placed in a diagram
///
/// Items copied down from a parent diagram are boundary copies: they have
/// `from_parent` set and record the flows that must reconnect them inside
/// the child diagram. Both sets are seen from the decomposed process:
/// inflows enter it (the copy is the flow source), outflows leave it (the
/// copy is the flow target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphItem {
    /// Unique identifier for this item within its diagram
    pub id: ItemId,
    /// Entity, process or datastore
    pub item_type: ItemType,
    /// Display name
    pub label: String,
    /// Positional identifier shown on processes and datastores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_label: Option<String>,
    /// Set on boundary copies placed here from the parent diagram
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_parent: bool,
    /// Flow labels that must enter the decomposed process from this copy
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_inflows: BTreeSet<String>,
    /// Flow labels that must leave the decomposed process into this copy
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_outflows: BTreeSet<String>,
}

impl GraphItem {
    /// Create a native item with a fresh id
    pub fn new(item_type: ItemType, label: impl Into<String>) -> Self {
        Self {
            id: new_item_id(item_ids::NODE),
            item_type,
            label: label.into(),
            id_label: None,
            from_parent: false,
            required_inflows: BTreeSet::new(),
            required_outflows: BTreeSet::new(),
        }
    }

    /// Set the positional identifier
    pub fn with_id_label(mut self, id_label: impl Into<String>) -> Self {
        self.id_label = Some(id_label.into());
        self
    }

    /// Check label and type
    pub fn matches(&self, label: &str, item_type: ItemType) -> bool {
        self.item_type == item_type && self.label == label
    }

    /// Whether this item is a boundary copy rather than native to its diagram
    pub fn is_boundary_copy(&self) -> bool {
        self.from_parent
    }

    /// Whether the copy still carries any required flow
    pub fn has_required_flows(&self) -> bool {
        !self.required_inflows.is_empty() || !self.required_outflows.is_empty()
    }

    /// Drop a flow label from both required sets
    pub fn forget_required_flow(&mut self, label: &str) -> bool {
        let from_in = self.required_inflows.remove(label);
        let from_out = self.required_outflows.remove(label);
        from_in || from_out
    }

    /// Rename a flow label in both required sets
    pub fn rename_required_flow(&mut self, old_label: &str, new_label: &str) -> bool {
        let mut changed = false;
        for set in [&mut self.required_inflows, &mut self.required_outflows] {
            if set.remove(old_label) {
                set.insert(new_label.to_string());
                changed = true;
            }
        }
        changed
    }
}

/// A flow connecting two items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    /// Unique identifier for this flow
    pub id: ItemId,
    /// Flow name
    pub label: String,
    /// Source item ID
    pub source: ItemId,
    /// Target item ID
    pub target: ItemId,
}

impl FlowEdge {
    /// Create a flow with a fresh id
    pub fn new(label: impl Into<String>, source: impl Into<ItemId>, target: impl Into<ItemId>) -> Self {
        Self {
            id: new_item_id(item_ids::FLOW),
            label: label.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Whether this flow starts or ends at the item
    pub fn touches(&self, item_id: &str) -> bool {
        self.source == item_id || self.target == item_id
    }

    /// The endpoint opposite to `item_id`, if the flow touches it
    pub fn other_end(&self, item_id: &str) -> Option<&str> {
        if self.source == item_id {
            Some(&self.target)
        } else if self.target == item_id {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// The graph of a single diagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramGraph {
    /// Nodes in insertion order
    pub items: Vec<GraphItem>,
    /// Flows in insertion order
    pub flows: Vec<FlowEdge>,
}

impl DiagramGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.flows.is_empty()
    }

    /// Append a node without any dedup
    pub fn insert_node(&mut self, item: GraphItem) -> ItemId {
        let id = item.id.clone();
        self.items.push(item);
        id
    }

    /// Insert a node, merging it into an existing item of the same label and type
    ///
    /// The existing item keeps its id and connections; required flows are
    /// unioned and the boundary flag is kept if either side has it.
    pub fn upsert_node(&mut self, item: GraphItem) -> ItemId {
        match self.find_node_mut(&item.label, item.item_type) {
            Some(existing) => {
                existing.from_parent |= item.from_parent;
                existing.required_inflows.extend(item.required_inflows);
                existing.required_outflows.extend(item.required_outflows);
                if existing.id_label.is_none() {
                    existing.id_label = item.id_label;
                }
                existing.id.clone()
            }
            None => self.insert_node(item),
        }
    }

    /// Add a flow between two existing items
    pub fn insert_edge(&mut self, edge: FlowEdge) -> crate::error::Result<ItemId> {
        for endpoint in [&edge.source, &edge.target] {
            if self.find_item(endpoint).is_none() {
                return Err(DfdError::NotFound(format!("flow endpoint '{}'", endpoint)));
            }
        }
        let id = edge.id.clone();
        self.flows.push(edge);
        Ok(id)
    }

    /// Remove a node together with its incident flows
    pub fn remove_node(&mut self, item_id: &str) -> Option<(GraphItem, Vec<FlowEdge>)> {
        let pos = self.items.iter().position(|i| i.id == item_id)?;
        let item = self.items.remove(pos);
        let (removed, kept): (Vec<FlowEdge>, Vec<FlowEdge>) =
            self.flows.drain(..).partition(|f| f.touches(item_id));
        self.flows = kept;
        Some((item, removed))
    }

    /// Remove a flow by ID
    pub fn remove_edge(&mut self, flow_id: &str) -> Option<FlowEdge> {
        let pos = self.flows.iter().position(|f| f.id == flow_id)?;
        Some(self.flows.remove(pos))
    }

    /// Find a node by label and type
    pub fn find_node(&self, label: &str, item_type: ItemType) -> Option<&GraphItem> {
        self.items.iter().find(|i| i.matches(label, item_type))
    }

    /// Find a node by label and type (mutable)
    pub fn find_node_mut(&mut self, label: &str, item_type: ItemType) -> Option<&mut GraphItem> {
        self.items.iter_mut().find(|i| i.matches(label, item_type))
    }

    /// Find a node by ID
    pub fn find_item(&self, item_id: &str) -> Option<&GraphItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Find a node by ID (mutable)
    pub fn find_item_mut(&mut self, item_id: &str) -> Option<&mut GraphItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// Find a flow by ID
    pub fn find_edge(&self, flow_id: &str) -> Option<&FlowEdge> {
        self.flows.iter().find(|f| f.id == flow_id)
    }

    /// Copy a node under a fresh id, keeping label, id label and required flows
    pub fn clone_node(&self, item_id: &str) -> Option<GraphItem> {
        self.find_item(item_id).map(|item| GraphItem {
            id: new_item_id(item_ids::NODE),
            ..item.clone()
        })
    }

    /// Whether an item of the given type and label is present (flows included)
    pub fn contains(&self, label: &str, item_type: ItemType) -> bool {
        match item_type {
            ItemType::Flow => self.flows.iter().any(|f| f.label == label),
            _ => self.find_node(label, item_type).is_some(),
        }
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphItem> {
        self.items.iter()
    }

    /// Nodes of one type in insertion order
    pub fn nodes_of_type(&self, item_type: ItemType) -> impl Iterator<Item = &GraphItem> {
        self.items.iter().filter(move |i| i.item_type == item_type)
    }

    /// Flows touching a node
    pub fn edges_of<'a>(&'a self, item_id: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.flows.iter().filter(move |f| f.touches(item_id))
    }

    /// Flows carrying a label
    pub fn flows_labeled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.flows.iter().filter(move |f| f.label == label)
    }

    /// Resolve both ends of a flow
    pub fn endpoints(&self, flow: &FlowEdge) -> Option<(&GraphItem, &GraphItem)> {
        Some((self.find_item(&flow.source)?, self.find_item(&flow.target)?))
    }

    /// Items of a type connected to `item_id` by any flow
    pub fn connected(&self, item_id: &str, item_type: ItemType) -> Vec<&GraphItem> {
        let mut found: Vec<&GraphItem> = Vec::new();
        for flow in self.edges_of(item_id) {
            if let Some(other) = flow.other_end(item_id).and_then(|id| self.find_item(id)) {
                if other.item_type == item_type && !found.iter().any(|f| f.id == other.id) {
                    found.push(other);
                }
            }
        }
        found
    }

    /// Relabel every item of a type, returning how many changed
    pub fn rename_label(&mut self, old_label: &str, new_label: &str, item_type: ItemType) -> usize {
        let mut renamed = 0;
        if item_type == ItemType::Flow {
            for flow in self.flows.iter_mut().filter(|f| f.label == old_label) {
                flow.label = new_label.to_string();
                renamed += 1;
            }
        } else {
            for item in self.items.iter_mut().filter(|i| i.matches(old_label, item_type)) {
                item.label = new_label.to_string();
                renamed += 1;
            }
        }
        renamed
    }
}
