//! Flat listing of every native item in a hierarchy
//!
//! Exporters need each item once, no matter how many diagrams show a copy
//! of it. Boundary copies are skipped; flows are collected from every level
//! and identified by their label and endpoint labels.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::hierarchy::{DiagramNode, HierarchyTree};
use crate::propagation::FlowKey;
use crate::types::ItemType;

/// Items of a leveled DFD keyed by label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DfdCatalog {
    /// External entities of the Context diagram
    pub entities: BTreeSet<String>,
    /// Process label mapped to the process it refines, `None` at the top level
    pub processes: BTreeMap<String, Option<String>>,
    pub datastores: BTreeSet<String>,
    pub flows: BTreeSet<FlowKey>,
}

impl DfdCatalog {
    /// Processes that refine `parent`
    pub fn sub_processes_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.processes
            .iter()
            .filter(move |(_, p)| p.as_deref() == Some(parent))
            .map(|(label, _)| label.as_str())
    }
}

/// Collect native items from the whole tree
pub fn collect_items(tree: &HierarchyTree) -> DfdCatalog {
    let mut catalog = DfdCatalog::default();
    let Some(root) = tree.root() else {
        return catalog;
    };

    catalog.entities = root
        .graph
        .nodes_of_type(ItemType::Entity)
        .filter(|e| !e.is_boundary_copy())
        .map(|e| e.label.clone())
        .collect();
    collect_node(root, None, &mut catalog, &mut HashSet::new());

    log::debug!(
        "Collected {} entities, {} processes, {} datastores, {} flows",
        catalog.entities.len(),
        catalog.processes.len(),
        catalog.datastores.len(),
        catalog.flows.len()
    );
    catalog
}

fn collect_node(node: &DiagramNode, parent: Option<&str>, catalog: &mut DfdCatalog, visited: &mut HashSet<String>) {
    if !visited.insert(node.name.clone()) {
        return;
    }
    let graph = &node.graph;

    for item in graph.nodes().filter(|i| !i.is_boundary_copy()) {
        match item.item_type {
            ItemType::Process => {
                catalog
                    .processes
                    .insert(item.label.clone(), parent.map(str::to_string));
            }
            ItemType::Datastore => {
                catalog.datastores.insert(item.label.clone());
            }
            _ => {}
        }
    }
    catalog
        .flows
        .extend(graph.flows.iter().filter_map(|f| FlowKey::of(graph, f)));

    for child in &node.children {
        collect_node(child, Some(&child.name), catalog, visited);
    }
}
