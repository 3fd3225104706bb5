//! Cross-diagram propagation
//!
//! Edits made in one diagram are replicated to every diagram that holds a
//! copy of the same item: entities bubble up to the Context diagram, items
//! connected to a decomposed process are copied down into its diagram as
//! boundary copies, and renames and deletes follow every occurrence.
//!
//! Recursive walks take an explicit `visited` set so connection cycles
//! between diagrams always terminate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{DfdError, Result};
use crate::events::{notify, EventSink, HierarchyEvent};
use crate::hierarchy::HierarchyTree;
use crate::types::{DiagramGraph, FlowEdge, GraphItem, ItemId, ItemType};
use crate::validation::{find_all_occurrences, find_occurrences_below};

/// Identity of a flow across diagrams
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub label: String,
    pub source: String,
    pub target: String,
}

impl FlowKey {
    /// Key of a flow inside `graph`, `None` if an endpoint is missing
    pub fn of(graph: &DiagramGraph, flow: &FlowEdge) -> Option<Self> {
        let (source, target) = graph.endpoints(flow)?;
        Some(Self {
            label: flow.label.clone(),
            source: source.label.clone(),
            target: target.label.clone(),
        })
    }
}

/// A flow that was taken out of a diagram and may leave copies unjustified
#[derive(Debug, Clone)]
struct RemovedFlow {
    diagram: String,
    key: FlowKey,
    source_type: ItemType,
    target_type: ItemType,
}

impl RemovedFlow {
    fn capture(diagram: &str, graph: &DiagramGraph, flow: &FlowEdge) -> Option<Self> {
        let (source, target) = graph.endpoints(flow)?;
        Some(Self {
            diagram: diagram.to_string(),
            key: FlowKey {
                label: flow.label.clone(),
                source: source.label.clone(),
                target: target.label.clone(),
            },
            source_type: source.item_type,
            target_type: target.item_type,
        })
    }
}

/// Place an entity in `diagram`, every ancestor, and every connected decomposition
///
/// Already present entities are reused, so repeated calls don't add
/// duplicates.
pub fn propagate_entity_add(
    tree: &mut HierarchyTree,
    sink: &dyn EventSink,
    entity_label: &str,
    diagram: &str,
    visited: &mut BTreeSet<String>,
) -> Result<()> {
    if !visited.insert(diagram.to_string()) {
        return Ok(());
    }

    let node = tree.find_mut(diagram)?;
    let entity_id = match node.graph.find_node(entity_label, ItemType::Entity) {
        Some(existing) => existing.id.clone(),
        None => {
            log::debug!("Adding entity '{}' to '{}'", entity_label, diagram);
            let id = node
                .graph
                .insert_node(GraphItem::new(ItemType::Entity, entity_label));
            notify(
                sink,
                HierarchyEvent::item_propagated(entity_label, ItemType::Entity, diagram, false),
            );
            id
        }
    };
    let decomposed: Vec<String> = node
        .graph
        .connected(&entity_id, ItemType::Process)
        .into_iter()
        .filter(|p| node.has_child(&p.label))
        .map(|p| p.label.clone())
        .collect();

    if let Some(parent) = tree.find_parent_of(diagram).map(|p| p.name.clone()) {
        propagate_entity_add(tree, sink, entity_label, &parent, visited)?;
    }
    for process in decomposed {
        propagate_item_to_child(tree, sink, diagram, &entity_id, &process, visited)?;
    }
    Ok(())
}

/// Copy an item connected to a decomposed process into that process's diagram
///
/// The copy records which flows must reconnect it inside the child: flows
/// from the item into the process become required inflows, flows from the
/// process to the item required outflows. Returns the copy's id, or `None`
/// when the process has no decomposition.
pub fn propagate_item_to_child(
    tree: &mut HierarchyTree,
    sink: &dyn EventSink,
    parent_diagram: &str,
    item_id: &str,
    process_label: &str,
    visited: &mut BTreeSet<String>,
) -> Result<Option<ItemId>> {
    let parent = tree.find(parent_diagram)?;
    if !parent.has_child(process_label) {
        return Ok(None);
    }
    let graph = &parent.graph;
    let process = graph
        .find_node(process_label, ItemType::Process)
        .ok_or_else(|| DfdError::item_not_found(process_label, parent_diagram))?;
    if process.id == item_id {
        return Ok(None);
    }

    let mut copy = graph
        .clone_node(item_id)
        .ok_or_else(|| DfdError::item_not_found(item_id, parent_diagram))?;
    copy.from_parent = true;
    copy.required_inflows = graph
        .flows
        .iter()
        .filter(|f| f.source == item_id && f.target == process.id)
        .map(|f| f.label.clone())
        .collect();
    copy.required_outflows = graph
        .flows
        .iter()
        .filter(|f| f.source == process.id && f.target == item_id)
        .map(|f| f.label.clone())
        .collect();

    let (label, item_type) = (copy.label.clone(), copy.item_type);
    log::debug!(
        "Copying {} '{}' into '{}' (in: {:?}, out: {:?})",
        item_type,
        label,
        process_label,
        copy.required_inflows,
        copy.required_outflows
    );
    let copy_id = tree.find_mut(process_label)?.graph.upsert_node(copy);
    notify(
        sink,
        HierarchyEvent::item_propagated(&label, item_type, process_label, true),
    );

    if item_type == ItemType::Entity {
        propagate_entity_add(tree, sink, &label, process_label, visited)?;
    }
    Ok(Some(copy_id))
}

/// Seed a freshly decomposed process's diagram with boundary copies
///
/// Returns how many items were copied.
pub fn seed_decomposition(
    tree: &mut HierarchyTree,
    sink: &dyn EventSink,
    parent_diagram: &str,
    process_label: &str,
) -> Result<usize> {
    let graph = &tree.find(parent_diagram)?.graph;
    let process = graph
        .find_node(process_label, ItemType::Process)
        .ok_or_else(|| DfdError::item_not_found(process_label, parent_diagram))?;

    let mut neighbours: Vec<ItemId> = Vec::new();
    for flow in graph.edges_of(&process.id) {
        if let Some(other) = flow.other_end(&process.id) {
            if other != process.id && !neighbours.iter().any(|n| n == other) {
                neighbours.push(other.to_string());
            }
        }
    }

    let mut seeded = 0;
    for item_id in &neighbours {
        if propagate_item_to_child(tree, sink, parent_diagram, item_id, process_label, &mut BTreeSet::new())?.is_some() {
            seeded += 1;
        }
    }
    log::debug!("Seeded '{}' with {} boundary copies", process_label, seeded);
    Ok(seeded)
}

/// Replicate a newly added flow
///
/// Entity endpoints bubble up and reach every connected decomposition; any
/// other endpoint attached to a decomposed process is copied down into it.
pub fn propagate_connection(
    tree: &mut HierarchyTree,
    sink: &dyn EventSink,
    diagram: &str,
    flow_id: &str,
) -> Result<()> {
    let node = tree.find(diagram)?;
    let flow = node
        .graph
        .find_edge(flow_id)
        .ok_or_else(|| DfdError::item_not_found(flow_id, diagram))?;
    let (source, target) = node
        .graph
        .endpoints(flow)
        .ok_or_else(|| DfdError::item_not_found(flow_id, diagram))?;

    let mut entities = Vec::new();
    let mut pushes = Vec::new();
    for (end, other) in [(source, target), (target, source)] {
        if other.item_type == ItemType::Entity {
            if !entities.contains(&other.label) {
                entities.push(other.label.clone());
            }
        } else if end.item_type == ItemType::Process && node.has_child(&end.label) {
            pushes.push((other.id.clone(), end.label.clone()));
        }
    }

    for (item_id, process) in pushes {
        propagate_item_to_child(tree, sink, diagram, &item_id, &process, &mut BTreeSet::new())?;
    }
    for entity in entities {
        propagate_entity_add(tree, sink, &entity, diagram, &mut BTreeSet::new())?;
    }
    Ok(())
}

/// Rename every occurrence of an item
///
/// A decomposed process takes its diagram along. A renamed flow is also
/// rewritten in the required flows of boundary copies below its endpoints.
/// Returns how many diagrams were touched.
pub fn propagate_rename(
    tree: &mut HierarchyTree,
    sink: &dyn EventSink,
    old_label: &str,
    new_label: &str,
    item_type: ItemType,
) -> Result<usize> {
    if old_label == new_label {
        return Ok(0);
    }

    let occurrences = find_all_occurrences(tree, old_label, item_type);
    let mut scopes = BTreeSet::new();
    for name in &occurrences {
        let node = tree.find_mut(name)?;
        if item_type == ItemType::Flow {
            for flow in node.graph.flows_labeled(old_label) {
                if let Some((source, target)) = node.graph.endpoints(flow) {
                    for end in [source, target] {
                        if end.item_type == ItemType::Process && node.has_child(&end.label) {
                            scopes.insert(end.label.clone());
                        }
                    }
                }
            }
        }
        node.graph.rename_label(old_label, new_label, item_type);
    }

    if item_type == ItemType::Process && tree.contains(old_label) {
        tree.rename(old_label, new_label)?;
        notify(
            sink,
            HierarchyEvent::DiagramRenamed {
                old_name: old_label.to_string(),
                new_name: new_label.to_string(),
            },
        );
    }

    for scope in scopes {
        for name in tree.subtree_names(&scope)? {
            let node = tree.find_mut(&name)?;
            for copy in node.graph.items.iter_mut().filter(|i| i.from_parent) {
                copy.rename_required_flow(old_label, new_label);
            }
        }
    }

    log::debug!(
        "Renamed {} '{}' to '{}' in {} diagrams",
        item_type,
        old_label,
        new_label,
        occurrences.len()
    );
    Ok(occurrences.len())
}

/// Delete an item from every diagram that holds it
///
/// A decomposed process takes its diagram subtree with it. Deleted flows
/// release the boundary copies they justified, see [`FlowKey`] for how a
/// flow is matched across diagrams.
pub fn propagate_delete(tree: &mut HierarchyTree, sink: &dyn EventSink, diagram: &str, item_id: &str) -> Result<()> {
    let graph = &tree.find(diagram)?.graph;

    if graph.find_edge(item_id).is_some() {
        return delete_flow(tree, sink, diagram, item_id);
    }

    let item = graph
        .find_item(item_id)
        .ok_or_else(|| DfdError::item_not_found(item_id, diagram))?;
    let (label, item_type) = (item.label.clone(), item.item_type);
    delete_node(tree, sink, &label, item_type)
}

fn delete_node(tree: &mut HierarchyTree, sink: &dyn EventSink, label: &str, item_type: ItemType) -> Result<()> {
    let mut removed_flows = Vec::new();
    for name in find_all_occurrences(tree, label, item_type) {
        let node = tree.find_mut(&name)?;
        let Some(id) = node.graph.find_node(label, item_type).map(|i| i.id.clone()) else {
            continue;
        };
        removed_flows.extend(
            node.graph
                .edges_of(&id)
                .filter_map(|f| RemovedFlow::capture(&name, &node.graph, f)),
        );
        node.graph.remove_node(&id);
        notify(sink, HierarchyEvent::item_removed(label, item_type, &name));
    }

    if item_type == ItemType::Process {
        if let Some(subtree) = tree.remove(label) {
            log::info!("Removed decomposition '{}' with its sub-diagrams", subtree.name);
            notify(sink, HierarchyEvent::DiagramRemoved { name: subtree.name });
        }
    }

    release_boundary_copies(tree, sink, removed_flows)
}

/// Remove one flow, and its counterpart in every other diagram
///
/// Other diagrams lose at most one flow each. Nothing beyond `diagram` is
/// touched while a parallel flow with the same key is left there.
fn delete_flow(tree: &mut HierarchyTree, sink: &dyn EventSink, diagram: &str, flow_id: &str) -> Result<()> {
    let node = tree.find_mut(diagram)?;
    let removed = node
        .graph
        .find_edge(flow_id)
        .and_then(|f| RemovedFlow::capture(diagram, &node.graph, f))
        .ok_or_else(|| DfdError::item_not_found(flow_id, diagram))?;
    node.graph.remove_edge(flow_id);
    notify(sink, HierarchyEvent::item_removed(&removed.key.label, ItemType::Flow, diagram));

    let key = removed.key.clone();
    let parallel = node
        .graph
        .flows
        .iter()
        .any(|f| FlowKey::of(&node.graph, f).as_ref() == Some(&key));
    let mut removed_flows = vec![removed];
    if parallel {
        log::debug!("Flow '{}' still has a parallel flow in '{}'", key.label, diagram);
        return release_boundary_copies(tree, sink, removed_flows);
    }

    for name in find_all_occurrences(tree, &key.label, ItemType::Flow) {
        if name == diagram {
            continue;
        }
        let node = tree.find_mut(&name)?;
        let Some((other_id, other)) = node
            .graph
            .flows
            .iter()
            .filter_map(|f| RemovedFlow::capture(&name, &node.graph, f).map(|r| (f.id.clone(), r)))
            .find(|(_, r)| r.key == key)
        else {
            continue;
        };
        node.graph.remove_edge(&other_id);
        notify(sink, HierarchyEvent::item_removed(&key.label, ItemType::Flow, &name));
        removed_flows.push(other);
    }
    release_boundary_copies(tree, sink, removed_flows)
}

/// Drop required flows that a removed flow justified, deleting copies left with none
///
/// Copies removed here take their flows along, which are fed back into the
/// same worklist.
fn release_boundary_copies(tree: &mut HierarchyTree, sink: &dyn EventSink, removed: Vec<RemovedFlow>) -> Result<()> {
    let mut pending = removed;
    let mut visited: BTreeSet<(String, FlowKey)> = BTreeSet::new();

    while let Some(flow) = pending.pop() {
        if !visited.insert((flow.diagram.clone(), flow.key.clone())) {
            continue;
        }
        let Some(node) = tree.get(&flow.diagram) else {
            continue;
        };

        let key = &flow.key;
        let mut scopes = Vec::new();
        for (end, end_type, other, other_type) in [
            (&key.source, flow.source_type, &key.target, flow.target_type),
            (&key.target, flow.target_type, &key.source, flow.source_type),
        ] {
            if end_type == ItemType::Process && end != other && node.has_child(end) {
                scopes.push((end.clone(), other.clone(), other_type));
            }
        }

        for (scope, other, other_type) in scopes {
            for name in find_occurrences_below(tree, &scope, &other, other_type)? {
                if is_justified(tree, &name, &other, other_type, &key.label) {
                    continue;
                }
                pending.extend(forget_required_flow(tree, sink, &name, &other, other_type, &key.label)?);
            }
        }
    }
    Ok(())
}

/// Whether the parent of `diagram` still connects the item to `diagram`'s process by `flow_label`
fn is_justified(tree: &HierarchyTree, diagram: &str, label: &str, item_type: ItemType, flow_label: &str) -> bool {
    let Some(parent) = tree.find_parent_of(diagram) else {
        return false;
    };
    let graph = &parent.graph;
    let (Some(item), Some(process)) = (
        graph.find_node(label, item_type),
        graph.find_node(diagram, ItemType::Process),
    ) else {
        return false;
    };
    graph.flows_labeled(flow_label).any(|f| {
        (f.source == item.id && f.target == process.id) || (f.source == process.id && f.target == item.id)
    })
}

fn forget_required_flow(
    tree: &mut HierarchyTree,
    sink: &dyn EventSink,
    diagram: &str,
    label: &str,
    item_type: ItemType,
    flow_label: &str,
) -> Result<Vec<RemovedFlow>> {
    let node = tree.find_mut(diagram)?;
    let Some(copy) = node
        .graph
        .find_node_mut(label, item_type)
        .filter(|c| c.from_parent)
    else {
        return Ok(Vec::new());
    };
    if !copy.forget_required_flow(flow_label) || copy.has_required_flows() {
        return Ok(Vec::new());
    }

    let copy_id = copy.id.clone();
    let released: Vec<RemovedFlow> = node
        .graph
        .edges_of(&copy_id)
        .filter_map(|f| RemovedFlow::capture(diagram, &node.graph, f))
        .collect();
    node.graph.remove_node(&copy_id);
    log::debug!("Removed unjustified copy of {} '{}' from '{}'", item_type, label, diagram);
    notify(sink, HierarchyEvent::item_removed(label, item_type, diagram));
    Ok(released)
}
