//! Editing session over a DFD hierarchy
//!
//! [`DfdSession`] is the context object a UI layer drives. It owns the
//! hierarchy, tracks which diagram is being edited and turns edit intents
//! into propagation and renumbering passes. Every intent checks names and
//! types before touching the tree, so a rejected edit leaves no trace.

use std::collections::BTreeSet;

use crate::catalog::{self, DfdCatalog};
use crate::config::EngineConfig;
use crate::error::{DfdError, Result};
use crate::events::{notify, EventSink, HierarchyEvent};
use crate::hierarchy::{DiagramNode, HierarchyTree};
use crate::ids::IdAllocator;
use crate::propagation;
use crate::snapshot::{self, GraphCodec, TreeSnapshot, ZstdGraphCodec};
use crate::types::{DiagramGraph, FlowEdge, GraphItem, ItemId, ItemType};
use crate::validation::{self, ValidationIssue, ValidationReport};

/// A hierarchy being edited
pub struct DfdSession {
    tree: HierarchyTree,
    active: String,
    config: EngineConfig,
    ids: IdAllocator,
    sink: Box<dyn EventSink>,
}

impl DfdSession {
    /// Start a new hierarchy holding an empty Context diagram
    pub fn new(config: EngineConfig, sink: Box<dyn EventSink>) -> Result<Self> {
        let tree = HierarchyTree::with_root(&config.context_diagram_name)?;
        Ok(Self::with_tree(tree, config, sink))
    }

    /// Resume a hierarchy from a snapshot
    pub fn from_snapshot(
        config: EngineConfig,
        sink: Box<dyn EventSink>,
        snapshot: &TreeSnapshot,
        codec: &dyn GraphCodec,
    ) -> Result<Self> {
        let tree = snapshot::deserialize(snapshot, codec)?;
        Ok(Self::with_tree(tree, config, sink))
    }

    fn with_tree(tree: HierarchyTree, config: EngineConfig, sink: Box<dyn EventSink>) -> Self {
        let active = tree.root_name().unwrap_or_default().to_string();
        Self {
            tree,
            active,
            ids: IdAllocator::from_config(&config),
            config,
            sink,
        }
    }

    /// Snapshot the hierarchy for saving
    pub fn snapshot(&self, codec: &dyn GraphCodec) -> Result<TreeSnapshot> {
        snapshot::serialize(&self.tree, codec)
    }

    /// The compressed codec at the configured level
    pub fn zstd_codec(&self) -> ZstdGraphCodec {
        ZstdGraphCodec::new(self.config.compression_level)
    }

    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Name of the diagram being edited
    pub fn active_diagram(&self) -> &str {
        &self.active
    }

    /// Canonical graph of a diagram
    pub fn diagram(&self, name: &str) -> Result<&DiagramGraph> {
        Ok(&self.tree.find(name)?.graph)
    }

    /// Check out a diagram for editing
    ///
    /// The returned graph is a copy; edits made to it reach the hierarchy
    /// only through [`set_diagram`](Self::set_diagram).
    pub fn on_diagram_switch(&mut self, target: &str) -> Result<DiagramGraph> {
        let graph = self.tree.find(target)?.graph.clone();
        log::debug!("Switching from '{}' to '{}'", self.active, target);
        self.active = target.to_string();
        Ok(graph)
    }

    /// Check a diagram's graph back in
    pub fn set_diagram(&mut self, name: &str, graph: DiagramGraph) -> Result<()> {
        self.tree.find_mut(name)?.graph = graph;
        log::debug!("Stored graph of '{}'", name);
        Ok(())
    }

    /// Decompose `process` (a native process of `parent`) into its own diagram
    pub fn add_diagram(&mut self, process: &str, parent: &str) -> Result<()> {
        let item = self
            .tree
            .find(parent)?
            .graph
            .find_node(process, ItemType::Process)
            .filter(|p| !p.from_parent)
            .ok_or_else(|| DfdError::item_not_found(process, parent))?;
        let mut process_id = item.id_label.clone();
        if self.tree.contains(process) {
            return Err(DfdError::duplicate(process, process));
        }
        if process_id.is_none() {
            log::debug!("Process '{}' has no id yet, renumbering '{}'", process, parent);
            self.renumber(parent)?;
            process_id = self
                .tree
                .find(parent)?
                .graph
                .find_node(process, ItemType::Process)
                .and_then(|p| p.id_label.clone());
        }

        self.tree.insert(process, Some(parent), process_id.clone())?;
        notify(
            self.sink.as_ref(),
            HierarchyEvent::DiagramAdded {
                name: process.to_string(),
                parent: Some(parent.to_string()),
                process_id,
            },
        );
        let seeded = propagation::seed_decomposition(&mut self.tree, self.sink.as_ref(), parent, process)?;
        log::info!(
            "Decomposed '{}' in '{}' ({} boundary items)",
            process,
            parent,
            seeded
        );
        Ok(())
    }

    /// Drop a decomposition and everything below it
    ///
    /// The process stays in its parent diagram. The Context diagram can't be
    /// removed.
    pub fn remove_diagram(&mut self, name: &str) -> Result<DiagramNode> {
        let parent = self
            .tree
            .find_parent_of(name)
            .map(|p| p.name.clone())
            .ok_or_else(|| DfdError::NotFound(format!("parent of diagram '{}'", name)))?;
        let removed = self
            .tree
            .remove(name)
            .ok_or_else(|| DfdError::diagram_not_found(name))?;

        notify(
            self.sink.as_ref(),
            HierarchyEvent::DiagramRemoved {
                name: name.to_string(),
            },
        );
        if !self.tree.contains(&self.active) {
            self.active = parent;
        }
        log::info!("Removed diagram '{}'", name);
        Ok(removed)
    }

    /// Rename a diagram
    ///
    /// Below the root this renames the decomposed process everywhere, with
    /// the same checks as a label edit.
    pub fn rename_diagram(&mut self, name: &str, new_name: &str) -> Result<()> {
        if let Some(parent) = self.tree.find_parent_of(name).map(|p| p.name.clone()) {
            let process_id = self
                .tree
                .find(&parent)?
                .graph
                .find_node(name, ItemType::Process)
                .map(|p| p.id.clone())
                .ok_or_else(|| DfdError::item_not_found(name, &parent))?;
            return self.on_label_changed(&parent, &process_id, new_name);
        }

        self.tree.find(name)?;
        self.tree.rename(name, new_name)?;
        notify(
            self.sink.as_ref(),
            HierarchyEvent::DiagramRenamed {
                old_name: name.to_string(),
                new_name: new_name.to_string(),
            },
        );
        if self.active == name {
            self.active = new_name.to_string();
        }
        Ok(())
    }

    /// Add a node to a diagram
    ///
    /// Processes and datastores get the next positional id. Entities are
    /// added to every ancestor diagram as well.
    pub fn on_item_added(&mut self, item_type: ItemType, label: &str, diagram: &str) -> Result<ItemId> {
        if !item_type.is_node() {
            return Err(DfdError::InvalidCellType(item_type.to_string()));
        }
        let node = self.tree.find(diagram)?;
        validation::validate_new_label(&self.tree, diagram, item_type, label)?;

        let mut item = GraphItem::new(item_type, label);
        if item_type.has_id_label() {
            item.id_label = Some(
                self.ids
                    .next_id(node.process_id.as_deref(), item_type, &node.graph)?,
            );
        }
        let item_id = self.tree.find_mut(diagram)?.graph.insert_node(item);
        log::debug!("Added {} '{}' to '{}'", item_type, label, diagram);

        if item_type == ItemType::Entity {
            propagation::propagate_entity_add(
                &mut self.tree,
                self.sink.as_ref(),
                label,
                diagram,
                &mut BTreeSet::new(),
            )?;
        }
        Ok(item_id)
    }

    /// Delete a node or flow and every copy of it
    ///
    /// Identifiers in the diagrams that held the native item are recomputed.
    pub fn on_item_deleted(&mut self, diagram: &str, item_id: &str) -> Result<()> {
        let graph = &self.tree.find(diagram)?.graph;
        let renumber_scopes: Vec<String> = match graph.find_item(item_id) {
            Some(item) if item.item_type.has_id_label() => {
                validation::find_all_occurrences(&self.tree, &item.label, item.item_type)
                    .into_iter()
                    .filter(|name| {
                        self.tree
                            .get(name)
                            .and_then(|n| n.graph.find_node(&item.label, item.item_type))
                            .is_some_and(|native| !native.from_parent)
                    })
                    .collect()
            }
            Some(_) => Vec::new(),
            None if graph.find_edge(item_id).is_some() => Vec::new(),
            None => return Err(DfdError::item_not_found(item_id, diagram)),
        };

        propagation::propagate_delete(&mut self.tree, self.sink.as_ref(), diagram, item_id)?;
        for scope in renumber_scopes {
            if self.tree.contains(&scope) {
                self.renumber(&scope)?;
            }
        }
        if !self.tree.contains(&self.active) {
            self.active = self.tree.root_name().unwrap_or_default().to_string();
        }
        Ok(())
    }

    /// Rename a node or flow everywhere it appears
    ///
    /// The edit is checked first; on error nothing changes and the message
    /// says why.
    pub fn on_label_changed(&mut self, diagram: &str, item_id: &str, new_label: &str) -> Result<()> {
        if let Err(e) = validation::validate_label_change(&self.tree, diagram, item_id, new_label) {
            log::info!("Rejected label '{}' in '{}': {}", new_label, diagram, e);
            return Err(e);
        }

        let graph = &self.tree.find(diagram)?.graph;
        let (old_label, item_type) = match graph.find_edge(item_id) {
            Some(flow) => (flow.label.clone(), ItemType::Flow),
            None => {
                let item = graph
                    .find_item(item_id)
                    .ok_or_else(|| DfdError::item_not_found(item_id, diagram))?;
                (item.label.clone(), item.item_type)
            }
        };
        if old_label == new_label {
            return Ok(());
        }

        propagation::propagate_rename(&mut self.tree, self.sink.as_ref(), &old_label, new_label, item_type)?;
        if item_type == ItemType::Process && self.active == old_label {
            self.active = new_label.to_string();
        }
        Ok(())
    }

    /// Connect two items of a diagram with a named flow
    pub fn on_edge_added(&mut self, label: &str, source: &str, target: &str, diagram: &str) -> Result<ItemId> {
        let graph = &self.tree.find(diagram)?.graph;
        let source_label = graph
            .find_item(source)
            .ok_or_else(|| DfdError::item_not_found(source, diagram))?
            .label
            .clone();
        let target_label = graph
            .find_item(target)
            .ok_or_else(|| DfdError::item_not_found(target, diagram))?
            .label
            .clone();
        validation::validate_flow_label(&self.tree, diagram, label, &source_label, &target_label, None)?;

        let flow_id = self
            .tree
            .find_mut(diagram)?
            .graph
            .insert_edge(FlowEdge::new(label, source, target))?;
        log::debug!(
            "Added flow '{}' from '{}' to '{}' in '{}'",
            label,
            source_label,
            target_label,
            diagram
        );
        propagation::propagate_connection(&mut self.tree, self.sink.as_ref(), diagram, &flow_id)?;
        Ok(flow_id)
    }

    /// Remove a flow, releasing the boundary copies it justified
    pub fn on_edge_deleted(&mut self, diagram: &str, flow_id: &str) -> Result<()> {
        if self.tree.find(diagram)?.graph.find_edge(flow_id).is_none() {
            return Err(DfdError::item_not_found(flow_id, diagram));
        }
        propagation::propagate_delete(&mut self.tree, self.sink.as_ref(), diagram, flow_id)
    }

    /// Recompute positional ids in a diagram and below
    pub fn renumber(&mut self, diagram: &str) -> Result<()> {
        self.ids.renumber(&mut self.tree, diagram)?;
        notify(
            self.sink.as_ref(),
            HierarchyEvent::IdsRenumbered {
                diagram: diagram.to_string(),
            },
        );
        Ok(())
    }

    /// Per-diagram structural findings
    pub fn validate_diagram(&self, name: &str) -> Result<Vec<ValidationIssue>> {
        Ok(validation::validate_diagram(self.tree.find(name)?, &self.config))
    }

    /// Whole-tree validation, as run before export
    pub fn validate_all(&self) -> Result<ValidationReport> {
        validation::validate_tree(&self.tree, &self.config)
    }

    /// Native items of the whole hierarchy
    pub fn catalog(&self) -> DfdCatalog {
        catalog::collect_items(&self.tree)
    }
}
