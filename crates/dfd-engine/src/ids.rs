//! Positional identifiers for processes and datastores
//!
//! Identifiers are derived from tree position and sibling order, never
//! stored as content keys: the Context diagram's process is the root id,
//! processes below it are `{parent}.{n}` and datastores `D{parent}.{n}`.
//! Boundary copies don't count towards `n` because they are native to the
//! parent diagram, not to the one they are copied into.

use crate::config::{EngineConfig, IdStyle};
use crate::constants::ids;
use crate::error::{DfdError, Result};
use crate::hierarchy::HierarchyTree;
use crate::types::{DiagramGraph, ItemType};

/// An identifier written during a renumber pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedId {
    pub label: String,
    pub item_type: ItemType,
    pub id: String,
}

/// Computes and rewrites positional identifiers
#[derive(Debug, Clone)]
pub struct IdAllocator {
    root_id: String,
    style: IdStyle,
}

impl IdAllocator {
    pub fn new(root_id: impl Into<String>, style: IdStyle) -> Self {
        Self {
            root_id: root_id.into(),
            style,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.root_process_id.clone(), config.id_style)
    }

    /// The identifier of the Context diagram's process
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Identifier for a new item of `item_type` in the diagram whose process id is `parent_id`
    ///
    /// `parent_id` is `None` for the Context diagram.
    pub fn next_id(&self, parent_id: Option<&str>, item_type: ItemType, graph: &DiagramGraph) -> Result<String> {
        let n = graph
            .nodes_of_type(item_type)
            .filter(|item| !item.from_parent)
            .count()
            + 1;
        self.format_id(parent_id, n, item_type)
    }

    /// Format the `n`th (1-based) identifier of a type within a diagram
    pub fn format_id(&self, parent_id: Option<&str>, n: usize, item_type: ItemType) -> Result<String> {
        let prefix = match item_type {
            ItemType::Process => "",
            ItemType::Datastore => ids::DATASTORE_PREFIX,
            other => return Err(DfdError::InvalidCellType(other.to_string())),
        };

        let Some(parent_id) = parent_id else {
            return match item_type {
                ItemType::Datastore => Err(DfdError::RootDatastore),
                _ => Ok(self.root_id.clone()),
            };
        };

        if self.style == IdStyle::Compact && parent_id == self.root_id {
            Ok(format!("{}{}", prefix, n))
        } else {
            Ok(format!("{}{}{}{}", prefix, parent_id, ids::SEPARATOR, n))
        }
    }

    /// Rewrite contiguous identifiers for every native process and datastore in `graph`
    pub fn renumber_graph(&self, parent_id: Option<&str>, graph: &mut DiagramGraph) -> Result<Vec<AssignedId>> {
        let mut assigned = Vec::new();
        for item_type in [ItemType::Process, ItemType::Datastore] {
            let mut counter = 1;
            for item in graph
                .items
                .iter_mut()
                .filter(|i| i.item_type == item_type && !i.from_parent)
            {
                let id = self.format_id(parent_id, counter, item_type)?;
                item.id_label = Some(id.clone());
                assigned.push(AssignedId {
                    label: item.label.clone(),
                    item_type,
                    id,
                });
                counter += 1;
            }
        }
        Ok(assigned)
    }

    /// Renumber a diagram and, recursively, every decomposition below it
    ///
    /// New process ids are pushed into the decomposed processes' diagrams
    /// and into boundary copies of renumbered items further down.
    pub fn renumber(&self, tree: &mut HierarchyTree, diagram: &str) -> Result<()> {
        let node = tree.find_mut(diagram)?;
        let parent_id = node.process_id.clone();
        let assigned = self.renumber_graph(parent_id.as_deref(), &mut node.graph)?;
        log::debug!(
            "Renumbered {} items in '{}' under {:?}",
            assigned.len(),
            diagram,
            parent_id
        );

        let descendants: Vec<String> = tree.subtree_names(diagram)?.into_iter().skip(1).collect();
        for entry in &assigned {
            for name in &descendants {
                if let Some(copy) = tree
                    .get_mut(name)
                    .and_then(|n| n.graph.find_node_mut(&entry.label, entry.item_type))
                    .filter(|item| item.from_parent)
                {
                    copy.id_label = Some(entry.id.clone());
                }
            }
        }

        for entry in assigned.iter().filter(|e| e.item_type == ItemType::Process) {
            if let Some(child) = tree.get_mut(&entry.label) {
                child.process_id = Some(entry.id.clone());
                self.renumber(tree, &entry.label)?;
            }
        }
        Ok(())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
