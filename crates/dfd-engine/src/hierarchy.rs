//! Diagram hierarchy - one diagram per decomposed process
//!
//! The tree mirrors process decomposition: the root is the Context
//! diagram, and every other node is the diagram of the process it is named
//! after. Leaf processes have no node.
//!
//! The tree is the single owner of every diagram and its graph. Upward
//! traversal goes through [`HierarchyTree::find_parent_of`] instead of a
//! stored back-reference.

use std::collections::HashSet;

use crate::error::{DfdError, Result};
use crate::types::DiagramGraph;

/// A diagram in the hierarchy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramNode {
    /// Diagram name, unique across the tree (equals its process label)
    pub name: String,
    /// Identifier of the process this diagram decomposes, `None` at the root
    pub process_id: Option<String>,
    /// The per-level graph
    pub graph: DiagramGraph,
    /// Sub-diagrams in insertion order
    pub children: Vec<DiagramNode>,
}

impl DiagramNode {
    /// Create a diagram with an empty graph
    pub fn new(name: impl Into<String>, process_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            process_id,
            graph: DiagramGraph::new(),
            children: Vec::new(),
        }
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name == name)
    }
}

/// Tree of diagrams rooted at the Context diagram
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyTree {
    root: Option<DiagramNode>,
}

impl HierarchyTree {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hierarchy holding only a root diagram
    pub fn with_root(name: &str) -> Result<Self> {
        let mut tree = Self::new();
        tree.insert(name, None, None)?;
        Ok(tree)
    }

    pub fn root(&self) -> Option<&DiagramNode> {
        self.root.as_ref()
    }

    /// Name of the root diagram
    pub fn root_name(&self) -> Option<&str> {
        self.root.as_ref().map(|r| r.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of diagrams in the tree
    pub fn len(&self) -> usize {
        self.names().len()
    }

    /// Add a diagram under `parent`, or as the root when `parent` is `None`
    ///
    /// A tree holds one root; a second one is rejected.
    pub fn insert(&mut self, name: &str, parent: Option<&str>, process_id: Option<String>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DfdError::EmptyName);
        }
        if self.contains(name) {
            return Err(DfdError::duplicate(name, name));
        }

        let node = DiagramNode::new(name, process_id);
        match parent {
            None => {
                if let Some(root) = &self.root {
                    return Err(DfdError::duplicate(name, root.name.clone()));
                }
                self.root = Some(node);
            }
            Some(parent_name) => {
                self.find_mut(parent_name)?.children.push(node);
            }
        }
        log::debug!("Added diagram '{}' under {:?}", name, parent);
        Ok(())
    }

    /// Detach a diagram and its subtree; no-op if absent
    pub fn remove(&mut self, name: &str) -> Option<DiagramNode> {
        if self.root_name() == Some(name) {
            return self.root.take();
        }
        let root = self.root.as_mut()?;
        let removed = remove_from(root, name, &mut HashSet::new());
        if removed.is_some() {
            log::debug!("Removed diagram '{}' from hierarchy", name);
        }
        removed
    }

    /// Find a diagram by name (depth-first, children in insertion order)
    pub fn find(&self, name: &str) -> Result<&DiagramNode> {
        self.get(name).ok_or_else(|| DfdError::diagram_not_found(name))
    }

    /// Find a diagram by name (mutable)
    pub fn find_mut(&mut self, name: &str) -> Result<&mut DiagramNode> {
        self.get_mut(name).ok_or_else(|| DfdError::diagram_not_found(name))
    }

    /// Like [`find`](Self::find) but returns `None` when absent
    pub fn get(&self, name: &str) -> Option<&DiagramNode> {
        let root = self.root.as_ref()?;
        search(root, name, &mut HashSet::new())
    }

    /// Like [`find_mut`](Self::find_mut) but returns `None` when absent
    pub fn get_mut(&mut self, name: &str) -> Option<&mut DiagramNode> {
        let root = self.root.as_mut()?;
        search_mut(root, name, &mut HashSet::new())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rename a diagram
    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<()> {
        if new_name.trim().is_empty() {
            return Err(DfdError::EmptyName);
        }
        if name != new_name && self.contains(new_name) {
            return Err(DfdError::duplicate(new_name, new_name));
        }
        self.find_mut(name)?.name = new_name.to_string();
        log::debug!("Renamed diagram '{}' to '{}'", name, new_name);
        Ok(())
    }

    /// The diagram whose children contain `child`
    pub fn find_parent_of(&self, child: &str) -> Option<&DiagramNode> {
        let root = self.root.as_ref()?;
        search_parent(root, child, &mut HashSet::new())
    }

    /// Names from the parent of `name` up to the root
    pub fn ancestors(&self, name: &str) -> Result<Vec<String>> {
        self.find(name)?;
        let mut chain = Vec::new();
        let mut current = name.to_string();
        while let Some(parent) = self.find_parent_of(&current) {
            chain.push(parent.name.clone());
            current = parent.name.clone();
        }
        Ok(chain)
    }

    /// Names of a diagram and all its descendants, pre-order
    pub fn subtree_names(&self, name: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        collect_names(self.find(name)?, &mut names);
        Ok(names)
    }

    /// Every diagram name, pre-order
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(root) = &self.root {
            collect_names(root, &mut names);
        }
        names
    }
}

fn search<'a>(node: &'a DiagramNode, name: &str, visited: &mut HashSet<String>) -> Option<&'a DiagramNode> {
    if !visited.insert(node.name.clone()) {
        return None;
    }
    if node.name == name {
        return Some(node);
    }
    node.children.iter().find_map(|child| search(child, name, visited))
}

fn search_mut<'a>(
    node: &'a mut DiagramNode,
    name: &str,
    visited: &mut HashSet<String>,
) -> Option<&'a mut DiagramNode> {
    if !visited.insert(node.name.clone()) {
        return None;
    }
    if node.name == name {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|child| search_mut(child, name, visited))
}

fn search_parent<'a>(
    node: &'a DiagramNode,
    child: &str,
    visited: &mut HashSet<String>,
) -> Option<&'a DiagramNode> {
    if !visited.insert(node.name.clone()) {
        return None;
    }
    if node.has_child(child) {
        return Some(node);
    }
    node.children
        .iter()
        .find_map(|c| search_parent(c, child, visited))
}

fn remove_from(node: &mut DiagramNode, name: &str, visited: &mut HashSet<String>) -> Option<DiagramNode> {
    if !visited.insert(node.name.clone()) {
        return None;
    }
    if let Some(pos) = node.children.iter().position(|c| c.name == name) {
        return Some(node.children.remove(pos));
    }
    node.children
        .iter_mut()
        .find_map(|c| remove_from(c, name, visited))
}

fn collect_names(node: &DiagramNode, names: &mut Vec<String>) {
    names.push(node.name.clone());
    for child in &node.children {
        collect_names(child, names);
    }
}
