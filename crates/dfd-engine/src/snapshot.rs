//! Hierarchy snapshots for save and load
//!
//! A snapshot mirrors the tree: every diagram becomes a record with its
//! name, process id, encoded graph and child records. How a graph is
//! encoded is up to the [`GraphCodec`]; the engine treats the blob as
//! opaque.

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::error::{DfdError, Result};
use crate::hierarchy::{DiagramNode, HierarchyTree};
use crate::types::DiagramGraph;

/// Encodes a per-level graph to bytes and back
pub trait GraphCodec {
    fn encode(&self, graph: &DiagramGraph) -> Result<Vec<u8>>;
    fn decode(&self, blob: &[u8]) -> Result<DiagramGraph>;
}

/// Plain JSON encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphCodec;

impl GraphCodec for JsonGraphCodec {
    fn encode(&self, graph: &DiagramGraph) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(graph)?)
    }

    fn decode(&self, blob: &[u8]) -> Result<DiagramGraph> {
        Ok(serde_json::from_slice(blob)?)
    }
}

/// JSON compressed with zstd
///
/// Diagrams repeat labels and ids a lot, so compression pays off once a
/// hierarchy has more than a couple of levels.
#[derive(Debug, Clone, Copy)]
pub struct ZstdGraphCodec {
    level: i32,
}

impl ZstdGraphCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdGraphCodec {
    fn default() -> Self {
        Self::new(defaults::COMPRESSION_LEVEL)
    }
}

impl GraphCodec for ZstdGraphCodec {
    fn encode(&self, graph: &DiagramGraph) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(graph)?;
        zstd::encode_all(&json[..], self.level).map_err(|e| DfdError::Compression(e.to_string()))
    }

    fn decode(&self, blob: &[u8]) -> Result<DiagramGraph> {
        let json = zstd::decode_all(blob).map_err(|e| DfdError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Serialized form of one diagram and its sub-diagrams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub name: String,
    pub process_id: Option<String>,
    pub graph_blob: Vec<u8>,
    #[serde(default)]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of diagrams in this snapshot
    pub fn diagram_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeSnapshot::diagram_count)
            .sum::<usize>()
    }
}

/// Snapshot the whole hierarchy
pub fn serialize(tree: &HierarchyTree, codec: &dyn GraphCodec) -> Result<TreeSnapshot> {
    let root = tree
        .root()
        .ok_or_else(|| DfdError::NotFound("root diagram to serialize".to_string()))?;
    snapshot_node(root, codec)
}

fn snapshot_node(node: &DiagramNode, codec: &dyn GraphCodec) -> Result<TreeSnapshot> {
    Ok(TreeSnapshot {
        name: node.name.clone(),
        process_id: node.process_id.clone(),
        graph_blob: codec.encode(&node.graph)?,
        children: node
            .children
            .iter()
            .map(|child| snapshot_node(child, codec))
            .collect::<Result<Vec<_>>>()?,
    })
}

/// Rebuild a hierarchy from a snapshot
///
/// Diagrams go through [`HierarchyTree::insert`], so a snapshot with blank
/// or repeated names is rejected.
pub fn deserialize(snapshot: &TreeSnapshot, codec: &dyn GraphCodec) -> Result<HierarchyTree> {
    let mut tree = HierarchyTree::new();
    restore_node(&mut tree, snapshot, None, codec)?;
    log::info!(
        "Loaded hierarchy '{}' with {} diagrams",
        snapshot.name,
        tree.len()
    );
    Ok(tree)
}

fn restore_node(
    tree: &mut HierarchyTree,
    snapshot: &TreeSnapshot,
    parent: Option<&str>,
    codec: &dyn GraphCodec,
) -> Result<()> {
    let graph = codec.decode(&snapshot.graph_blob)?;
    tree.insert(&snapshot.name, parent, snapshot.process_id.clone())?;
    tree.find_mut(&snapshot.name)?.graph = graph;
    for child in &snapshot.children {
        restore_node(tree, child, Some(&snapshot.name), codec)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlowEdge, GraphItem, ItemType};

    fn make_tree() -> HierarchyTree {
        let mut tree = HierarchyTree::with_root("Context diagram").unwrap();
        {
            let graph = &mut tree.find_mut("Context diagram").unwrap().graph;
            let customer = graph.insert_node(GraphItem::new(ItemType::Entity, "Customer"));
            let system = graph.insert_node(GraphItem::new(ItemType::Process, "Order System").with_id_label("0"));
            graph
                .insert_edge(FlowEdge::new("Order", customer, system))
                .unwrap();
        }
        tree.insert("Order System", Some("Context diagram"), Some("0".into()))
            .unwrap();
        {
            let graph = &mut tree.find_mut("Order System").unwrap().graph;
            let mut copy = GraphItem::new(ItemType::Entity, "Customer");
            copy.from_parent = true;
            copy.required_inflows.insert("Order".to_string());
            graph.insert_node(copy);
            graph.insert_node(GraphItem::new(ItemType::Datastore, "Orders").with_id_label("D0.1"));
        }
        tree
    }

    #[test]
    fn test_round_trip_json() {
        let tree = make_tree();
        let snapshot = serialize(&tree, &JsonGraphCodec).unwrap();
        assert_eq!(snapshot.diagram_count(), 2);
        assert_eq!(snapshot.children[0].process_id.as_deref(), Some("0"));

        let restored = deserialize(&snapshot, &JsonGraphCodec).unwrap();
        assert_eq!(restored, tree);
        let copy = restored
            .find("Order System")
            .unwrap()
            .graph
            .find_node("Customer", ItemType::Entity)
            .unwrap();
        assert!(copy.from_parent);
        assert!(copy.required_inflows.contains("Order"));
    }

    #[test]
    fn test_round_trip_zstd_through_json_text() {
        let tree = make_tree();
        let codec = ZstdGraphCodec::default();
        let text = serialize(&tree, &codec).unwrap().to_json().unwrap();
        assert!(text.contains("\"graphBlob\""));

        let snapshot = TreeSnapshot::from_json(&text).unwrap();
        assert_eq!(deserialize(&snapshot, &codec).unwrap(), tree);
    }

    #[test]
    fn test_wrong_codec_fails() {
        let snapshot = serialize(&make_tree(), &ZstdGraphCodec::default()).unwrap();
        assert!(matches!(
            deserialize(&snapshot, &JsonGraphCodec),
            Err(DfdError::Serialization(_))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut snapshot = serialize(&make_tree(), &JsonGraphCodec).unwrap();
        let child = snapshot.children[0].clone();
        snapshot.children.push(child);
        assert!(matches!(
            deserialize(&snapshot, &JsonGraphCodec),
            Err(DfdError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_empty_tree_has_nothing_to_serialize() {
        assert!(matches!(
            serialize(&HierarchyTree::new(), &JsonGraphCodec),
            Err(DfdError::NotFound(_))
        ));
    }
}
