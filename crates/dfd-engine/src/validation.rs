//! Naming and structural validation for leveled DFDs
//!
//! Naming rules run before a label edit is committed and reject it with a
//! [`DfdError`]. Structural rules only report: a diagram may sit in an
//! invalid state while it is being edited, and the findings come back as
//! [`ValidationIssue`]s when validation is asked for.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::EngineConfig;
use crate::error::{DfdError, Result};
use crate::hierarchy::{DiagramNode, HierarchyTree};
use crate::types::{GraphItem, ItemType};

/// Direction of a boundary flow, seen from the decomposed process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    /// Enters the decomposed process
    Inflow,
    /// Leaves the decomposed process
    Outflow,
}

impl std::fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inflow => write!(f, "inflow"),
            Self::Outflow => write!(f, "outflow"),
        }
    }
}

/// Structural finding with location context
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// A node has no incident flow
    UnconnectedItem {
        diagram: String,
        label: String,
        item_type: ItemType,
    },
    /// A flow connects two item types that must go through a process
    IllegalFlow {
        diagram: String,
        flow: String,
        source_type: ItemType,
        target_type: ItemType,
    },
    /// A flow references an item that isn't in the diagram
    DanglingFlow {
        diagram: String,
        flow: String,
        endpoint: String,
    },
    /// A boundary copy lacks a flow its parent connection requires
    MissingBoundaryFlow {
        diagram: String,
        item: String,
        flow: String,
        direction: FlowDirection,
    },
    /// A boundary copy has a flow its parent connection doesn't account for
    UnexpectedBoundaryFlow {
        diagram: String,
        item: String,
        flow: String,
        direction: FlowDirection,
    },
    /// A process has no inbound flow
    ProcessWithoutInflow { diagram: String, label: String },
    /// A process has no outbound flow
    ProcessWithoutOutflow { diagram: String, label: String },
    /// The Context diagram doesn't hold exactly one process
    ContextProcessCount { diagram: String, found: usize },
    /// No entity in the Context diagram sends data
    ContextMissingSource { diagram: String },
    /// No entity in the Context diagram receives data
    ContextMissingSink { diagram: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnconnectedItem {
                diagram,
                label,
                item_type,
            } => {
                write!(
                    f,
                    "{}: {} '{}' needs to be connected with a flow",
                    diagram, item_type, label
                )
            }
            Self::IllegalFlow {
                diagram,
                flow,
                source_type,
                target_type,
            } => {
                write!(
                    f,
                    "{}: flow '{}' can't move data directly from a {} to a {}, it must be moved by a process",
                    diagram, flow, source_type, target_type
                )
            }
            Self::DanglingFlow {
                diagram,
                flow,
                endpoint,
            } => {
                write!(
                    f,
                    "{}: flow '{}' references unknown item '{}'",
                    diagram, flow, endpoint
                )
            }
            Self::MissingBoundaryFlow {
                diagram,
                item,
                flow,
                direction,
            } => {
                write!(
                    f,
                    "{}: '{}' is missing the {} '{}' required by the parent diagram",
                    diagram, item, direction, flow
                )
            }
            Self::UnexpectedBoundaryFlow {
                diagram,
                item,
                flow,
                direction,
            } => {
                write!(
                    f,
                    "{}: '{}' has an {} '{}' that the parent diagram doesn't have",
                    diagram, item, direction, flow
                )
            }
            Self::ProcessWithoutInflow { diagram, label } => {
                write!(f, "{}: process '{}' must have at least one in flow of data", diagram, label)
            }
            Self::ProcessWithoutOutflow { diagram, label } => {
                write!(f, "{}: process '{}' must have at least one out flow of data", diagram, label)
            }
            Self::ContextProcessCount { diagram, found } => {
                write!(f, "{}: must contain exactly one process, found {}", diagram, found)
            }
            Self::ContextMissingSource { diagram } => {
                write!(f, "{}: needs at least one entity acting as a source of data", diagram)
            }
            Self::ContextMissingSink { diagram } => {
                write!(f, "{}: needs at least one entity acting as a sink of data", diagram)
            }
        }
    }
}

impl std::error::Error for ValidationIssue {}

/// Collected structural findings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Human-readable reasons, one per issue
    pub fn reasons(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.to_string()).collect()
    }

    /// Convert into a [`DfdError::StructuralViolation`] when anything was found
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DfdError::StructuralViolation {
                reasons: self.reasons(),
            })
        }
    }
}

/// Names of every diagram holding an item of `item_type` labelled `label`
pub fn find_all_occurrences(tree: &HierarchyTree, label: &str, item_type: ItemType) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    if let Some(root) = tree.root() {
        collect_occurrences(root, label, item_type, &mut HashSet::new(), &mut found);
    }
    found
}

/// Like [`find_all_occurrences`] but limited to the subtree rooted at `diagram`
pub fn find_occurrences_below(
    tree: &HierarchyTree,
    diagram: &str,
    label: &str,
    item_type: ItemType,
) -> Result<BTreeSet<String>> {
    let mut found = BTreeSet::new();
    collect_occurrences(tree.find(diagram)?, label, item_type, &mut HashSet::new(), &mut found);
    Ok(found)
}

fn collect_occurrences(
    node: &DiagramNode,
    label: &str,
    item_type: ItemType,
    visited: &mut HashSet<String>,
    found: &mut BTreeSet<String>,
) {
    if !visited.insert(node.name.clone()) {
        return;
    }
    if node.graph.contains(label, item_type) {
        found.insert(node.name.clone());
    }
    for child in &node.children {
        collect_occurrences(child, label, item_type, visited, found);
    }
}

/// Check the label of an item about to be created in `diagram`
pub fn validate_new_label(tree: &HierarchyTree, diagram: &str, item_type: ItemType, label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(DfdError::EmptyName);
    }
    match item_type {
        ItemType::Process | ItemType::Datastore => check_globally_unique(tree, label, item_type),
        ItemType::Entity => {
            if tree.find(diagram)?.graph.contains(label, ItemType::Entity) {
                return Err(DfdError::duplicate(label, diagram));
            }
            Ok(())
        }
        // Flows are checked with their endpoints, see `validate_flow_label`
        ItemType::Flow => Ok(()),
    }
}

/// Check a label edit on an existing item before it is committed
pub fn validate_label_change(tree: &HierarchyTree, diagram: &str, item_id: &str, new_label: &str) -> Result<()> {
    if new_label.trim().is_empty() {
        return Err(DfdError::EmptyName);
    }
    let graph = &tree.find(diagram)?.graph;

    if let Some(flow) = graph.find_edge(item_id) {
        if flow.label == new_label {
            return Ok(());
        }
        let (source, target) = graph
            .endpoints(flow)
            .ok_or_else(|| DfdError::item_not_found(item_id, diagram))?;
        return validate_flow_label(tree, diagram, new_label, &source.label, &target.label, Some(item_id));
    }

    let item = graph
        .find_item(item_id)
        .ok_or_else(|| DfdError::item_not_found(item_id, diagram))?;
    if item.label == new_label {
        return Ok(());
    }
    match item.item_type {
        ItemType::Process | ItemType::Datastore => check_globally_unique(tree, new_label, item.item_type),
        _ => {
            // Entities may repeat across the tree, but the rename must not
            // collide with another entity in a diagram that holds this one.
            for name in find_all_occurrences(tree, &item.label, ItemType::Entity) {
                if tree.find(&name)?.graph.contains(new_label, ItemType::Entity) {
                    return Err(DfdError::duplicate(new_label, name));
                }
            }
            Ok(())
        }
    }
}

fn check_globally_unique(tree: &HierarchyTree, label: &str, item_type: ItemType) -> Result<()> {
    if let Some(conflict) = find_all_occurrences(tree, label, item_type).into_iter().next() {
        return Err(DfdError::duplicate(label, conflict));
    }
    // A process label names its diagram once decomposed
    if item_type == ItemType::Process && tree.contains(label) {
        return Err(DfdError::duplicate(label, label));
    }
    Ok(())
}

/// Check a flow label against every same-named flow in the tree
///
/// A name may repeat when the other flow has the same source, or when it is
/// the same data leaving a decomposed process: both flows share a target and
/// the other flow's source is a process whose decomposition contains this
/// one (or the other way round).
pub fn validate_flow_label(
    tree: &HierarchyTree,
    diagram: &str,
    label: &str,
    source_label: &str,
    target_label: &str,
    exclude_flow: Option<&str>,
) -> Result<()> {
    if label.trim().is_empty() {
        return Err(DfdError::EmptyName);
    }

    let chain = lineage(tree, diagram)?;
    for occurrence in find_all_occurrences(tree, label, ItemType::Flow) {
        let graph = &tree.find(&occurrence)?.graph;
        let occurrence_chain = lineage(tree, &occurrence)?;

        for flow in graph.flows_labeled(label) {
            if occurrence == diagram && exclude_flow == Some(flow.id.as_str()) {
                continue;
            }
            let Some((source, target)) = graph.endpoints(flow) else {
                continue;
            };

            let is_same_source = source.label == source_label;
            let is_returning_flow = target.label == target_label
                && if chain[1..].contains(&occurrence) {
                    chain.contains(&source.label)
                } else if occurrence_chain[1..].iter().any(|n| n == diagram) {
                    occurrence_chain.iter().any(|n| n == source_label)
                } else {
                    false
                };

            if !is_same_source && !is_returning_flow {
                log::debug!(
                    "Flow name '{}' in '{}' clashes with flow from '{}' in '{}'",
                    label,
                    diagram,
                    source.label,
                    occurrence
                );
                return Err(DfdError::duplicate(label, occurrence));
            }
        }
    }
    Ok(())
}

/// `diagram` followed by its ancestors up to the root
fn lineage(tree: &HierarchyTree, diagram: &str) -> Result<Vec<String>> {
    let mut chain = vec![diagram.to_string()];
    chain.extend(tree.ancestors(diagram)?);
    Ok(chain)
}

/// Check the per-diagram structural rules
pub fn validate_diagram(node: &DiagramNode, config: &EngineConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    validate_flow_references(node, &mut issues);
    validate_connections(node, &mut issues);
    validate_flow_types(node, &mut issues);
    validate_boundary_copies(node, &mut issues);
    if config.require_process_io {
        validate_process_io(node, &mut issues);
    }

    issues
}

/// Check the whole tree: Context diagram shape plus every diagram's rules
pub fn validate_tree(tree: &HierarchyTree, config: &EngineConfig) -> Result<ValidationReport> {
    let root = tree
        .root()
        .ok_or_else(|| DfdError::NotFound("Context diagram".to_string()))?;
    let mut report = ValidationReport::default();

    validate_context_shape(root, &mut report.issues);
    let mut visited = HashSet::new();
    validate_subtree(root, config, &mut visited, &mut report.issues);

    log::info!(
        "Validated {} diagrams, {} issues",
        visited.len(),
        report.issues.len()
    );
    Ok(report)
}

fn validate_subtree(
    node: &DiagramNode,
    config: &EngineConfig,
    visited: &mut HashSet<String>,
    issues: &mut Vec<ValidationIssue>,
) {
    if !visited.insert(node.name.clone()) {
        return;
    }
    issues.extend(validate_diagram(node, config));
    for child in &node.children {
        validate_subtree(child, config, visited, issues);
    }
}

fn validate_context_shape(root: &DiagramNode, issues: &mut Vec<ValidationIssue>) {
    let graph = &root.graph;
    let processes = graph.nodes_of_type(ItemType::Process).count();
    if processes != 1 {
        issues.push(ValidationIssue::ContextProcessCount {
            diagram: root.name.clone(),
            found: processes,
        });
    }

    let is_entity = |id: &str| {
        graph
            .find_item(id)
            .is_some_and(|i| i.item_type == ItemType::Entity)
    };
    if !graph.flows.iter().any(|f| is_entity(&f.source)) {
        issues.push(ValidationIssue::ContextMissingSource {
            diagram: root.name.clone(),
        });
    }
    if !graph.flows.iter().any(|f| is_entity(&f.target)) {
        issues.push(ValidationIssue::ContextMissingSink {
            diagram: root.name.clone(),
        });
    }
}

/// Check that all flow endpoints exist
fn validate_flow_references(node: &DiagramNode, issues: &mut Vec<ValidationIssue>) {
    for flow in &node.graph.flows {
        for endpoint in [&flow.source, &flow.target] {
            if node.graph.find_item(endpoint).is_none() {
                issues.push(ValidationIssue::DanglingFlow {
                    diagram: node.name.clone(),
                    flow: flow.label.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
    }
}

/// Every node needs at least one flow
fn validate_connections(node: &DiagramNode, issues: &mut Vec<ValidationIssue>) {
    for item in node.graph.nodes() {
        if node.graph.edges_of(&item.id).next().is_none() {
            issues.push(ValidationIssue::UnconnectedItem {
                diagram: node.name.clone(),
                label: item.label.clone(),
                item_type: item.item_type,
            });
        }
    }
}

/// Entity-entity and datastore-entity flows must go through a process
fn validate_flow_types(node: &DiagramNode, issues: &mut Vec<ValidationIssue>) {
    for flow in &node.graph.flows {
        let Some((source, target)) = node.graph.endpoints(flow) else {
            continue;
        };
        let illegal = matches!(
            (source.item_type, target.item_type),
            (ItemType::Entity, ItemType::Entity)
                | (ItemType::Datastore, ItemType::Entity)
                | (ItemType::Entity, ItemType::Datastore)
        );
        if illegal {
            issues.push(ValidationIssue::IllegalFlow {
                diagram: node.name.clone(),
                flow: flow.label.clone(),
                source_type: source.item_type,
                target_type: target.item_type,
            });
        }
    }
}

/// Live flows on a boundary copy must match its required flows exactly
fn validate_boundary_copies(node: &DiagramNode, issues: &mut Vec<ValidationIssue>) {
    for item in node.graph.nodes().filter(|i| i.is_boundary_copy()) {
        let (inflows, outflows) = realized_flows(node, item);
        compare_flows(node, item, FlowDirection::Inflow, &item.required_inflows, &inflows, issues);
        compare_flows(node, item, FlowDirection::Outflow, &item.required_outflows, &outflows, issues);
    }
}

/// Labels of live flows on a boundary copy, counted per label
///
/// Inflows are flows the copy sends into the diagram, outflows the ones it
/// receives.
pub fn realized_flows(node: &DiagramNode, item: &GraphItem) -> (BTreeMap<String, usize>, BTreeMap<String, usize>) {
    let mut inflows = BTreeMap::new();
    let mut outflows = BTreeMap::new();
    for flow in node.graph.edges_of(&item.id) {
        let bucket = if flow.source == item.id {
            &mut inflows
        } else {
            &mut outflows
        };
        *bucket.entry(flow.label.clone()).or_insert(0) += 1;
    }
    (inflows, outflows)
}

fn compare_flows(
    node: &DiagramNode,
    item: &GraphItem,
    direction: FlowDirection,
    required: &BTreeSet<String>,
    realized: &BTreeMap<String, usize>,
    issues: &mut Vec<ValidationIssue>,
) {
    for flow in required.iter().filter(|f| !realized.contains_key(*f)) {
        issues.push(ValidationIssue::MissingBoundaryFlow {
            diagram: node.name.clone(),
            item: item.label.clone(),
            flow: flow.clone(),
            direction,
        });
    }
    for (flow, count) in realized {
        let expected = usize::from(required.contains(flow));
        for _ in expected..*count {
            issues.push(ValidationIssue::UnexpectedBoundaryFlow {
                diagram: node.name.clone(),
                item: item.label.clone(),
                flow: flow.clone(),
                direction,
            });
        }
    }
}

fn validate_process_io(node: &DiagramNode, issues: &mut Vec<ValidationIssue>) {
    for process in node.graph.nodes_of_type(ItemType::Process) {
        let flows: Vec<_> = node.graph.edges_of(&process.id).collect();
        if !flows.iter().any(|f| f.target == process.id) {
            issues.push(ValidationIssue::ProcessWithoutInflow {
                diagram: node.name.clone(),
                label: process.label.clone(),
            });
        }
        if !flows.iter().any(|f| f.source == process.id) {
            issues.push(ValidationIssue::ProcessWithoutOutflow {
                diagram: node.name.clone(),
                label: process.label.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiagramGraph, FlowEdge};

    fn item(graph: &mut DiagramGraph, item_type: ItemType, label: &str) -> String {
        graph.insert_node(GraphItem::new(item_type, label))
    }

    fn flow(graph: &mut DiagramGraph, label: &str, source: &str, target: &str) -> String {
        graph.insert_edge(FlowEdge::new(label, source, target)).unwrap()
    }

    /// Context diagram: Customer -> Order System -> Warehouse, decomposed once
    fn make_tree() -> HierarchyTree {
        let mut tree = HierarchyTree::with_root("Context diagram").unwrap();
        {
            let graph = &mut tree.find_mut("Context diagram").unwrap().graph;
            let customer = item(graph, ItemType::Entity, "Customer");
            let system = item(graph, ItemType::Process, "Order System");
            let warehouse = item(graph, ItemType::Entity, "Warehouse");
            flow(graph, "Order", &customer, &system);
            flow(graph, "Pick List", &system, &warehouse);
        }
        tree.insert("Order System", Some("Context diagram"), Some("0".into()))
            .unwrap();
        tree
    }

    fn boundary_copy(label: &str, inflows: &[&str], outflows: &[&str]) -> GraphItem {
        let mut copy = GraphItem::new(ItemType::Entity, label);
        copy.from_parent = true;
        copy.required_inflows = inflows.iter().map(|s| s.to_string()).collect();
        copy.required_outflows = outflows.iter().map(|s| s.to_string()).collect();
        copy
    }

    #[test]
    fn test_find_all_occurrences() {
        let mut tree = make_tree();
        item(
            &mut tree.find_mut("Order System").unwrap().graph,
            ItemType::Entity,
            "Customer",
        );
        let found = find_all_occurrences(&tree, "Customer", ItemType::Entity);
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["Context diagram", "Order System"]
        );
        assert!(find_all_occurrences(&tree, "Customer", ItemType::Process).is_empty());
        assert_eq!(find_all_occurrences(&tree, "Order", ItemType::Flow).len(), 1);
    }

    #[test]
    fn test_process_names_are_globally_unique() {
        let tree = make_tree();
        let err = validate_new_label(&tree, "Order System", ItemType::Process, "Order System").unwrap_err();
        match err {
            DfdError::DuplicateName { name, diagram } => {
                assert_eq!(name, "Order System");
                assert_eq!(diagram, "Context diagram");
            }
            other => panic!("Expected DuplicateName, got {other:?}"),
        }
        assert!(validate_new_label(&tree, "Order System", ItemType::Process, "Check Stock").is_ok());
        assert!(matches!(
            validate_new_label(&tree, "Order System", ItemType::Datastore, ""),
            Err(DfdError::EmptyName)
        ));
    }

    #[test]
    fn test_entity_names_may_repeat_across_diagrams() {
        let tree = make_tree();
        assert!(validate_new_label(&tree, "Order System", ItemType::Entity, "Customer").is_ok());
        assert!(validate_new_label(&tree, "Context diagram", ItemType::Entity, "Customer").is_err());
    }

    #[test]
    fn test_flow_name_rules() {
        let mut tree = make_tree();
        {
            let graph = &mut tree.find_mut("Order System").unwrap().graph;
            item(graph, ItemType::Process, "Take Order");
            item(graph, ItemType::Process, "Pick");
        }

        // Same source as the Context diagram flow
        assert!(validate_flow_label(&tree, "Order System", "Order", "Customer", "Take Order", None).is_ok());
        // Echo of the flow leaving the decomposed process
        assert!(validate_flow_label(&tree, "Order System", "Pick List", "Pick", "Warehouse", None).is_ok());
        // Unrelated reuse
        let err = validate_flow_label(&tree, "Order System", "Order", "Take Order", "Pick", None).unwrap_err();
        assert!(matches!(err, DfdError::DuplicateName { diagram, .. } if diagram == "Context diagram"));
    }

    #[test]
    fn test_flow_echo_from_parent_into_decomposition() {
        let mut tree = make_tree();
        {
            let graph = &mut tree.find_mut("Order System").unwrap().graph;
            let pick = item(graph, ItemType::Process, "Pick");
            let warehouse = item(graph, ItemType::Entity, "Warehouse");
            flow(graph, "Stock Query", &pick, &warehouse);
        }
        // Adding the same name one level up, touching the decomposed process
        assert!(validate_flow_label(&tree, "Context diagram", "Stock Query", "Order System", "Warehouse", None).is_ok());
        assert!(validate_flow_label(&tree, "Context diagram", "Stock Query", "Customer", "Warehouse", None).is_err());
    }

    #[test]
    fn test_label_change_on_existing_items() {
        let tree = make_tree();
        let graph = &tree.find("Context diagram").unwrap().graph;
        let system = graph.find_node("Order System", ItemType::Process).unwrap().id.clone();
        let customer = graph.find_node("Customer", ItemType::Entity).unwrap().id.clone();

        assert!(validate_label_change(&tree, "Context diagram", &system, "Order System").is_ok());
        assert!(validate_label_change(&tree, "Context diagram", &system, "Sales").is_ok());
        assert!(matches!(
            validate_label_change(&tree, "Context diagram", &customer, "Warehouse"),
            Err(DfdError::DuplicateName { .. })
        ));
        assert!(matches!(
            validate_label_change(&tree, "Context diagram", "item-missing", "X"),
            Err(DfdError::NotFound(_))
        ));
    }

    #[test]
    fn test_valid_tree() {
        let tree = make_tree();
        let report = validate_tree(&tree, &EngineConfig::default()).unwrap();
        assert!(report.is_valid(), "{:?}", report.issues);
    }

    #[test]
    fn test_context_shape() {
        let mut tree = HierarchyTree::with_root("Context diagram").unwrap();
        item(
            &mut tree.find_mut("Context diagram").unwrap().graph,
            ItemType::Entity,
            "Customer",
        );
        let report = validate_tree(&tree, &EngineConfig::default()).unwrap();
        assert!(report.issues.contains(&ValidationIssue::ContextProcessCount {
            diagram: "Context diagram".into(),
            found: 0,
        }));
        assert!(report.issues.contains(&ValidationIssue::ContextMissingSource {
            diagram: "Context diagram".into(),
        }));
        assert!(report.issues.contains(&ValidationIssue::ContextMissingSink {
            diagram: "Context diagram".into(),
        }));
        assert!(matches!(
            report.into_result(),
            Err(DfdError::StructuralViolation { reasons }) if reasons.len() == 4
        ));
    }

    #[test]
    fn test_illegal_flows_and_unconnected_items() {
        let mut node = DiagramNode::new("Sub", Some("0".into()));
        let a = item(&mut node.graph, ItemType::Entity, "A");
        let b = item(&mut node.graph, ItemType::Entity, "B");
        let store = item(&mut node.graph, ItemType::Datastore, "Store");
        item(&mut node.graph, ItemType::Process, "Idle");
        flow(&mut node.graph, "Direct", &a, &b);
        flow(&mut node.graph, "Dump", &store, &b);

        let issues = validate_diagram(&node, &EngineConfig::default());
        let illegal = issues
            .iter()
            .filter(|i| matches!(i, ValidationIssue::IllegalFlow { .. }))
            .count();
        assert_eq!(illegal, 2);
        assert!(issues.contains(&ValidationIssue::UnconnectedItem {
            diagram: "Sub".into(),
            label: "Idle".into(),
            item_type: ItemType::Process,
        }));
    }

    #[test]
    fn test_boundary_copy_balance() {
        let mut node = DiagramNode::new("Order System", Some("0".into()));
        let customer = node.graph.insert_node(boundary_copy("Customer", &["Order"], &["Receipt"]));
        let take = item(&mut node.graph, ItemType::Process, "Take Order");
        flow(&mut node.graph, "Order", &customer, &take);
        flow(&mut node.graph, "Complaint", &customer, &take);

        let issues = validate_diagram(&node, &EngineConfig::default());
        assert!(issues.contains(&ValidationIssue::MissingBoundaryFlow {
            diagram: "Order System".into(),
            item: "Customer".into(),
            flow: "Receipt".into(),
            direction: FlowDirection::Outflow,
        }));
        assert!(issues.contains(&ValidationIssue::UnexpectedBoundaryFlow {
            diagram: "Order System".into(),
            item: "Customer".into(),
            flow: "Complaint".into(),
            direction: FlowDirection::Inflow,
        }));

        flow(&mut node.graph, "Receipt", &take, &customer);
        let (inflows, outflows) = realized_flows(&node, node.graph.find_item(&customer).unwrap());
        assert_eq!(inflows.len(), 2);
        assert_eq!(outflows.get("Receipt"), Some(&1));
    }

    #[test]
    fn test_duplicate_boundary_flow_counts_as_extra() {
        let mut node = DiagramNode::new("Order System", Some("0".into()));
        let customer = node.graph.insert_node(boundary_copy("Customer", &["Order"], &[]));
        let take = item(&mut node.graph, ItemType::Process, "Take Order");
        flow(&mut node.graph, "Order", &customer, &take);
        flow(&mut node.graph, "Order", &customer, &take);

        let issues = validate_diagram(&node, &EngineConfig::default());
        assert_eq!(
            issues
                .iter()
                .filter(|i| matches!(i, ValidationIssue::UnexpectedBoundaryFlow { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_process_io_rule_is_optional() {
        let mut node = DiagramNode::new("Sub", Some("0".into()));
        let source = item(&mut node.graph, ItemType::Entity, "Source");
        let process = item(&mut node.graph, ItemType::Process, "Sink Only");
        flow(&mut node.graph, "Data", &source, &process);

        assert!(validate_diagram(&node, &EngineConfig::default()).is_empty());
        let strict = EngineConfig {
            require_process_io: true,
            ..EngineConfig::default()
        };
        assert_eq!(
            validate_diagram(&node, &strict),
            vec![ValidationIssue::ProcessWithoutOutflow {
                diagram: "Sub".into(),
                label: "Sink Only".into(),
            }]
        );
    }
}
