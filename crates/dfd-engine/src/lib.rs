//! DFD Engine - Hierarchy consistency for leveled data flow diagrams
//!
//! A leveled DFD starts from a Context diagram (one process plus the
//! external entities around it). Any process can be decomposed into its own
//! diagram, and that diagram's boundary has to stay balanced with the
//! connections the process has one level up. This crate keeps that tree of
//! per-level graphs consistent:
//!
//! - Hierarchy tree of diagrams, one per decomposed process
//! - Positional process/datastore identifiers (`0`, `0.1`, `D0.1`, ...)
//! - Propagation of entities and boundary copies across levels
//! - Naming checks and structural (leveling balance) validation
//! - Snapshot encoding through a pluggable per-level graph codec
//!
//! # Architecture
//!
//! The engine never renders and never performs I/O. A UI layer drives it
//! through [`DfdSession`], which owns the canonical graph of every diagram.
//! The diagram being edited is checked out with
//! [`DfdSession::on_diagram_switch`] and checked back in with
//! [`DfdSession::set_diagram`].
//!
//! # Example
//!
//! ```ignore
//! use dfd_engine::{DfdSession, EngineConfig, ItemType, NullEventSink};
//!
//! let mut session = DfdSession::new(EngineConfig::default(), Box::new(NullEventSink))?;
//! let context = session.active_diagram().to_string();
//! let process = session.on_item_added(ItemType::Process, "Order System", &context)?;
//! let customer = session.on_item_added(ItemType::Entity, "Customer", &context)?;
//! session.on_edge_added("Order", &customer, &process, &context)?;
//! session.add_diagram("Order System", &context)?;
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod ids;
pub mod propagation;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod validation;

// Re-export key types
pub use catalog::DfdCatalog;
pub use config::{EngineConfig, IdStyle};
pub use error::{DfdError, Result};
pub use events::{EventSink, HierarchyEvent, NullEventSink, VecEventSink};
pub use hierarchy::{DiagramNode, HierarchyTree};
pub use session::DfdSession;
pub use snapshot::{GraphCodec, JsonGraphCodec, TreeSnapshot, ZstdGraphCodec};
pub use types::{DiagramGraph, FlowEdge, GraphItem, ItemId, ItemType};
pub use validation::{ValidationIssue, ValidationReport};
