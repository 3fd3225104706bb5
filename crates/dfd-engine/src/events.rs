//! Hierarchy change notifications
//!
//! Events are sent from the engine to the UI layer (or any consumer) so it
//! can mirror changes it didn't make itself: diagrams appearing in or
//! leaving the hierarchy list, renamed entries, items copied into other
//! diagrams and renumbered ids.

use serde::{Deserialize, Serialize};

use crate::types::ItemType;

/// Trait for sending hierarchy events
///
/// This abstracts over the transport mechanism (UI bridge, channel, etc.)
/// allowing the engine to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: HierarchyEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted while the hierarchy changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HierarchyEvent {
    /// A process was decomposed into a new diagram
    #[serde(rename_all = "camelCase")]
    DiagramAdded {
        name: String,
        parent: Option<String>,
        process_id: Option<String>,
    },

    /// A diagram and its subtree left the hierarchy
    #[serde(rename_all = "camelCase")]
    DiagramRemoved { name: String },

    /// A diagram was renamed along with its process
    #[serde(rename_all = "camelCase")]
    DiagramRenamed { old_name: String, new_name: String },

    /// An item was placed into another diagram by propagation
    #[serde(rename_all = "camelCase")]
    ItemPropagated {
        label: String,
        item_type: ItemType,
        diagram: String,
        boundary_copy: bool,
    },

    /// An item was removed from a diagram by propagation
    #[serde(rename_all = "camelCase")]
    ItemRemoved {
        label: String,
        item_type: ItemType,
        diagram: String,
    },

    /// Identifiers in a diagram (and below) were recomputed
    #[serde(rename_all = "camelCase")]
    IdsRenumbered { diagram: String },
}

impl HierarchyEvent {
    /// Create an item propagated event
    pub fn item_propagated(label: &str, item_type: ItemType, diagram: &str, boundary_copy: bool) -> Self {
        Self::ItemPropagated {
            label: label.to_string(),
            item_type,
            diagram: diagram.to_string(),
            boundary_copy,
        }
    }

    /// Create an item removed event
    pub fn item_removed(label: &str, item_type: ItemType, diagram: &str) -> Self {
        Self::ItemRemoved {
            label: label.to_string(),
            item_type,
            diagram: diagram.to_string(),
        }
    }
}

/// Send an event, logging instead of failing when the sink is gone
///
/// Hierarchy edits have already been applied when events go out, so a
/// closed channel must not turn them into errors.
pub(crate) fn notify(sink: &dyn EventSink, event: HierarchyEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropped hierarchy event: {}", e);
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: HierarchyEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<HierarchyEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<HierarchyEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: HierarchyEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError {
                message: "Event buffer poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn send(&self, event: HierarchyEvent) -> Result<(), EventError> {
        (**self).send(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(HierarchyEvent::item_propagated("Customer", ItemType::Entity, "Process A", true))
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);

        match &events[0] {
            HierarchyEvent::ItemPropagated { label, boundary_copy, .. } => {
                assert_eq!(label, "Customer");
                assert!(*boundary_copy);
            }
            _ => panic!("Expected ItemPropagated event"),
        }

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(HierarchyEvent::DiagramRemoved { name: "Sub".to_string() })
            .unwrap();
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = HierarchyEvent::DiagramRenamed {
            old_name: "Process A".to_string(),
            new_name: "Process B".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "diagramRenamed");
        assert_eq!(json["oldName"], "Process A");
    }
}
