use std::fmt::Debug;

use super::GameEvent;

/// Trait for serializing transition events for subscribers.
///
/// An `EventFormatter` defines how [`GameEvent`]s are converted into the
/// output type carried on the broadcast stream.
pub trait EventFormatter: Send + Sync + 'static {
    type Output: Send + Sync + 'static + Clone + Debug;

    fn format(&self, event: &GameEvent) -> Self::Output;
}

/// Passes events through as typed Rust values.
pub struct StructuredFormatter;

/// Serializes events as JSON strings.
pub struct JsonFormatter;

impl EventFormatter for StructuredFormatter {
    type Output = GameEvent;

    fn format(&self, event: &GameEvent) -> Self::Output {
        event.clone()
    }
}

impl Default for StructuredFormatter {
    fn default() -> Self {
        Self
    }
}

impl EventFormatter for JsonFormatter {
    type Output = String;

    fn format(&self, event: &GameEvent) -> Self::Output {
        serde_json::to_string(event).unwrap()
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self
    }
}
