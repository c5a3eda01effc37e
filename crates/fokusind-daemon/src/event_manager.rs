//! Central event management and broadcasting

use tokio::sync::broadcast;

use crate::events::{FocusEvent, RuleEvent, SessionEvent};

/// Central event bus shared by the session engine and rule coordinator.
///
/// Subscribers hold independent receivers, so subscribing or dropping a
/// receiver from inside an event handler is always safe.
pub struct EventManager {
    event_tx: broadcast::Sender<FocusEvent>,
}

impl EventManager {
    /// Create a new event manager with a broadcast channel
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self { event_tx }
    }

    /// Subscribe to all engine events
    pub fn subscribe(&self) -> broadcast::Receiver<FocusEvent> {
        self.event_tx.subscribe()
    }

    /// Emit a session event
    pub fn emit_session(&self, event: SessionEvent) {
        let _ = self.event_tx.send(FocusEvent::Session(event));
    }

    /// Emit a rule event
    pub fn emit_rule(&self, event: RuleEvent) {
        let _ = self.event_tx.send(FocusEvent::Rule(event));
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}
