//! The telemetry port. The orchestrator reports every game event to one
//! [`EventSink`]; the run invocation decides where events go.

use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::models::GameEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &GameEvent);
}

/// Mirrors events into the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &GameEvent) {
        match serde_json::to_string(event) {
            Ok(json) if event.is_public() => info!(target: "mafia::event", "{}", json),
            Ok(json) => debug!(target: "mafia::observer", "{}", json),
            Err(e) => debug!("unserializable event {}: {}", event.name(), e),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<GameEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn public_events(&self) -> Vec<GameEvent> {
        self.events()
            .into_iter()
            .filter(GameEvent::is_public)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &GameEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Default, Clone)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for MultiSink {
    fn emit(&self, event: &GameEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
