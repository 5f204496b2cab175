//! Domain events: decoupled observation of what the assistant does.
//!
//! Events are published when something interesting happens in the system.
//! The CLI and tests subscribe to them without the evaluator or the auto
//! runner knowing who listens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An input event reached the evaluator
    UtteranceReceived {
        turn_id: String,
        kind: String, // "final", "partial", "none", "error"
        text_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The ranker (or the fallback) picked a skill for a turn
    SkillChosen {
        turn_id: String,
        skill_id: String,
        score: f64,
        used_fallback: bool,
        timestamp: DateTime<Utc>,
    },

    /// A skill produced an output and its plan was applied
    OutputGenerated {
        turn_id: String,
        skill_id: String,
        plan: String,
        reopen_microphone: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A turn ended in an error output
    TurnFailed {
        turn_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// An auto-runnable skill refreshed its output
    AutoOutputPublished {
        skill_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The auto runner restarted its tasks for a new enabled set
    AutoTasksRestarted {
        generation: u64,
        task_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The set of enabled skills changed
    EnabledSkillsChanged {
        skill_ids: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Variant name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::UtteranceReceived { .. } => "utterance_received",
            DomainEvent::SkillChosen { .. } => "skill_chosen",
            DomainEvent::OutputGenerated { .. } => "output_generated",
            DomainEvent::TurnFailed { .. } => "turn_failed",
            DomainEvent::AutoOutputPublished { .. } => "auto_output_published",
            DomainEvent::AutoTasksRestarted { .. } => "auto_tasks_restarted",
            DomainEvent::EnabledSkillsChanged { .. } => "enabled_skills_changed",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        let kind = event.kind();
        match self.sender.send(Arc::new(event)) {
            Ok(receivers) => tracing::trace!(kind, receivers, "Event published"),
            // No subscribers is fine
            Err(_) => tracing::trace!(kind, "Event dropped, no subscribers"),
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
