//! Session and rule events

use chrono::{DateTime, Utc};
use fokusind_core::models::{ActiveBlock, SessionState, SessionStats, TaskOverview, Workflow};
use serde::{Deserialize, Serialize};

/// Any event emitted by the engine, as broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum FocusEvent {
    Session(SessionEvent),
    Rule(RuleEvent),
}

/// Event emitted by the session engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub event_type: SessionEventType,
    pub timestamp: DateTime<Utc>,
}

/// Types of session events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventType {
    /// Countdown started or resumed
    Started {
        state: SessionState,
        duration_secs: u64,
    },
    /// Periodic countdown update
    Tick {
        time_remaining: u64,
        state: SessionState,
    },
    /// The session moved to a new phase
    StateChanged { state: SessionState, cycle: u32 },
    /// A phase finished; `state` is the phase being entered
    PhaseCompleted {
        state: SessionState,
        stats: SessionStats,
    },
    /// The task list changed
    TaskUpdated { tasks: TaskOverview },
    /// Countdown paused
    Paused { time_remaining: u64 },
    /// Session returned to idle
    Reset,
}

/// Event emitted by the rule coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvent {
    pub event_type: RuleEventType,
    pub timestamp: DateTime<Utc>,
}

/// Types of rule events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleEventType {
    /// A hostname was added to the blocklist
    Blocked { host: String },
    /// A hostname was removed from the blocklist
    Unblocked { host: String },
    /// A workflow window matched the current time
    WorkflowTriggered { workflow: Workflow },
    /// An autoblock rule went into effect
    AutoblockStarted { block: ActiveBlock },
    /// An active block expired or was torn down
    AutoblockEnded { block: ActiveBlock },
}

impl SessionEvent {
    pub fn new(event_type: SessionEventType) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
        }
    }

    pub fn started(state: SessionState, duration_secs: u64) -> Self {
        Self::new(SessionEventType::Started {
            state,
            duration_secs,
        })
    }

    pub fn tick(time_remaining: u64, state: SessionState) -> Self {
        Self::new(SessionEventType::Tick {
            time_remaining,
            state,
        })
    }

    pub fn state_changed(state: SessionState, cycle: u32) -> Self {
        Self::new(SessionEventType::StateChanged { state, cycle })
    }

    pub fn phase_completed(state: SessionState, stats: SessionStats) -> Self {
        Self::new(SessionEventType::PhaseCompleted { state, stats })
    }

    pub fn task_updated(tasks: TaskOverview) -> Self {
        Self::new(SessionEventType::TaskUpdated { tasks })
    }

    pub fn paused(time_remaining: u64) -> Self {
        Self::new(SessionEventType::Paused { time_remaining })
    }

    pub fn reset() -> Self {
        Self::new(SessionEventType::Reset)
    }
}

impl RuleEvent {
    pub fn new(event_type: RuleEventType) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
        }
    }

    pub fn blocked(host: String) -> Self {
        Self::new(RuleEventType::Blocked { host })
    }

    pub fn unblocked(host: String) -> Self {
        Self::new(RuleEventType::Unblocked { host })
    }

    pub fn workflow_triggered(workflow: Workflow) -> Self {
        Self::new(RuleEventType::WorkflowTriggered { workflow })
    }

    pub fn autoblock_started(block: ActiveBlock) -> Self {
        Self::new(RuleEventType::AutoblockStarted { block })
    }

    pub fn autoblock_ended(block: ActiveBlock) -> Self {
        Self::new(RuleEventType::AutoblockEnded { block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_creation() {
        let event = SessionEvent::tick(1499, SessionState::Work);
        match event.event_type {
            SessionEventType::Tick {
                time_remaining,
                state,
            } => {
                assert_eq!(time_remaining, 1499);
                assert_eq!(state, SessionState::Work);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_rule_event_creation() {
        let event = RuleEvent::blocked("facebook.com".to_string());
        match event.event_type {
            RuleEventType::Blocked { host } => assert_eq!(host, "facebook.com"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_focus_event_serializes() {
        let event = FocusEvent::Session(SessionEvent::state_changed(SessionState::ShortBreak, 2));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"category\":\"session\""));
        assert!(json.contains("\"state_changed\""));
    }
}
