use serde::{Deserialize, Serialize};

use super::task::{Task, TaskOverview};

/// Phase of a focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Work => "Work",
            SessionState::ShortBreak => "Short Break",
            SessionState::LongBreak => "Long Break",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_work(&self) -> bool {
        matches!(self, SessionState::Work)
    }

    pub fn is_break(&self) -> bool {
        matches!(self, SessionState::ShortBreak | SessionState::LongBreak)
    }
}

/// Lifetime counters accumulated across phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub completed_cycles: u32,
    pub total_focus_seconds: u64,
    /// Consecutive work phases completed since the last reset.
    pub streak: u32,
    pub completed_tasks: u32,
}

/// Point-in-time view of a session. Reads never mutate engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub time_remaining: u64,
    pub cycle: u32,
    pub is_running: bool,
    pub is_reverse: bool,
    pub current_task: Option<Task>,
    pub tasks: TaskOverview,
    pub stats: SessionStats,
}

/// Serializable session state for save/restore across host restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPersist {
    pub state: SessionState,
    pub time_remaining: u64,
    pub cycle: u32,
    pub is_reverse: bool,
    pub tasks: Vec<Task>,
    pub current_task_id: Option<String>,
    pub stats: SessionStats,
}
