//! Activity log records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row in the append-only activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    pub id: String,
    pub at: DateTime<Utc>,
    pub kind: ActivityKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PhaseCompleted,
    TaskCompleted,
    /// The user extended focus time past a phase boundary, with a reason.
    Extension,
    Note,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, detail: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            at: Utc::now(),
            kind,
            detail: detail.into(),
        }
    }
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::PhaseCompleted => "phase_completed",
            ActivityKind::TaskCompleted => "task_completed",
            ActivityKind::Extension => "extension",
            ActivityKind::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "phase_completed" => Some(ActivityKind::PhaseCompleted),
            "task_completed" => Some(ActivityKind::TaskCompleted),
            "extension" => Some(ActivityKind::Extension),
            "note" => Some(ActivityKind::Note),
            _ => None,
        }
    }
}
