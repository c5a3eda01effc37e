//! Task data model

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub priority: TaskPriority,
    /// Estimated number of work phases this task should take.
    pub estimated_units: u32,
    /// Work phases completed while this was the current task.
    pub completed_units: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Partial update applied by `update_task`. `None` fields are left as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub priority: Option<TaskPriority>,
    pub estimated_units: Option<u32>,
    pub completed: Option<bool>,
}

/// Task list plus derived counts, the payload of task-update events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOverview {
    pub list: Vec<Task>,
    pub current: Option<Task>,
    pub summary: TaskSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

impl Task {
    /// Create a new task with the given title
    pub fn new(title: String, priority: TaskPriority, estimated_units: u32) -> Result<Self> {
        let task = Self {
            id: Uuid::new_v4().to_string(),
            title,
            priority,
            estimated_units,
            completed_units: 0,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        task.validate()?;
        Ok(task)
    }

    /// Validate the task data
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Task title cannot be empty".to_string()));
        }

        if self.id.trim().is_empty() {
            return Err(Error::Validation("Task ID cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Mark the task done
    pub fn complete(&mut self) {
        self.completed = true;
        self.completed_at = Some(Utc::now());
    }

    /// Record one finished work phase against this task
    pub fn record_unit(&mut self) {
        self.completed_units += 1;
    }

    /// Apply a partial update, validating the result
    pub fn apply(&mut self, patch: TaskPatch) -> Result<()> {
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("Task title cannot be empty".to_string()));
            }
            self.title = title;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(estimated) = patch.estimated_units {
            self.estimated_units = estimated;
        }
        if let Some(completed) = patch.completed {
            if completed && !self.completed {
                self.complete();
            } else if !completed {
                self.completed = false;
                self.completed_at = None;
            }
        }
        Ok(())
    }
}

impl TaskOverview {
    pub fn from_tasks(list: Vec<Task>, current: Option<Task>) -> Self {
        let completed = list.iter().filter(|t| t.completed).count();
        let summary = TaskSummary {
            total: list.len(),
            completed,
            in_progress: list.len() - completed,
        };
        Self {
            list,
            current,
            summary,
        }
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task() {
        let task = Task::new("Write report".to_string(), TaskPriority::High, 2).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.estimated_units, 2);
        assert_eq!(task.completed_units, 0);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_new_task_empty_title() {
        let result = Task::new("  ".to_string(), TaskPriority::Medium, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_complete_sets_timestamp() {
        let mut task = Task::new("Test".to_string(), TaskPriority::Medium, 1).unwrap();
        task.complete();
        assert!(task.completed);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_record_unit() {
        let mut task = Task::new("Test".to_string(), TaskPriority::Medium, 3).unwrap();
        task.record_unit();
        task.record_unit();
        assert_eq!(task.completed_units, 2);
    }

    #[test]
    fn test_apply_patch() {
        let mut task = Task::new("Old".to_string(), TaskPriority::Low, 1).unwrap();
        task.apply(TaskPatch {
            title: Some("New".to_string()),
            priority: Some(TaskPriority::High),
            estimated_units: Some(4),
            completed: None,
        })
        .unwrap();

        assert_eq!(task.title, "New");
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.estimated_units, 4);
        assert!(!task.completed);
    }

    #[test]
    fn test_apply_patch_empty_title_rejected() {
        let mut task = Task::new("Keep".to_string(), TaskPriority::Medium, 1).unwrap();
        let result = task.apply(TaskPatch {
            title: Some("".to_string()),
            ..TaskPatch::default()
        });
        assert!(result.is_err());
        assert_eq!(task.title, "Keep");
    }

    #[test]
    fn test_apply_patch_completion_roundtrip() {
        let mut task = Task::new("Flip".to_string(), TaskPriority::Medium, 1).unwrap();
        task.apply(TaskPatch {
            completed: Some(true),
            ..TaskPatch::default()
        })
        .unwrap();
        assert!(task.completed);
        assert!(task.completed_at.is_some());

        task.apply(TaskPatch {
            completed: Some(false),
            ..TaskPatch::default()
        })
        .unwrap();
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_overview_summary() {
        let mut done = Task::new("Done".to_string(), TaskPriority::Medium, 1).unwrap();
        done.complete();
        let open = Task::new("Open".to_string(), TaskPriority::Medium, 1).unwrap();

        let overview = TaskOverview::from_tasks(vec![done, open.clone()], Some(open));
        assert_eq!(overview.summary.total, 2);
        assert_eq!(overview.summary.completed, 1);
        assert_eq!(overview.summary.in_progress, 1);
    }
}
