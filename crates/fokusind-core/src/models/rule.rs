//! Blocklist rules, active blocks and scheduled workflows

use crate::hostname;
use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A site-blocking rule keyed by normalized hostname.
///
/// Rules are created and removed whole; they are never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockRule {
    pub host: String,
    /// How long an activation lasts. `None` blocks until the session stops.
    pub duration_minutes: Option<u64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for `create_autoblock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoblockSpec {
    pub url: String,
    pub duration_minutes: Option<u64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A rule currently in effect. At most one per hostname.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveBlock {
    pub host: String,
    pub note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Daily time-of-day window, inclusive on both ends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A recurring site rule checked against the wall clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub host: String,
    pub window: TimeWindow,
    pub days: Vec<Weekday>,
    pub active: bool,
}

/// Input for `create_workflow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    pub url: String,
    pub window: TimeWindow,
    pub days: Vec<Weekday>,
}

impl BlockRule {
    pub fn from_spec(spec: AutoblockSpec) -> Self {
        Self {
            host: hostname::normalize(&spec.url),
            duration_minutes: spec.duration_minutes,
            note: spec.note,
            created_at: Utc::now(),
        }
    }

    /// Materialize this rule as an active block starting now.
    pub fn activate_at(&self, now: DateTime<Utc>) -> ActiveBlock {
        ActiveBlock {
            host: self.host.clone(),
            note: self.note.clone(),
            started_at: now,
            ends_at: self
                .duration_minutes
                .map(|m| now + chrono::Duration::minutes(m as i64)),
        }
    }
}

impl Workflow {
    pub fn from_spec(spec: WorkflowSpec) -> Result<Self> {
        let workflow = Self {
            id: Uuid::new_v4().to_string(),
            name: spec.name,
            host: hostname::normalize(&spec.url),
            window: spec.window,
            days: spec.days,
            active: true,
        };
        workflow.validate()?;
        Ok(workflow)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(
                "Workflow name cannot be empty".to_string(),
            ));
        }
        if self.days.is_empty() {
            return Err(Error::Validation(
                "Workflow must name at least one weekday".to_string(),
            ));
        }
        if self.window.start > self.window.end {
            return Err(Error::Validation(
                "Workflow window start must not be after its end".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the workflow's weekday set and time window cover `now`.
    ///
    /// Pure so scheduling policy can be tested without a clock.
    pub fn matches_at<Tz: chrono::TimeZone>(&self, now: DateTime<Tz>) -> bool {
        if !self.active {
            return false;
        }
        if !self.days.contains(&now.weekday()) {
            return false;
        }
        let time = now.time();
        time >= self.window.start && time <= self.window.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        TimeWindow {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    #[test]
    fn test_rule_from_spec_normalizes_host() {
        let rule = BlockRule::from_spec(AutoblockSpec {
            url: "https://www.YouTube.com/watch".to_string(),
            duration_minutes: Some(30),
            note: None,
        });
        assert_eq!(rule.host, "youtube.com");
        assert_eq!(rule.duration_minutes, Some(30));
    }

    #[test]
    fn test_activate_with_duration() {
        let rule = BlockRule::from_spec(AutoblockSpec {
            url: "youtube.com".to_string(),
            duration_minutes: Some(30),
            note: Some("too sticky".to_string()),
        });
        let now = Utc::now();
        let block = rule.activate_at(now);

        assert_eq!(block.host, "youtube.com");
        assert_eq!(block.started_at, now);
        assert_eq!(block.ends_at, Some(now + chrono::Duration::minutes(30)));
    }

    #[test]
    fn test_activate_without_duration() {
        let rule = BlockRule::from_spec(AutoblockSpec {
            url: "news.ycombinator.com".to_string(),
            duration_minutes: None,
            note: None,
        });
        let block = rule.activate_at(Utc::now());
        assert!(block.ends_at.is_none());
    }

    #[test]
    fn test_workflow_from_spec() {
        let workflow = Workflow::from_spec(WorkflowSpec {
            name: "Morning mail".to_string(),
            url: "https://mail.example.com".to_string(),
            window: window((9, 0), (10, 0)),
            days: vec![Weekday::Mon, Weekday::Tue],
        })
        .unwrap();

        assert_eq!(workflow.host, "mail.example.com");
        assert!(workflow.active);
        assert!(!workflow.id.is_empty());
    }

    #[test]
    fn test_workflow_validation() {
        let result = Workflow::from_spec(WorkflowSpec {
            name: "".to_string(),
            url: "example.com".to_string(),
            window: window((9, 0), (10, 0)),
            days: vec![Weekday::Mon],
        });
        assert!(result.is_err());

        let result = Workflow::from_spec(WorkflowSpec {
            name: "No days".to_string(),
            url: "example.com".to_string(),
            window: window((9, 0), (10, 0)),
            days: vec![],
        });
        assert!(result.is_err());

        let result = Workflow::from_spec(WorkflowSpec {
            name: "Backwards".to_string(),
            url: "example.com".to_string(),
            window: window((10, 0), (9, 0)),
            days: vec![Weekday::Mon],
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_matches_at_inside_window() {
        let workflow = Workflow::from_spec(WorkflowSpec {
            name: "Standup".to_string(),
            url: "meet.example.com".to_string(),
            window: window((9, 0), (9, 30)),
            days: vec![Weekday::Mon],
        })
        .unwrap();

        // 2024-01-01 was a Monday.
        let monday_0915 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 15, 0).unwrap();
        let monday_0845 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 45, 0).unwrap();
        let tuesday_0915 = Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap();

        assert!(workflow.matches_at(monday_0915));
        assert!(!workflow.matches_at(monday_0845));
        assert!(!workflow.matches_at(tuesday_0915));
    }

    #[test]
    fn test_matches_at_window_edges_inclusive() {
        let workflow = Workflow::from_spec(WorkflowSpec {
            name: "Edges".to_string(),
            url: "example.com".to_string(),
            window: window((9, 0), (9, 30)),
            days: vec![Weekday::Mon],
        })
        .unwrap();

        let at_start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let at_end = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        assert!(workflow.matches_at(at_start));
        assert!(workflow.matches_at(at_end));
    }

    #[test]
    fn test_matches_at_inactive() {
        let mut workflow = Workflow::from_spec(WorkflowSpec {
            name: "Off".to_string(),
            url: "example.com".to_string(),
            window: window((0, 0), (23, 59)),
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
        })
        .unwrap();
        workflow.active = false;

        assert!(!workflow.matches_at(Utc::now()));
    }
}
