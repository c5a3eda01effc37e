//! Application configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    pub session: SessionConfig,
    pub coordinator: CoordinatorConfig,
    pub guard: GuardConfig,
}

/// Phase durations and task-list limits for the session engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Work phase length in seconds.
    pub work_duration: u64,
    /// Short break length in seconds.
    pub short_break: u64,
    /// Long break length in seconds.
    pub long_break: u64,
    pub cycles_until_long_break: u32,
    pub max_tasks: usize,
    /// Start sessions in reverse (break-first) mode.
    pub reverse: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinatorConfig {
    pub blocking_enabled: bool,
    pub autoblock_enabled: bool,
    pub workflows_enabled: bool,
    /// How often workflow windows are checked, in seconds.
    pub workflow_check_secs: u64,
}

/// Tab limiting and restriction behavior of the focus guard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardConfig {
    pub max_tabs: usize,
    /// Restrictions become full-page overlays instead of blurs.
    pub hardcore_mode: bool,
    /// Hostnames never restricted or counted against the tab limit.
    pub whitelist: Vec<String>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;
        self.coordinator.validate()?;
        self.guard.validate()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            session: SessionConfig::default(),
            coordinator: CoordinatorConfig::default(),
            guard: GuardConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Validate session configuration
    pub fn validate(&self) -> Result<()> {
        if self.work_duration == 0 {
            return Err(Error::Validation(
                "Work duration must be greater than 0".to_string(),
            ));
        }

        if self.short_break == 0 {
            return Err(Error::Validation(
                "Short break duration must be greater than 0".to_string(),
            ));
        }

        if self.long_break == 0 {
            return Err(Error::Validation(
                "Long break duration must be greater than 0".to_string(),
            ));
        }

        if self.cycles_until_long_break == 0 {
            return Err(Error::Validation(
                "Cycles until long break must be greater than 0".to_string(),
            ));
        }

        if self.max_tasks == 0 {
            return Err(Error::Validation(
                "Max tasks must be greater than 0".to_string(),
            ));
        }

        // Reasonable upper limits
        const MAX_DURATION: u64 = 7200; // 2 hours
        if self.work_duration > MAX_DURATION {
            return Err(Error::Validation(format!(
                "Work duration too long (max {} seconds)",
                MAX_DURATION
            )));
        }

        if self.short_break > MAX_DURATION {
            return Err(Error::Validation(format!(
                "Short break too long (max {} seconds)",
                MAX_DURATION
            )));
        }

        if self.long_break > MAX_DURATION {
            return Err(Error::Validation(format!(
                "Long break too long (max {} seconds)",
                MAX_DURATION
            )));
        }

        Ok(())
    }

    /// Get work duration in minutes
    pub fn work_minutes(&self) -> u64 {
        self.work_duration / 60
    }

    /// Get short break in minutes
    pub fn short_break_minutes(&self) -> u64 {
        self.short_break / 60
    }

    /// Get long break in minutes
    pub fn long_break_minutes(&self) -> u64 {
        self.long_break / 60
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_duration: 1500, // 25 minutes
            short_break: 300,    // 5 minutes
            long_break: 900,     // 15 minutes
            cycles_until_long_break: 4,
            max_tasks: 3,
            reverse: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workflow_check_secs == 0 {
            return Err(Error::Validation(
                "Workflow check period must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            blocking_enabled: true,
            autoblock_enabled: true,
            workflows_enabled: true,
            workflow_check_secs: 60,
        }
    }
}

impl GuardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tabs == 0 {
            return Err(Error::Validation(
                "Max tabs must be greater than 0".to_string(),
            ));
        }

        for host in &self.whitelist {
            if host.trim().is_empty() {
                return Err(Error::Validation(
                    "Whitelist entries cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_tabs: 3,
            hardcore_mode: false,
            whitelist: vec![
                "docs.google.com".to_string(),
                "obsidian.md".to_string(),
                "notion.so".to_string(),
            ],
        }
    }
}
