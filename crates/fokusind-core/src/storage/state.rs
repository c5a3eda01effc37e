//! Engine state snapshot storage (JSON format)

use crate::models::{BlockRule, SessionPersist, Workflow};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything the host persists between restarts. The engine treats this
/// as opaque: it is written whole and read whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub session: SessionPersist,
    pub blocklist: Vec<String>,
    pub rules: Vec<BlockRule>,
    pub workflows: Vec<Workflow>,
    pub saved_at: DateTime<Utc>,
}

pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    /// Load the last saved state, or `None` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<PersistedState>> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let state: PersistedState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    pub fn save(&self, state: &PersistedState) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(self.state_path(), content)?;

        Ok(())
    }
}
