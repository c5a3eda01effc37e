//! Host-environment ports
//!
//! Browser-facing side effects (tabs, notifications, content restriction)
//! live outside the engine. Hosts implement these traits; the engine and
//! guard only ever talk to the trait objects, so tests substitute fakes.

use serde::{Deserialize, Serialize};

/// One open tab as reported by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabInfo {
    pub id: u64,
    pub url: String,
}

/// How a restricted tab is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    /// Content stays visible but blurred and inert.
    Blur,
    /// Full-page overlay, content hidden.
    Overlay,
}

/// Shows user-facing notifications.
pub trait NotificationPort: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Enumerates and closes tabs.
pub trait TabPort: Send + Sync {
    fn list_tabs(&self) -> Vec<TabInfo>;
    fn close_tab(&self, tab_id: u64);
}

/// Applies and clears visual restrictions on a tab.
pub trait RestrictionPort: Send + Sync {
    fn apply(&self, tab_id: u64, kind: RestrictionKind);
    fn clear(&self, tab_id: u64);
}

/// Notification adapter that writes to the log. Used by the daemon binary
/// when no desktop notifier is wired in.
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::info!(title, message, "notification");
    }
}

/// Tab adapter for hosts without a browser attached.
pub struct NoTabs;

impl TabPort for NoTabs {
    fn list_tabs(&self) -> Vec<TabInfo> {
        Vec::new()
    }

    fn close_tab(&self, _tab_id: u64) {}
}

impl RestrictionPort for NoTabs {
    fn apply(&self, _tab_id: u64, _kind: RestrictionKind) {}

    fn clear(&self, _tab_id: u64) {}
}
