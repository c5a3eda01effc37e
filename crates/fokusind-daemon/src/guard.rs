//! Focus guard - tab limiting and content restriction
//!
//! Consumes engine events and drives the host ports: closes tabs over the
//! limit, restricts non-whitelisted tabs when focus ends or a site rule
//! fires, and clears restrictions when work resumes.

use std::sync::Arc;

use tokio::sync::broadcast;

use fokusind_core::hostname;
use fokusind_core::models::GuardConfig;

use crate::events::{FocusEvent, RuleEventType, SessionEventType};
use crate::ports::{NotificationPort, RestrictionKind, RestrictionPort, TabPort};

pub struct FocusGuard {
    config: GuardConfig,
    /// Whitelist hosts, pre-normalized once.
    whitelist: Vec<String>,
    notifications: Arc<dyn NotificationPort>,
    tabs: Arc<dyn TabPort>,
    restrictions: Arc<dyn RestrictionPort>,
}

impl FocusGuard {
    pub fn new(
        config: GuardConfig,
        notifications: Arc<dyn NotificationPort>,
        tabs: Arc<dyn TabPort>,
        restrictions: Arc<dyn RestrictionPort>,
    ) -> Self {
        let whitelist = config
            .whitelist
            .iter()
            .map(|entry| hostname::normalize(entry))
            .collect();
        Self {
            config,
            whitelist,
            notifications,
            tabs,
            restrictions,
        }
    }

    /// Whitelisted hosts are never restricted or closed.
    pub fn is_whitelisted(&self, url: &str) -> bool {
        let host = hostname::normalize(url);
        self.whitelist
            .iter()
            .any(|w| host == *w || host.ends_with(&format!(".{}", w)))
    }

    /// Close the newest tab when the count exceeds the limit.
    pub fn enforce_tab_limit(&self) {
        let tabs = self.tabs.list_tabs();
        if tabs.len() <= self.config.max_tabs {
            return;
        }

        self.notifications.notify(
            "Tab Limit Exceeded",
            &format!(
                "Maximum {} tabs allowed. Please close some tabs to continue.",
                self.config.max_tabs
            ),
        );

        if let Some(latest) = tabs.last() {
            tracing::info!(tab_id = latest.id, url = %latest.url, "closing tab over limit");
            self.tabs.close_tab(latest.id);
        }
    }

    fn restriction_kind(&self) -> RestrictionKind {
        if self.config.hardcore_mode {
            RestrictionKind::Overlay
        } else {
            RestrictionKind::Blur
        }
    }

    /// Restrict every non-whitelisted tab.
    pub fn restrict_all(&self) {
        let kind = self.restriction_kind();
        for tab in self.tabs.list_tabs() {
            if !self.is_whitelisted(&tab.url) {
                self.restrictions.apply(tab.id, kind);
            }
        }
    }

    /// Clear restrictions from every non-whitelisted tab.
    pub fn clear_all(&self) {
        for tab in self.tabs.list_tabs() {
            if !self.is_whitelisted(&tab.url) {
                self.restrictions.clear(tab.id);
            }
        }
    }

    fn restrict_host(&self, host: &str) {
        let kind = self.restriction_kind();
        for tab in self.tabs.list_tabs() {
            if hostname::normalize(&tab.url) == host {
                self.restrictions.apply(tab.id, kind);
            }
        }
    }

    fn clear_host(&self, host: &str) {
        for tab in self.tabs.list_tabs() {
            if hostname::normalize(&tab.url) == host {
                self.restrictions.clear(tab.id);
            }
        }
    }

    /// React to a single engine event.
    pub fn handle_event(&self, event: &FocusEvent) {
        match event {
            FocusEvent::Session(session_event) => match &session_event.event_type {
                SessionEventType::PhaseCompleted { state, .. } if state.is_break() => {
                    self.notifications.notify(
                        "Focus Time Ended",
                        "Time to take a break or extend with a reason.",
                    );
                    self.restrict_all();
                }
                SessionEventType::StateChanged { state, .. } if state.is_work() => {
                    self.clear_all();
                }
                SessionEventType::Started { state, .. } if state.is_work() => {
                    self.clear_all();
                }
                _ => {}
            },
            FocusEvent::Rule(rule_event) => match &rule_event.event_type {
                RuleEventType::Blocked { host } => self.restrict_host(host),
                RuleEventType::Unblocked { host } => self.clear_host(host),
                RuleEventType::AutoblockStarted { block } => self.restrict_host(&block.host),
                RuleEventType::AutoblockEnded { block } => self.clear_host(&block.host),
                RuleEventType::WorkflowTriggered { workflow } => {
                    self.notifications.notify(
                        &format!("Workflow: {}", workflow.name),
                        &format!("Scheduled window for {} is open.", workflow.host),
                    );
                }
            },
        }
    }

    /// Consume events until the bus closes. Lagged receivers skip ahead
    /// rather than stopping.
    pub async fn run(&self, mut rx: broadcast::Receiver<FocusEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.handle_event(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "guard lagged behind event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
