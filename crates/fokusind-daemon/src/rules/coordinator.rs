//! Rule coordinator - blocklist, autoblock rules and scheduled workflows
//!
//! Couples to the session engine only through `update_timer_state`, which
//! the host wires to session state-change events. Autoblock expiry runs on
//! elapsed time, never on session ticks, so blocks wind down even when the
//! session sits idle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

use fokusind_core::hostname;
use fokusind_core::models::{
    ActiveBlock, AutoblockSpec, BlockRule, CoordinatorConfig, SessionState, Workflow, WorkflowSpec,
};

use crate::event_manager::EventManager;
use crate::events::RuleEvent;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("No rule for: {0}")]
    NotFound(String),

    #[error("Core error: {0}")]
    Core(#[from] fokusind_core::Error),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

pub struct RuleCoordinator {
    inner: Arc<RwLock<CoordinatorInner>>,
    events: Arc<EventManager>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    blocklist: HashSet<String>,
    rules: HashMap<String, BlockRule>,
    active: HashMap<String, ActiveEntry>,
    workflows: HashMap<String, WorkflowEntry>,
    timer_running: bool,
    timer_state: SessionState,
}

struct ActiveEntry {
    block: ActiveBlock,
    expiry: Option<JoinHandle<()>>,
}

struct WorkflowEntry {
    workflow: Workflow,
    checker: JoinHandle<()>,
}

/// Point-in-time view of coordinator state. Reads never mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSnapshot {
    pub blocking_enabled: bool,
    /// Last session state reported through `update_timer_state`.
    pub session_running: bool,
    pub session_state: SessionState,
    pub blocklist: Vec<String>,
    pub rules: Vec<BlockRule>,
    pub active_blocks: Vec<ActiveBlock>,
    pub workflows: Vec<Workflow>,
}

impl RuleCoordinator {
    pub fn new(config: CoordinatorConfig, events: Arc<EventManager>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CoordinatorInner {
                config,
                blocklist: HashSet::new(),
                rules: HashMap::new(),
                active: HashMap::new(),
                workflows: HashMap::new(),
                timer_running: false,
                timer_state: SessionState::Idle,
            })),
            events,
        }
    }

    /// Load persisted blocklist entries, rules and workflows. Emits no
    /// events; workflows resume their recurring checks.
    pub async fn restore(
        &self,
        blocklist: Vec<String>,
        rules: Vec<BlockRule>,
        workflows: Vec<Workflow>,
    ) {
        let mut guard = self.inner.write().await;
        guard.blocklist.extend(blocklist);
        for rule in rules {
            guard.rules.insert(rule.host.clone(), rule);
        }
        let period = Duration::from_secs(guard.config.workflow_check_secs);
        for workflow in workflows {
            let checker = Self::spawn_checker(
                Arc::clone(&self.inner),
                Arc::clone(&self.events),
                workflow.id.clone(),
                period,
            );
            guard
                .workflows
                .insert(workflow.id.clone(), WorkflowEntry { workflow, checker });
        }
        drop(guard);

        tokio::task::yield_now().await;
    }

    // ── Blocklist ────────────────────────────────────────────────────

    /// Add a site to the blocklist, returning the updated list.
    pub async fn add_to_blocklist(&self, url: &str) -> Vec<String> {
        let host = hostname::normalize(url);
        let list = {
            let mut guard = self.inner.write().await;
            guard.blocklist.insert(host.clone());
            sorted(&guard.blocklist)
        };

        tracing::debug!(%host, "blocklisted");
        self.events.emit_rule(RuleEvent::blocked(host));
        list
    }

    /// Remove a site from the blocklist, returning the updated list.
    pub async fn remove_from_blocklist(&self, url: &str) -> Vec<String> {
        let host = hostname::normalize(url);
        let list = {
            let mut guard = self.inner.write().await;
            guard.blocklist.remove(&host);
            sorted(&guard.blocklist)
        };

        self.events.emit_rule(RuleEvent::unblocked(host));
        list
    }

    /// Blocklist membership, gated by the enabled flag.
    pub async fn is_blocked(&self, url: &str) -> bool {
        let host = hostname::normalize(url);
        let guard = self.inner.read().await;
        guard.config.blocking_enabled && guard.blocklist.contains(&host)
    }

    /// Blocklisted or covered by an active autoblock.
    pub async fn is_restricted(&self, url: &str) -> bool {
        let host = hostname::normalize(url);
        let guard = self.inner.read().await;
        (guard.config.blocking_enabled && guard.blocklist.contains(&host))
            || guard.active.contains_key(&host)
    }

    // ── Autoblock ────────────────────────────────────────────────────

    /// Store an autoblock rule. Activates immediately when a session is
    /// already running.
    pub async fn create_autoblock(&self, spec: AutoblockSpec) -> BlockRule {
        let rule = BlockRule::from_spec(spec);
        let activate = {
            let mut guard = self.inner.write().await;
            guard.rules.insert(rule.host.clone(), rule.clone());
            guard.timer_running && guard.config.autoblock_enabled
        };

        if activate {
            Self::activate_rule(&self.inner, &self.events, &rule.host).await;
        }

        tokio::task::yield_now().await;
        rule
    }

    /// Delete a rule and tear down its active block, if any.
    pub async fn remove_autoblock(&self, url: &str) -> Result<()> {
        let host = hostname::normalize(url);
        {
            let mut guard = self.inner.write().await;
            if guard.rules.remove(&host).is_none() {
                return Err(CoordinatorError::NotFound(host));
            }
        }

        // Teardown is observable on every path, the same as natural expiry.
        Self::deactivate_host(&self.inner, &self.events, &host).await;
        Ok(())
    }

    // ── Session linkage ──────────────────────────────────────────────

    /// The host wires this to session state-change events. Running
    /// activates every rule (re-arming active windows); stopping
    /// deactivates all active blocks and cancels their expiry timers.
    pub async fn update_timer_state(&self, is_running: bool, state: SessionState) {
        let hosts: Vec<String> = {
            let mut guard = self.inner.write().await;
            guard.timer_running = is_running;
            guard.timer_state = state;

            if is_running {
                if guard.config.autoblock_enabled {
                    guard.rules.keys().cloned().collect()
                } else {
                    Vec::new()
                }
            } else {
                guard.active.keys().cloned().collect()
            }
        };

        for host in &hosts {
            if is_running {
                Self::activate_rule(&self.inner, &self.events, host).await;
            } else {
                Self::deactivate_host(&self.inner, &self.events, host).await;
            }
        }

        tokio::task::yield_now().await;
    }

    // ── Workflows ────────────────────────────────────────────────────

    /// Store a workflow and start its recurring window check.
    pub async fn create_workflow(&self, spec: WorkflowSpec) -> Result<Workflow> {
        let workflow = Workflow::from_spec(spec)?;
        {
            let mut guard = self.inner.write().await;
            let period = Duration::from_secs(guard.config.workflow_check_secs);
            let checker = Self::spawn_checker(
                Arc::clone(&self.inner),
                Arc::clone(&self.events),
                workflow.id.clone(),
                period,
            );
            guard.workflows.insert(
                workflow.id.clone(),
                WorkflowEntry {
                    workflow: workflow.clone(),
                    checker,
                },
            );
        }

        tokio::task::yield_now().await;
        Ok(workflow)
    }

    /// Delete a workflow and cancel its recurring check.
    pub async fn remove_workflow(&self, id: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        let entry = guard
            .workflows
            .remove(id)
            .ok_or_else(|| CoordinatorError::NotFound(id.to_string()))?;
        entry.checker.abort();
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Snapshot of blocklist, rules, active blocks and workflows.
    pub async fn status(&self) -> CoordinatorSnapshot {
        let guard = self.inner.read().await;

        let mut rules: Vec<BlockRule> = guard.rules.values().cloned().collect();
        rules.sort_by(|a, b| a.host.cmp(&b.host));

        let mut active_blocks: Vec<ActiveBlock> =
            guard.active.values().map(|e| e.block.clone()).collect();
        active_blocks.sort_by(|a, b| a.host.cmp(&b.host));

        let mut workflows: Vec<Workflow> =
            guard.workflows.values().map(|e| e.workflow.clone()).collect();
        workflows.sort_by(|a, b| a.name.cmp(&b.name));

        CoordinatorSnapshot {
            blocking_enabled: guard.config.blocking_enabled,
            session_running: guard.timer_running,
            session_state: guard.timer_state,
            blocklist: sorted(&guard.blocklist),
            rules,
            active_blocks,
            workflows,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn activate_rule(
        inner: &Arc<RwLock<CoordinatorInner>>,
        events: &Arc<EventManager>,
        host: &str,
    ) {
        let block = {
            let mut guard = inner.write().await;
            let Some(rule) = guard.rules.get(host).cloned() else {
                return;
            };

            // Re-activation re-arms: the pending expiry is cancelled and a
            // fresh window starts now.
            if let Some(previous) = guard.active.remove(host) {
                if let Some(handle) = previous.expiry {
                    handle.abort();
                }
            }

            let block = rule.activate_at(Utc::now());
            let expiry = rule.duration_minutes.map(|minutes| {
                let inner = Arc::clone(inner);
                let events = Arc::clone(events);
                let host = host.to_string();
                tokio::spawn(async move {
                    sleep(Duration::from_secs(minutes * 60)).await;
                    Self::deactivate_host(&inner, &events, &host).await;
                })
            });

            guard.active.insert(
                host.to_string(),
                ActiveEntry {
                    block: block.clone(),
                    expiry,
                },
            );
            block
        };

        tracing::debug!(%host, "autoblock active");
        events.emit_rule(RuleEvent::autoblock_started(block));
    }

    async fn deactivate_host(
        inner: &Arc<RwLock<CoordinatorInner>>,
        events: &Arc<EventManager>,
        host: &str,
    ) {
        let block = {
            let mut guard = inner.write().await;
            let Some(entry) = guard.active.remove(host) else {
                return;
            };
            if let Some(handle) = entry.expiry {
                handle.abort();
            }
            entry.block
        };

        tracing::debug!(%host, "autoblock ended");
        events.emit_rule(RuleEvent::autoblock_ended(block));
    }

    fn spawn_checker(
        inner: Arc<RwLock<CoordinatorInner>>,
        events: Arc<EventManager>,
        id: String,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick of an interval completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let (workflow, enabled) = {
                    let guard = inner.read().await;
                    (
                        guard.workflows.get(&id).map(|e| e.workflow.clone()),
                        guard.config.workflows_enabled,
                    )
                };

                // Removed from under us: stop checking.
                let Some(workflow) = workflow else {
                    break;
                };

                if enabled && workflow.matches_at(Local::now()) {
                    tracing::debug!(name = %workflow.name, "workflow window matched");
                    events.emit_rule(RuleEvent::workflow_triggered(workflow));
                }
            }
        })
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut list: Vec<String> = set.iter().cloned().collect();
    list.sort();
    list
}
