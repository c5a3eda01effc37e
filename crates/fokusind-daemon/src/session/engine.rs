//! Session engine - the work/break cycle state machine
//!
//! Owns the countdown, the phase transition rule and the task list.
//! Everything observable leaves through the event bus; the coordinator and
//! any host UI subscribe rather than reaching into engine state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;

use fokusind_core::models::{
    SessionConfig, SessionPersist, SessionSnapshot, SessionState, SessionStats, Task, TaskOverview,
    TaskPatch, TaskPriority,
};

use crate::event_manager::EventManager;
use crate::events::SessionEvent;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task list is full (max {0})")]
    Capacity(usize),

    #[error("Core error: {0}")]
    Core(#[from] fokusind_core::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

pub struct SessionEngine {
    inner: Arc<RwLock<SessionInner>>,
    events: Arc<EventManager>,
}

struct SessionInner {
    config: SessionConfig,
    state: SessionState,
    cycle: u32,
    time_remaining: u64,
    is_running: bool,
    is_reverse: bool,
    tasks: Vec<Task>,
    current_task_id: Option<String>,
    stats: SessionStats,
    ticker: Option<JoinHandle<()>>,
}

impl SessionInner {
    fn phase_duration(&self, state: SessionState) -> u64 {
        match state {
            SessionState::Work => self.config.work_duration,
            SessionState::ShortBreak => self.config.short_break,
            SessionState::LongBreak => self.config.long_break,
            // Idle shows the first phase's full duration.
            SessionState::Idle => self.initial_duration(),
        }
    }

    fn first_phase(&self) -> SessionState {
        if self.is_reverse {
            SessionState::ShortBreak
        } else {
            SessionState::Work
        }
    }

    fn initial_duration(&self) -> u64 {
        if self.is_reverse {
            self.config.short_break
        } else {
            self.config.work_duration
        }
    }

    /// Run the transition rule at a countdown boundary.
    ///
    /// Returns `true` when a counted work phase ended with a current task,
    /// which was credited one unit.
    fn complete_phase(&mut self) -> bool {
        let finished = self.state;
        let mut credited_task = false;

        if finished.is_work() && !self.is_reverse {
            self.stats.completed_cycles += 1;
            self.stats.streak += 1;
            self.stats.total_focus_seconds += self.config.work_duration;

            if self.cycle >= self.config.cycles_until_long_break {
                self.state = SessionState::LongBreak;
                self.cycle = 1;
            } else {
                self.state = SessionState::ShortBreak;
                self.cycle += 1;
            }

            if let Some(task) = self.current_task_mut() {
                task.record_unit();
                credited_task = true;
            }
        } else if finished.is_work() {
            // Reverse mode skips cycle and stat bookkeeping entirely.
            self.state = SessionState::ShortBreak;
        } else {
            self.state = SessionState::Work;
        }

        self.time_remaining = self.phase_duration(self.state);
        credited_task
    }

    fn current_task_mut(&mut self) -> Option<&mut Task> {
        let id = self.current_task_id.clone()?;
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn current_task(&self) -> Option<Task> {
        let id = self.current_task_id.as_ref()?;
        self.tasks.iter().find(|t| &t.id == id).cloned()
    }

    fn task_overview(&self) -> TaskOverview {
        TaskOverview::from_tasks(self.tasks.clone(), self.current_task())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            time_remaining: self.time_remaining,
            cycle: self.cycle,
            is_running: self.is_running,
            is_reverse: self.is_reverse,
            current_task: self.current_task(),
            tasks: self.task_overview(),
            stats: self.stats.clone(),
        }
    }
}

impl SessionEngine {
    pub fn new(config: SessionConfig, events: Arc<EventManager>) -> Self {
        let is_reverse = config.reverse;
        let time_remaining = if is_reverse {
            config.short_break
        } else {
            config.work_duration
        };

        Self {
            inner: Arc::new(RwLock::new(SessionInner {
                config,
                state: SessionState::Idle,
                cycle: 1,
                time_remaining,
                is_running: false,
                is_reverse,
                tasks: Vec::new(),
                current_task_id: None,
                stats: SessionStats::default(),
                ticker: None,
            })),
            events,
        }
    }

    /// Rebuild an engine from persisted state. The restored session is
    /// never running; the host decides whether to start it.
    pub fn with_state(
        config: SessionConfig,
        events: Arc<EventManager>,
        saved: SessionPersist,
    ) -> Self {
        let engine = Self::new(config, events);
        {
            let mut guard = engine
                .inner
                .try_write()
                .expect("fresh engine lock is uncontended");
            guard.state = saved.state;
            guard.time_remaining = saved.time_remaining;
            guard.cycle = saved.cycle;
            guard.is_reverse = saved.is_reverse;
            guard.tasks = saved.tasks;
            guard.current_task_id = saved.current_task_id;
            guard.stats = saved.stats;
        }
        engine
    }

    // ── Countdown control ────────────────────────────────────────────

    /// Begin or resume the countdown. No-op while already running.
    pub async fn start(&self) {
        let (state, duration) = {
            let mut inner = self.inner.write().await;
            if inner.is_running {
                return;
            }

            if inner.state.is_idle() {
                inner.state = inner.first_phase();
                inner.time_remaining = inner.phase_duration(inner.state);
            }
            inner.is_running = true;

            let handle = tokio::spawn(Self::tick_loop(self.inner.clone(), self.events.clone()));
            if let Some(old) = inner.ticker.replace(handle) {
                old.abort();
            }

            (inner.state, inner.time_remaining)
        };

        tracing::debug!(state = state.as_str(), duration, "session started");
        self.events.emit_session(SessionEvent::started(state, duration));

        // Let the freshly spawned ticker arm its interval before the
        // caller's next time step.
        tokio::task::yield_now().await;
    }

    /// Stop the countdown, keeping the remaining time. No-op while paused.
    pub async fn pause(&self) {
        let time_remaining = {
            let mut inner = self.inner.write().await;
            if let Some(handle) = inner.ticker.take() {
                handle.abort();
            }
            if !inner.is_running {
                return;
            }
            inner.is_running = false;
            inner.time_remaining
        };

        tracing::debug!(time_remaining, "session paused");
        self.events.emit_session(SessionEvent::paused(time_remaining));
    }

    /// Pause, return to idle, cycle 1, and the initial phase duration.
    ///
    /// Lifetime stats survive a reset; the streak does not.
    pub async fn reset(&self) {
        let cycle = {
            let mut inner = self.inner.write().await;
            if let Some(handle) = inner.ticker.take() {
                handle.abort();
            }
            inner.is_running = false;
            inner.state = SessionState::Idle;
            inner.cycle = 1;
            inner.time_remaining = inner.initial_duration();
            inner.stats.streak = 0;
            inner.cycle
        };

        self.events.emit_session(SessionEvent::reset());
        self.events
            .emit_session(SessionEvent::state_changed(SessionState::Idle, cycle));
    }

    /// Flip reverse mode. Any partially elapsed phase is discarded; a
    /// running session restarts immediately in the new mode.
    pub async fn toggle_reverse(&self) {
        let was_running = {
            let mut inner = self.inner.write().await;
            let was_running = inner.is_running;
            inner.is_reverse = !inner.is_reverse;
            was_running
        };

        self.reset().await;

        if was_running {
            self.start().await;
        }
    }

    // ── Task management ──────────────────────────────────────────────

    /// Append a task, failing when the list is at capacity.
    pub async fn add_task(
        &self,
        title: String,
        priority: TaskPriority,
        estimated_units: u32,
    ) -> Result<Task> {
        let (task, overview) = {
            let mut inner = self.inner.write().await;
            if inner.tasks.len() >= inner.config.max_tasks {
                return Err(SessionError::Capacity(inner.config.max_tasks));
            }

            let task = Task::new(title, priority, estimated_units)?;
            inner.tasks.push(task.clone());
            (task, inner.task_overview())
        };

        self.events.emit_session(SessionEvent::task_updated(overview));
        Ok(task)
    }

    /// Mark a task done.
    pub async fn complete_task(&self, task_id: &str) -> Result<Task> {
        let (task, overview) = {
            let mut inner = self.inner.write().await;
            let task = inner
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| SessionError::NotFound(task_id.to_string()))?;
            task.complete();
            let task = task.clone();
            inner.stats.completed_tasks += 1;
            (task, inner.task_overview())
        };

        self.events.emit_session(SessionEvent::task_updated(overview));
        Ok(task)
    }

    /// Apply a partial update to a task.
    pub async fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let (task, overview) = {
            let mut inner = self.inner.write().await;
            let task = inner
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| SessionError::NotFound(task_id.to_string()))?;
            task.apply(patch)?;
            let task = task.clone();
            (task, inner.task_overview())
        };

        self.events.emit_session(SessionEvent::task_updated(overview));
        Ok(task)
    }

    /// Remove a task. Clears the current-task pointer if it pointed here.
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let overview = {
            let mut inner = self.inner.write().await;
            let index = inner
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .ok_or_else(|| SessionError::NotFound(task_id.to_string()))?;
            inner.tasks.remove(index);
            if inner.current_task_id.as_deref() == Some(task_id) {
                inner.current_task_id = None;
            }
            inner.task_overview()
        };

        self.events.emit_session(SessionEvent::task_updated(overview));
        Ok(())
    }

    /// Point the session at a task (or none). Completed work phases
    /// credit one unit to the current task.
    pub async fn set_current_task(&self, task_id: Option<&str>) -> Result<()> {
        let overview = {
            let mut inner = self.inner.write().await;
            if let Some(id) = task_id {
                if !inner.tasks.iter().any(|t| t.id == id) {
                    return Err(SessionError::NotFound(id.to_string()));
                }
            }
            inner.current_task_id = task_id.map(str::to_string);
            inner.task_overview()
        };

        self.events.emit_session(SessionEvent::task_updated(overview));
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Snapshot of the whole session. Never mutates engine state.
    pub async fn status(&self) -> SessionSnapshot {
        let inner = self.inner.read().await;
        inner.snapshot()
    }

    /// Serializable state for the host's persistence port.
    pub async fn persist(&self) -> SessionPersist {
        let inner = self.inner.read().await;
        SessionPersist {
            state: inner.state,
            time_remaining: inner.time_remaining,
            cycle: inner.cycle,
            is_reverse: inner.is_reverse,
            tasks: inner.tasks.clone(),
            current_task_id: inner.current_task_id.clone(),
            stats: inner.stats.clone(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn tick_loop(inner: Arc<RwLock<SessionInner>>, events: Arc<EventManager>) {
        let mut ticker = interval(Duration::from_secs(1));
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let mut guard = inner.write().await;
            if !guard.is_running {
                break;
            }

            guard.time_remaining = guard.time_remaining.saturating_sub(1);

            if guard.time_remaining > 0 {
                let (time_remaining, state) = (guard.time_remaining, guard.state);
                drop(guard);
                events.emit_session(SessionEvent::tick(time_remaining, state));
                continue;
            }

            // Countdown boundary: run the transition, then keep ticking in
            // the new phase. Completion is emitted after stats are updated
            // and with the state already advanced, then the state change.
            let credited_task = guard.complete_phase();
            let state = guard.state;
            let cycle = guard.cycle;
            let stats = guard.stats.clone();
            let overview = credited_task.then(|| guard.task_overview());
            drop(guard);

            tracing::debug!(state = state.as_str(), cycle, "phase complete");
            if let Some(overview) = overview {
                events.emit_session(SessionEvent::task_updated(overview));
            }
            events.emit_session(SessionEvent::phase_completed(state, stats));
            events.emit_session(SessionEvent::state_changed(state, cycle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FocusEvent, SessionEventType};
    use tokio::time::advance;

    fn test_config() -> SessionConfig {
        SessionConfig {
            work_duration: 10,
            short_break: 5,
            long_break: 20,
            cycles_until_long_break: 2,
            max_tasks: 3,
            reverse: false,
        }
    }

    fn engine() -> (SessionEngine, Arc<EventManager>) {
        let events = Arc::new(EventManager::new());
        (SessionEngine::new(test_config(), events.clone()), events)
    }

    async fn ticks(n: u64) {
        for _ in 0..n {
            advance(Duration::from_secs(1)).await;
        }
        // Drain every woken task, including ones that yield mid-chain.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_enters_work() {
        let (engine, _events) = engine();
        engine.start().await;

        let status = engine.status().await;
        assert_eq!(status.state, SessionState::Work);
        assert_eq!(status.time_remaining, 10);
        assert_eq!(status.cycle, 1);
        assert!(status.is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (engine, _events) = engine();
        engine.start().await;
        ticks(3).await;
        engine.start().await;

        let status = engine.status().await;
        assert_eq!(status.time_remaining, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_decrements_only_while_running() {
        let (engine, _events) = engine();
        engine.start().await;
        ticks(4).await;

        engine.pause().await;
        let at_pause = engine.status().await;
        assert_eq!(at_pause.time_remaining, 6);
        assert!(!at_pause.is_running);

        // Time passing while paused changes nothing.
        ticks(100).await;
        assert_eq!(engine.status().await.time_remaining, 6);

        engine.start().await;
        ticks(1).await;
        assert_eq!(engine.status().await.time_remaining, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_transitions_to_short_break() {
        let (engine, _events) = engine();
        engine.start().await;
        ticks(10).await;

        let status = engine.status().await;
        assert_eq!(status.state, SessionState::ShortBreak);
        assert_eq!(status.time_remaining, 5);
        assert_eq!(status.cycle, 2);
        assert!(status.is_running);
        assert_eq!(status.stats.completed_cycles, 1);
        assert_eq!(status.stats.total_focus_seconds, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_transitions_back_to_work() {
        let (engine, _events) = engine();
        engine.start().await;
        ticks(10 + 5).await;

        let status = engine.status().await;
        assert_eq!(status.state, SessionState::Work);
        assert_eq!(status.cycle, 2);
        assert_eq!(status.time_remaining, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_break_after_configured_cycles() {
        let (engine, _events) = engine();
        engine.start().await;
        // Work 1 + break, then work 2 ends at cycle 2 >= 2 -> long break.
        ticks(10 + 5 + 10).await;

        let status = engine.status().await;
        assert_eq!(status.state, SessionState::LongBreak);
        assert_eq!(status.cycle, 1);
        assert_eq!(status.time_remaining, 20);
        assert_eq!(status.stats.completed_cycles, 2);

        // Long break flows back into work.
        ticks(20).await;
        let status = engine.status().await;
        assert_eq!(status.state, SessionState::Work);
        assert_eq!(status.cycle, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_event_order() {
        let (engine, events) = engine();
        let mut rx = events.subscribe();
        engine.start().await;
        ticks(10).await;

        // Started, 9 ticks, then phase-completed before state-changed.
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let FocusEvent::Session(session_event) = event {
                seen.push(session_event.event_type);
            }
        }

        let completed_at = seen
            .iter()
            .position(|e| matches!(e, SessionEventType::PhaseCompleted { .. }))
            .expect("phase completed emitted");
        let changed_at = seen
            .iter()
            .position(|e| matches!(e, SessionEventType::StateChanged { .. }))
            .expect("state changed emitted");
        assert!(completed_at < changed_at);

        match &seen[completed_at] {
            SessionEventType::PhaseCompleted { state, stats } => {
                assert_eq!(*state, SessionState::ShortBreak);
                assert_eq!(stats.completed_cycles, 1);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_events_carry_remaining() {
        let (engine, events) = engine();
        let mut rx = events.subscribe();
        engine.start().await;
        ticks(3).await;

        let mut remaining = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let FocusEvent::Session(SessionEvent {
                event_type: SessionEventType::Tick { time_remaining, .. },
                ..
            }) = event
            {
                remaining.push(time_remaining);
            }
        }
        assert_eq!(remaining, vec![9, 8, 7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_idle() {
        let (engine, _events) = engine();
        engine.start().await;
        ticks(10 + 2).await;

        engine.reset().await;
        let status = engine.status().await;
        assert_eq!(status.state, SessionState::Idle);
        assert_eq!(status.cycle, 1);
        assert_eq!(status.time_remaining, 10);
        assert!(!status.is_running);
        // Lifetime counters survive, the streak does not.
        assert_eq!(status.stats.completed_cycles, 1);
        assert_eq!(status.stats.streak, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_reverse_discards_elapsed_phase() {
        let (engine, _events) = engine();
        engine.start().await;
        ticks(4).await;

        engine.toggle_reverse().await;

        let status = engine.status().await;
        // Restarted immediately in reverse: first phase is the break.
        assert_eq!(status.state, SessionState::ShortBreak);
        assert_eq!(status.time_remaining, 5);
        assert_eq!(status.cycle, 1);
        assert!(status.is_running);
        assert!(status.is_reverse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_reverse_while_paused_stays_idle() {
        let (engine, _events) = engine();
        engine.toggle_reverse().await;

        let status = engine.status().await;
        assert_eq!(status.state, SessionState::Idle);
        assert!(!status.is_running);
        assert!(status.is_reverse);
        assert_eq!(status.time_remaining, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverse_mode_skips_bookkeeping() {
        let (engine, _events) = engine();
        engine.toggle_reverse().await;
        engine.start().await;
        // Break, then a full work phase.
        ticks(5 + 10).await;

        let status = engine.status().await;
        assert_eq!(status.state, SessionState::ShortBreak);
        assert_eq!(status.cycle, 1);
        assert_eq!(status.stats.completed_cycles, 0);
        assert_eq!(status.stats.total_focus_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_task_capacity() {
        let (engine, _events) = engine();
        for i in 0..3 {
            engine
                .add_task(format!("Task {}", i), TaskPriority::Medium, 1)
                .await
                .unwrap();
        }

        let result = engine
            .add_task("One too many".to_string(), TaskPriority::Medium, 1)
            .await;
        assert!(matches!(result, Err(SessionError::Capacity(3))));
        assert_eq!(engine.status().await.tasks.list.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_task_updates_stats() {
        let (engine, _events) = engine();
        let task = engine
            .add_task("Finish me".to_string(), TaskPriority::High, 1)
            .await
            .unwrap();

        let done = engine.complete_task(&task.id).await.unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());
        assert_eq!(engine.status().await.stats.completed_tasks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_not_found() {
        let (engine, _events) = engine();
        assert!(matches!(
            engine.complete_task("missing").await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            engine.update_task("missing", TaskPatch::default()).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            engine.delete_task("missing").await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            engine.set_current_task(Some("missing")).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_task_credited_on_work_completion() {
        let (engine, _events) = engine();
        let task = engine
            .add_task("Deep work".to_string(), TaskPriority::High, 2)
            .await
            .unwrap();
        engine.set_current_task(Some(&task.id)).await.unwrap();

        engine.start().await;
        ticks(10).await;

        let status = engine.status().await;
        let current = status.current_task.unwrap();
        assert_eq!(current.completed_units, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_current_task_clears_pointer() {
        let (engine, _events) = engine();
        let task = engine
            .add_task("Ephemeral".to_string(), TaskPriority::Low, 1)
            .await
            .unwrap();
        engine.set_current_task(Some(&task.id)).await.unwrap();
        engine.delete_task(&task.id).await.unwrap();

        assert!(engine.status().await.current_task.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_restore_roundtrip() {
        let events = Arc::new(EventManager::new());
        let engine = SessionEngine::new(test_config(), events.clone());
        engine
            .add_task("Carry over".to_string(), TaskPriority::Medium, 1)
            .await
            .unwrap();
        engine.start().await;
        ticks(3).await;
        engine.pause().await;

        let saved = engine.persist().await;
        let restored = SessionEngine::with_state(test_config(), events, saved);

        let status = restored.status().await;
        assert_eq!(status.state, SessionState::Work);
        assert_eq!(status.time_remaining, 7);
        assert!(!status.is_running);
        assert_eq!(status.tasks.list.len(), 1);
    }
}
