//! Fokusind Daemon
//!
//! Runs a focus session locally: the session engine drives the countdown,
//! the rule coordinator reacts to its state changes, and the focus guard
//! logs notifications in place of a browser host.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use fokusind_core::models::{ActivityEntry, ActivityKind, Config, SessionConfig};
use fokusind_core::storage::{init_data_dir, ActivityLog, PersistedState, StateStore};
use fokusind_daemon::{
    EventManager, FocusEvent, FocusGuard, RuleCoordinator, SessionEngine, SessionEventType,
};
use fokusind_daemon::ports::{LogNotifier, NoTabs};

#[derive(Parser, Debug)]
#[command(name = "fokusindd")]
#[command(about = "Fokusind daemon - focus session backend", long_about = None)]
struct Args {
    /// Work phase length in minutes
    #[arg(long, default_value_t = 25)]
    work: u64,

    /// Short break length in minutes
    #[arg(long, default_value_t = 5)]
    short_break: u64,

    /// Long break length in minutes
    #[arg(long, default_value_t = 15)]
    long_break: u64,

    /// Work phases before a long break
    #[arg(long, default_value_t = 4)]
    cycles: u32,

    /// Start in reverse (break-first) mode
    #[arg(long)]
    reverse: bool,

    /// Data directory (defaults to the platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = Config::default();
    let session = SessionConfig {
        work_duration: args.work * 60,
        short_break: args.short_break * 60,
        long_break: args.long_break * 60,
        cycles_until_long_break: args.cycles,
        reverse: args.reverse,
        ..config.session.clone()
    };
    config.session = session;
    config.validate()?;

    let data_dir = match args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => init_data_dir()?,
    };
    let store = StateStore::new(data_dir.clone());

    let event_manager = Arc::new(EventManager::new());
    let coordinator = Arc::new(RuleCoordinator::new(
        config.coordinator.clone(),
        event_manager.clone(),
    ));

    let engine = match store.load()? {
        Some(saved) => {
            tracing::info!("restoring saved session state");
            coordinator
                .restore(saved.blocklist, saved.rules, saved.workflows)
                .await;
            Arc::new(SessionEngine::with_state(
                config.session.clone(),
                event_manager.clone(),
                saved.session,
            ))
        }
        None => Arc::new(SessionEngine::new(
            config.session.clone(),
            event_manager.clone(),
        )),
    };

    run(engine, coordinator, event_manager, config, store, data_dir).await
}

async fn run(
    engine: Arc<SessionEngine>,
    coordinator: Arc<RuleCoordinator>,
    event_manager: Arc<EventManager>,
    config: Config,
    store: StateStore,
    data_dir: PathBuf,
) -> Result<()> {
    // Bridge: session state changes feed the coordinator; this is the only
    // coupling between the two.
    {
        let engine = engine.clone();
        let coordinator = coordinator.clone();
        let mut rx = event_manager.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(FocusEvent::Session(event)) => {
                        if matches!(
                            event.event_type,
                            SessionEventType::Started { .. }
                                | SessionEventType::StateChanged { .. }
                                | SessionEventType::Paused { .. }
                                | SessionEventType::Reset
                        ) {
                            let status = engine.status().await;
                            coordinator
                                .update_timer_state(status.is_running, status.state)
                                .await;
                        }
                    }
                    Ok(FocusEvent::Rule(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "bridge lagged behind event bus");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // Activity log: phase completions and workflow triggers become rows in
    // the CSV log.
    {
        let log = ActivityLog::new(data_dir.clone());
        let mut rx = event_manager.subscribe();
        tokio::spawn(async move {
            loop {
                let entry = match rx.recv().await {
                    Ok(FocusEvent::Session(event)) => match event.event_type {
                        SessionEventType::PhaseCompleted { state, .. } => Some(ActivityEntry::new(
                            ActivityKind::PhaseCompleted,
                            format!("entered {}", state.as_str()),
                        )),
                        _ => None,
                    },
                    Ok(FocusEvent::Rule(event)) => match event.event_type {
                        fokusind_daemon::RuleEventType::WorkflowTriggered { workflow } => {
                            Some(ActivityEntry::new(
                                ActivityKind::Note,
                                format!("workflow {} matched", workflow.name),
                            ))
                        }
                        _ => None,
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => None,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                if let Some(entry) = entry {
                    if let Err(error) = log.append(&entry) {
                        tracing::warn!(%error, "failed to append activity entry");
                    }
                }
            }
        });
    }

    // Guard: stands in for the browser host, logging notifications.
    {
        let guard = FocusGuard::new(
            config.guard.clone(),
            Arc::new(LogNotifier),
            Arc::new(NoTabs),
            Arc::new(NoTabs),
        );
        let rx = event_manager.subscribe();
        tokio::spawn(async move {
            guard.run(rx).await;
        });
    }

    engine.start().await;
    tracing::info!("session running, ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    engine.pause().await;

    let coordinator_status = coordinator.status().await;
    let state = PersistedState {
        session: engine.persist().await,
        blocklist: coordinator_status.blocklist,
        rules: coordinator_status.rules,
        workflows: coordinator_status.workflows,
        saved_at: chrono::Utc::now(),
    };
    store.save(&state)?;
    tracing::info!("state saved");

    Ok(())
}
