use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use fleet_domain::{FleetConfig, PreferencesStore};
use fleet_process::Controller;
use fleet_transport::Registry;
use fleet_watch::SessionWatcher;

use fleetd::build_router;
use fleetd::lifecycle_bridge::RegistryLifecycleEmitter;
use fleetd::state::AppState;
use fleetd::supervisor::TailerSupervisor;

const AGENT_CMD_ENV: &str = "FLEET_AGENT_CMD";
const DEFAULT_AGENT_CMD: &str = "claude";
const DEFAULT_TAIL_PULSE_MS: u64 = 2000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("fleetd starting");

    let config = Arc::new(FleetConfig::from_env());
    let preferences = Arc::new(
        PreferencesStore::load(PreferencesStore::default_path())
            .context("loading preferences")?,
    );

    let registry = Arc::new(Registry::new());
    let supervisor = Arc::new(TailerSupervisor::new(config.base_paths.clone(), registry.clone()));

    let agent_cmd = std::env::var(AGENT_CMD_ENV).unwrap_or_else(|_| DEFAULT_AGENT_CMD.to_string());
    let emitter: Arc<RegistryLifecycleEmitter> = Arc::new(RegistryLifecycleEmitter::new(registry.clone()));
    let controller = Arc::new(Controller::new(agent_cmd, emitter));

    let state = AppState {
        config: config.clone(),
        preferences,
        controller: controller.clone(),
        registry: registry.clone(),
        supervisor: supervisor.clone(),
    };

    let debounce = std::env::var("FLEET_WATCH_DEBOUNCE_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(fleet_watch::DEFAULT_DEBOUNCE);

    let (activity_tx, mut activity_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let watcher = match SessionWatcher::start(config.base_paths.clone(), debounce, activity_tx) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::error!(error = %e, "failed to start filesystem watcher");
            None
        }
    };

    {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            while let Some(session_id) = activity_rx.recv().await {
                supervisor.on_activity(&session_id);
            }
        });
    }

    {
        let supervisor = supervisor.clone();
        let pulse_ms = std::env::var("FLEET_TAIL_PULSE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TAIL_PULSE_MS);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(pulse_ms));
            loop {
                interval.tick().await;
                supervisor.pulse_all();
            }
        });
    }

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "fleetd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    registry.shutdown();
    controller.shutdown();
    if let Some(watcher) = watcher {
        watcher.stop();
    }

    tracing::info!("fleetd stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,fleetd=debug")),
        )
        .json()
        .init();
}

/// Resolves on `SIGINT` or `SIGTERM`, triggering axum's graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
