use std::sync::Arc;

use fleet_domain::config::FleetConfig;
use fleet_domain::preferences::PreferencesStore;
use fleet_process::Controller;
use fleet_transport::Registry;

use crate::supervisor::TailerSupervisor;

/// Shared application state passed to all HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FleetConfig>,
    pub preferences: Arc<PreferencesStore>,
    pub controller: Arc<Controller>,
    pub registry: Arc<Registry>,
    pub supervisor: Arc<TailerSupervisor>,
}
