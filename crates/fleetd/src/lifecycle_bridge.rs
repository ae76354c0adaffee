//! Bridges `fleet_process::LifecycleEvent` (the controller's internal
//! vocabulary) to `fleet_transport::ServerFrame` (the wire vocabulary),
//! stamping each with the time it crossed the boundary, and broadcasts it
//! to every connected client (spec §4.7: lifecycle broadcasts are not
//! subscription-scoped).

use std::sync::Arc;

use chrono::Utc;

use fleet_process::{LifecycleEmitter, LifecycleEvent, StopReason as ControllerStopReason};
use fleet_transport::{Registry, ServerFrame, StopReason};

pub struct RegistryLifecycleEmitter {
    registry: Arc<Registry>,
}

impl RegistryLifecycleEmitter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

impl LifecycleEmitter for RegistryLifecycleEmitter {
    fn emit(&self, event: LifecycleEvent) {
        let now = Utc::now().to_rfc3339();
        let frame = match event {
            LifecycleEvent::SessionActivity { session_id } => {
                fleet_domain::TraceEvent::SessionActivity {
                    session_id: &session_id,
                }
                .emit();
                ServerFrame::SessionActivity {
                    session_id,
                    updated_at: now,
                }
            }
            LifecycleEvent::SessionError { session_id, error } => {
                fleet_domain::TraceEvent::SessionError {
                    session_id: &session_id,
                    error: &error,
                }
                .emit();
                ServerFrame::SessionError {
                    session_id,
                    error,
                    occurred_at: now,
                }
            }
            LifecycleEvent::SessionStopped { session_id, reason } => {
                let reason = match reason {
                    ControllerStopReason::User => StopReason::User,
                    ControllerStopReason::Completed => StopReason::Completed,
                    ControllerStopReason::Errored => StopReason::Errored,
                };
                fleet_domain::TraceEvent::SessionStopped {
                    session_id: &session_id,
                    reason: reason_str(reason),
                }
                .emit();
                ServerFrame::SessionStopped {
                    session_id,
                    reason,
                    stopped_at: now,
                }
            }
        };
        self.registry.broadcast(frame);
    }
}

fn reason_str(reason: StopReason) -> &'static str {
    match reason {
        StopReason::User => "user",
        StopReason::Completed => "completed",
        StopReason::Errored => "errored",
    }
}
