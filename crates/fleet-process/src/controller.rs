//! Subprocess supervision: at most one live agent process per session,
//! busy semantics, lifecycle event emission (spec §4.8).

use std::collections::HashMap;
use std::fmt;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::watch;

use crate::lifecycle::{LifecycleEvent, StopReason};
use crate::signal::{self, Signal};

/// Emitted by the controller on every lifecycle transition. The transport
/// layer (or any other interested component) implements this to fan the
/// event out; the controller itself has no notion of WebSocket clients.
pub trait LifecycleEmitter: Send + Sync {
    fn emit(&self, event: LifecycleEvent);
}

/// An emitter that does nothing — useful for tests and for a controller
/// that hasn't been wired to a transport yet.
pub struct NullEmitter;

impl LifecycleEmitter for NullEmitter {
    fn emit(&self, _event: LifecycleEvent) {}
}

#[derive(Debug)]
pub enum ControllerError {
    Busy,
    NotRunning,
    Spawn(std::io::Error),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Busy => write!(f, "Session is busy"),
            ControllerError::NotRunning => write!(f, "No running process"),
            ControllerError::Spawn(e) => write!(f, "failed to spawn agent: {e}"),
        }
    }
}

impl std::error::Error for ControllerError {}

struct ManagedProcess {
    pid: u32,
    started_at: DateTime<Utc>,
    stop_requested: Arc<AtomicBool>,
    exited_rx: watch::Receiver<bool>,
}

/// Supervises agent CLI subprocesses, one at most per session.
pub struct Controller {
    registry: Mutex<HashMap<String, ManagedProcess>>,
    emitter: Arc<dyn LifecycleEmitter>,
    agent_cmd: String,
    shutting_down: Arc<AtomicBool>,
}

impl Controller {
    pub fn new(agent_cmd: impl Into<String>, emitter: Arc<dyn LifecycleEmitter>) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            emitter,
            agent_cmd: agent_cmd.into(),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self, session_id: &str) -> bool {
        self.registry.lock().contains_key(session_id)
    }

    pub fn started_at(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.registry.lock().get(session_id).map(|p| p.started_at)
    }

    /// Spawn `<agent> -p --resume <sessionId> -- <text>`. Busy if a process
    /// is already registered for this session.
    pub fn send_message(&self, session_id: &str, text: &str) -> Result<(), ControllerError> {
        let args = vec![
            "-p".to_string(),
            "--resume".to_string(),
            session_id.to_string(),
            "--".to_string(),
            text.to_string(),
        ];
        self.spawn_for_session(session_id, args)
    }

    /// Reattach to an existing session with no new input.
    pub fn resume_session(&self, session_id: &str) -> Result<(), ControllerError> {
        let args = vec![
            "-p".to_string(),
            "--resume".to_string(),
            session_id.to_string(),
        ];
        self.spawn_for_session(session_id, args)
    }

    /// Start a brand-new session rooted at `project_dir`, with an optional
    /// initial prompt and working directory override. Generates the new
    /// session id (the agent CLI's own id-generation is out of scope; §1).
    pub fn start_session(
        &self,
        project_dir: &str,
        prompt: Option<&str>,
        cwd: Option<&str>,
    ) -> Result<String, ControllerError> {
        let session_id = uuid::Uuid::new_v4().to_string();

        let mut args = vec!["-p".to_string(), "--session".to_string(), session_id.clone()];
        args.push("--project-dir".to_string());
        args.push(project_dir.to_string());
        if let Some(cwd) = cwd {
            args.push("--cwd".to_string());
            args.push(cwd.to_string());
        }
        if let Some(prompt) = prompt {
            args.push("--".to_string());
            args.push(prompt.to_string());
        }

        self.spawn_for_session(&session_id, args)?;
        Ok(session_id)
    }

    /// Signal `SIGINT` and await the subprocess's exit.
    pub async fn stop_session(&self, session_id: &str) -> Result<(), ControllerError> {
        let (pid, stop_requested, mut exited_rx) = {
            let registry = self.registry.lock();
            let entry = registry.get(session_id).ok_or(ControllerError::NotRunning)?;
            (
                entry.pid,
                entry.stop_requested.clone(),
                entry.exited_rx.clone(),
            )
        };

        stop_requested.store(true, Ordering::SeqCst);
        signal::send(pid, Signal::Interrupt);

        while !*exited_rx.borrow() {
            if exited_rx.changed().await.is_err() {
                break;
            }
        }
        Ok(())
    }

    /// Suppress further lifecycle emissions, `SIGTERM` every managed
    /// process, and clear the registry. Does not await exit.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let mut registry = self.registry.lock();
        for process in registry.values() {
            signal::send(process.pid, Signal::Terminate);
        }
        registry.clear();
    }

    fn spawn_for_session(&self, session_id: &str, args: Vec<String>) -> Result<(), ControllerError> {
        if self.is_busy(session_id) {
            fleet_domain::TraceEvent::ControllerBusy { session_id }.emit();
            return Err(ControllerError::Busy);
        }

        let mut child = Command::new(&self.agent_cmd)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ControllerError::Spawn)?;

        fleet_domain::TraceEvent::ControllerSpawn { session_id }.emit();

        let pid = child.id().unwrap_or_default();
        let stderr = child.stderr.take();
        let stop_requested = Arc::new(AtomicBool::new(false));
        let (exited_tx, exited_rx) = watch::channel(false);

        {
            let mut registry = self.registry.lock();
            registry.insert(
                session_id.to_string(),
                ManagedProcess {
                    pid,
                    started_at: Utc::now(),
                    stop_requested: stop_requested.clone(),
                    exited_rx,
                },
            );
        }

        self.emitter.emit(LifecycleEvent::SessionActivity {
            session_id: session_id.to_string(),
        });

        let session_id = session_id.to_string();
        let emitter = self.emitter.clone();
        let shutting_down = self.shutting_down.clone();
        let registry_handle = self.registry_handle();

        tokio::spawn(async move {
            let mut stderr_text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut stderr_text).await;
            }

            let status = child.wait().await;
            registry_handle.lock().remove(&session_id);
            let _ = exited_tx.send(true);

            if shutting_down.load(Ordering::SeqCst) {
                return;
            }

            let exit_ok = matches!(&status, Ok(s) if s.success());
            let user_stopped = stop_requested.load(Ordering::SeqCst);

            if !exit_ok && !user_stopped {
                let error = stderr_text.trim().to_string();
                let error = if error.is_empty() {
                    status
                        .as_ref()
                        .err()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "agent exited with non-zero status".to_string())
                } else {
                    error
                };
                emitter.emit(LifecycleEvent::SessionError {
                    session_id: session_id.clone(),
                    error,
                });
            }

            let reason = if user_stopped {
                StopReason::User
            } else if exit_ok {
                StopReason::Completed
            } else {
                StopReason::Errored
            };
            emitter.emit(LifecycleEvent::SessionStopped {
                session_id: session_id.clone(),
                reason,
            });
        });

        Ok(())
    }

    fn registry_handle(&self) -> &Mutex<HashMap<String, ManagedProcess>> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct CapturingEmitter {
        events: Arc<StdMutex<Vec<String>>>,
    }

    impl LifecycleEmitter for CapturingEmitter {
        fn emit(&self, event: LifecycleEvent) {
            self.events
                .lock()
                .unwrap()
                .push(serde_json::to_string(&event).unwrap());
        }
    }

    fn sh_controller(events: Arc<StdMutex<Vec<String>>>) -> Controller {
        Controller::new("sh", Arc::new(CapturingEmitter { events }))
    }

    #[tokio::test]
    async fn busy_semantics_reject_second_send_while_first_is_in_flight() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let controller = sh_controller(events);

        // `sh -p --resume s1 -- sleep 0.2` isn't a real agent CLI, but the
        // busy check only cares whether *something* is registered.
        let first = controller.send_message("s1", "hi");
        assert!(first.is_ok() || matches!(first, Err(ControllerError::Spawn(_))));

        if first.is_ok() {
            let second = controller.send_message("s1", "again");
            assert!(matches!(second, Err(ControllerError::Busy)));
        }
    }

    #[tokio::test]
    async fn stop_session_without_a_running_process_errors() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let controller = sh_controller(events);
        let result = controller.stop_session("nope").await;
        assert!(matches!(result, Err(ControllerError::NotRunning)));
    }

    #[tokio::test]
    async fn shutdown_clears_the_registry() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let controller = sh_controller(events);
        let _ = controller.send_message("s1", "hi");
        controller.shutdown();
        assert!(!controller.is_busy("s1"));
    }
}
