use serde::Serialize;

/// Lifecycle events the controller emits as a subprocess is spawned,
/// runs, and exits. The transport layer fans these out to every
/// connected client (lifecycle broadcasts are not subscription-scoped).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    #[serde(rename = "session:activity")]
    SessionActivity { session_id: String },
    #[serde(rename = "session:error")]
    SessionError { session_id: String, error: String },
    #[serde(rename = "session:stopped")]
    SessionStopped { session_id: String, reason: StopReason },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    User,
    Completed,
    Errored,
}
