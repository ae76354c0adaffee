use serde::Serialize;

/// Structured lifecycle events, logged as a single JSON blob under the
/// `trace_event` field so they can be grepped out of the ordinary request
/// logs. Distinct from ad-hoc `tracing::info!` calls made at call sites —
/// this is for events downstream tooling wants to replay or count.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent<'a> {
    SessionActivity {
        session_id: &'a str,
    },
    SessionStarted {
        session_id: &'a str,
        project_id: &'a str,
        cwd: &'a str,
    },
    SessionStopped {
        session_id: &'a str,
        reason: &'a str,
    },
    SessionError {
        session_id: &'a str,
        error: &'a str,
    },
    WatcherDebounceFired {
        session_id: &'a str,
        coalesced: u32,
    },
    TailerAdvanced {
        session_id: &'a str,
        start: u64,
        end: u64,
        messages: usize,
    },
    TailerTruncated {
        session_id: &'a str,
        previous_offset: u64,
    },
    ControllerSpawn {
        session_id: &'a str,
    },
    ControllerBusy {
        session_id: &'a str,
    },
}

impl<'a> TraceEvent<'a> {
    /// Serialize and emit at info level under the `trace_event` field.
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => tracing::info!(trace_event = %json, "fleet_event"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize trace event"),
        }
    }
}
