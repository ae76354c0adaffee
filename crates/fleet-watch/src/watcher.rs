//! Recursive filesystem watch over the configured base paths, coalesced
//! per `sessionId` with a resettable debounce timer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// A running recursive watch plus its debounce task. Dropping or calling
/// [`SessionWatcher::stop`] clears every pending timer and closes the
/// underlying watch.
pub struct SessionWatcher {
    _watcher: PollWatcher,
    debounce_task: JoinHandle<()>,
}

impl SessionWatcher {
    /// Start watching every base path recursively. A base path that
    /// doesn't exist is logged and skipped, never fatal. `on_activity`
    /// receives one sessionId per debounce firing.
    pub fn start(
        base_paths: Vec<PathBuf>,
        debounce: Duration,
        on_activity: mpsc::UnboundedSender<String>,
    ) -> notify::Result<Self> {
        let (tx_events, rx_events) = mpsc::unbounded_channel::<PathBuf>();

        let config = notify::Config::default().with_poll_interval(Duration::from_millis(500));
        let mut watcher = PollWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            let _ = tx_events.send(path);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watch error"),
            },
            config,
        )?;

        for base in &base_paths {
            if !base.exists() {
                warn!(path = %base.display(), "watch base path does not exist, skipping");
                continue;
            }
            if let Err(e) = watcher.watch(base, RecursiveMode::Recursive) {
                warn!(path = %base.display(), error = %e, "failed to watch base path");
            }
        }

        let debounce_task = tokio::spawn(run_debounced(rx_events, debounce, on_activity));

        Ok(Self {
            _watcher: watcher,
            debounce_task,
        })
    }

    pub fn stop(self) {
        self.debounce_task.abort();
    }
}

/// Extract the sessionId from a path matching `<uuid>.jsonl`.
pub fn session_id_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    uuid::Uuid::parse_str(stem).ok()?;
    Some(stem.to_string())
}

async fn run_debounced(
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    debounce: Duration,
    on_activity: mpsc::UnboundedSender<String>,
) {
    let mut timers: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut coalesced: HashMap<String, u32> = HashMap::new();

    while let Some(path) = events.recv().await {
        let Some(session_id) = session_id_from_path(&path) else {
            continue;
        };

        // A still-pending timer means this event lands inside the same
        // debounce window as the last one; a finished (or absent) timer
        // means a fresh window is starting.
        let extending = timers
            .get(&session_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false);
        if let Some(existing) = timers.remove(&session_id) {
            existing.abort();
        }

        let count = coalesced.entry(session_id.clone()).or_insert(0);
        *count = if extending { *count + 1 } else { 1 };
        let fired_count = *count;

        let tx = on_activity.clone();
        let sid = session_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            fleet_domain::TraceEvent::WatcherDebounceFired {
                session_id: &sid,
                coalesced: fired_count,
            }
            .emit();
            let _ = tx.send(sid);
        });
        timers.insert(session_id, handle);
    }

    for (_, handle) in timers {
        handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn session_id_requires_jsonl_extension_and_uuid_stem() {
        let valid = Path::new("/projects/-foo/550e8400-e29b-41d4-a716-446655440000.jsonl");
        assert_eq!(
            session_id_from_path(valid).as_deref(),
            Some("550e8400-e29b-41d4-a716-446655440000")
        );
        assert!(session_id_from_path(Path::new("/projects/-foo/notes.txt")).is_none());
        assert!(session_id_from_path(Path::new("/projects/-foo/not-a-uuid.jsonl")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resetting_timer_delays_firing_until_quiet() {
        let (tx_events, rx_events) = mpsc::unbounded_channel();
        let (tx_activity, mut rx_activity) = mpsc::unbounded_channel();
        let debounce = StdDuration::from_millis(1000);

        tokio::spawn(run_debounced(rx_events, debounce, tx_activity));

        let path = PathBuf::from("/projects/-foo/550e8400-e29b-41d4-a716-446655440000.jsonl");
        tx_events.send(path.clone()).unwrap();
        tokio::time::advance(StdDuration::from_millis(600)).await;
        tx_events.send(path.clone()).unwrap();
        tokio::time::advance(StdDuration::from_millis(600)).await;

        assert!(
            rx_activity.try_recv().is_err(),
            "timer reset should have delayed firing past 1200ms total elapsed"
        );

        tokio::time::advance(StdDuration::from_millis(500)).await;
        let fired = rx_activity.recv().await.unwrap();
        assert_eq!(fired, "550e8400-e29b-41d4-a716-446655440000");
    }
}
