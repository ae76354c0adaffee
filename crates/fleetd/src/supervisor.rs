//! Glue between the watcher, the tailer, and the transport: one tailer per
//! subscribed session, refcounted by subscriber, driven by watcher
//! debounce callbacks and a periodic pulse fallback.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use fleet_scan::resolve_session_path;
use fleet_transport::{Registry, ServerFrame};
use fleet_watch::Tailer;

struct TailerEntry {
    tailer: Tailer,
    subscriber_count: u32,
}

pub struct TailerSupervisor {
    base_paths: Vec<PathBuf>,
    entries: Mutex<HashMap<String, TailerEntry>>,
    registry: Arc<Registry>,
}

impl TailerSupervisor {
    pub fn new(base_paths: Vec<PathBuf>, registry: Arc<Registry>) -> Self {
        Self {
            base_paths,
            entries: Mutex::new(HashMap::new()),
            registry,
        }
    }

    /// Subscribe to `session_id`, creating its tailer on first subscription.
    /// Returns `false` if no on-disk session file could be found.
    pub fn subscribe(&self, session_id: &str) -> bool {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(session_id) {
            entry.subscriber_count += 1;
            return true;
        }

        let Some(path) = resolve_session_path(&self.base_paths, session_id) else {
            tracing::warn!(session_id, "subscribe: no session file found");
            return false;
        };

        match Tailer::new(session_id.to_string(), path) {
            Ok(tailer) => {
                entries.insert(
                    session_id.to_string(),
                    TailerEntry {
                        tailer,
                        subscriber_count: 1,
                    },
                );
                true
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "failed to create tailer");
                false
            }
        }
    }

    /// Drop one subscriber; tear the tailer down once the last one leaves.
    pub fn unsubscribe(&self, session_id: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(session_id) {
            entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
            if entry.subscriber_count == 0 {
                entries.remove(session_id);
            }
        }
    }

    /// Advance the tailer for `session_id` (if any) and publish the
    /// resulting batch. Called from the watcher's debounce callback.
    pub fn on_activity(&self, session_id: &str) {
        let batch = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(session_id) else {
                return;
            };
            match entry.tailer.advance() {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "tailer advance failed");
                    return;
                }
            }
        };

        if batch.messages.is_empty() {
            return;
        }

        self.registry.publish(session_id, ServerFrame::from_batch(batch));
    }

    /// Advance every active tailer. Driven by a periodic interval as a
    /// fallback for watcher misses.
    pub fn pulse_all(&self) {
        let session_ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        for session_id in session_ids {
            self.on_activity(&session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn new_supervisor(base: PathBuf) -> TailerSupervisor {
        TailerSupervisor::new(vec![base], Arc::new(Registry::new()))
    }

    #[test]
    fn subscribe_without_a_matching_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = new_supervisor(dir.path().to_path_buf());
        assert!(!supervisor.subscribe("550e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn subscribe_resolves_the_session_file_under_any_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("-proj");
        fs::create_dir(&project).unwrap();
        let session_id = "550e8400-e29b-41d4-a716-446655440000";
        fs::write(project.join(format!("{session_id}.jsonl")), "").unwrap();

        let supervisor = new_supervisor(dir.path().to_path_buf());
        assert!(supervisor.subscribe(session_id));
    }

    #[test]
    fn second_subscriber_reuses_the_existing_tailer() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("-proj");
        fs::create_dir(&project).unwrap();
        let session_id = "550e8400-e29b-41d4-a716-446655440001";
        fs::write(project.join(format!("{session_id}.jsonl")), "").unwrap();

        let supervisor = new_supervisor(dir.path().to_path_buf());
        assert!(supervisor.subscribe(session_id));
        assert!(supervisor.subscribe(session_id));
        assert_eq!(supervisor.entries.lock().len(), 1);
        assert_eq!(supervisor.entries.lock()[session_id].subscriber_count, 2);
    }

    #[test]
    fn unsubscribing_the_last_subscriber_tears_down_the_tailer() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("-proj");
        fs::create_dir(&project).unwrap();
        let session_id = "550e8400-e29b-41d4-a716-446655440002";
        fs::write(project.join(format!("{session_id}.jsonl")), "").unwrap();

        let supervisor = new_supervisor(dir.path().to_path_buf());
        supervisor.subscribe(session_id);
        supervisor.unsubscribe(session_id);
        assert!(supervisor.entries.lock().is_empty());
    }

    #[test]
    fn activity_on_an_unsubscribed_session_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = new_supervisor(dir.path().to_path_buf());
        supervisor.on_activity("not-subscribed");
    }
}
