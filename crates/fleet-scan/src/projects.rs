//! `scanProjects`: lists the top-level project directories under each
//! configured base path, without reading full transcripts.

use std::fs;
use std::path::Path;

use crate::session::last_active_at;
use crate::types::ProjectSummary;
use crate::uuidstem::is_session_stem;

const RESERVED_NAME: &str = "memory";

/// Scan every base path for project directories and the session metadata
/// cheap enough to report without a full transcript read.
pub fn scan_projects(base_paths: &[std::path::PathBuf]) -> Vec<ProjectSummary> {
    let mut projects = Vec::new();

    for base in base_paths {
        let Ok(entries) = fs::read_dir(base) else {
            continue;
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || name == RESERVED_NAME {
                continue;
            }

            let (session_count, last_active_at) = summarize_sessions(&path);
            projects.push(ProjectSummary {
                id: name.to_string(),
                source: base.to_string_lossy().to_string(),
                path: fleet_domain::decode_dash_path(name),
                session_count,
                last_active_at,
            });
        }
    }

    projects.sort_by(|a, b| match (&b.last_active_at, &a.last_active_at) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    projects
}

fn summarize_sessions(project_dir: &Path) -> (usize, Option<String>) {
    let Ok(entries) = fs::read_dir(project_dir) else {
        return (0, None);
    };

    let mut count = 0;
    let mut max_active: Option<String> = None;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") || !is_session_stem(stem) {
            continue;
        }

        count += 1;
        if let Some(active) = last_active_at(&path) {
            max_active = match max_active {
                Some(current) if current >= active => Some(current),
                _ => Some(active),
            };
        }
    }

    (count, max_active)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn skips_dot_prefixed_and_memory_dirs() {
        let base = tempfile::tempdir().unwrap();
        fs::create_dir(base.path().join(".hidden")).unwrap();
        fs::create_dir(base.path().join("memory")).unwrap();
        fs::create_dir(base.path().join("-proj-one")).unwrap();

        let projects = scan_projects(&[base.path().to_path_buf()]);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "-proj-one");
    }

    #[test]
    fn counts_only_uuid_stem_jsonl_files() {
        let base = tempfile::tempdir().unwrap();
        let proj = base.path().join("-proj-one");
        fs::create_dir(&proj).unwrap();
        write(
            &proj,
            "550e8400-e29b-41d4-a716-446655440000.jsonl",
            r#"{"type":"user","uuid":"u1","timestamp":"2024-01-01T00:00:00Z","message":{"content":"hi"}}"#,
        );
        write(&proj, "notes.txt", "hello");
        write(&proj, "UPPERCASE-NOT-LOWERCASE.jsonl", "{}");

        let projects = scan_projects(&[base.path().to_path_buf()]);
        assert_eq!(projects[0].session_count, 1);
        assert!(projects[0].last_active_at.is_some());
    }

    #[test]
    fn duplicate_directory_names_under_different_sources_are_separate_entries() {
        let base_a = tempfile::tempdir().unwrap();
        let base_b = tempfile::tempdir().unwrap();
        fs::create_dir(base_a.path().join("-shared")).unwrap();
        fs::create_dir(base_b.path().join("-shared")).unwrap();

        let projects = scan_projects(&[base_a.path().to_path_buf(), base_b.path().to_path_buf()]);
        assert_eq!(projects.len(), 2);
        assert_ne!(projects[0].source, projects[1].source);
    }

    #[test]
    fn missing_base_path_yields_empty() {
        let projects = scan_projects(&[std::path::PathBuf::from("/nonexistent/path/xyz")]);
        assert!(projects.is_empty());
    }
}
