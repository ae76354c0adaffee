//! `groupProjects`: collapses raw project directories into the
//! user-configured groups the dashboard lists as a single entry.

use glob::{MatchOptions, Pattern};

use fleet_domain::ProjectConfig;

use crate::types::{GroupedProject, ProjectSummary};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub fn group_projects(raw: &[ProjectSummary], configs: &[ProjectConfig]) -> Vec<GroupedProject> {
    configs
        .iter()
        .map(|config| {
            let patterns: Vec<Pattern> = config
                .project_dirs
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect();

            let matched: Vec<&ProjectSummary> = raw
                .iter()
                .filter(|project| {
                    patterns
                        .iter()
                        .any(|pattern| pattern.matches_with(&project.id, MATCH_OPTIONS))
                })
                .collect();

            let session_count = matched.iter().map(|p| p.session_count).sum();
            let last_active_at = matched
                .iter()
                .filter_map(|p| p.last_active_at.clone())
                .max();
            let matched_dir_ids = matched.iter().map(|p| p.id.clone()).collect();

            GroupedProject {
                slug: slugify(&config.title),
                title: config.title.clone(),
                project_dirs: config.project_dirs.clone(),
                matched_dir_ids,
                session_count,
                last_active_at,
            }
        })
        .collect()
}

/// Lowercase the title, collapse non-alphanumeric runs to a single `-`,
/// and strip leading/trailing `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}
