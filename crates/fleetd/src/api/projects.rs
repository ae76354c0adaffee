//! `GET /api/projects`, `/api/projects/:slug/sessions`,
//! `/api/projects/:slug/worktrees`.

use std::path::Path;

use axum::extract::{Path as AxumPath, State};
use axum::Json;
use serde::Serialize;

use fleet_scan::{group_projects, scan_projects, scan_sessions, scan_worktrees, GroupedProject, ProjectSummary};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProjectsResponse {
    projects: Vec<GroupedProject>,
}

pub async fn list_projects(State(state): State<AppState>) -> Json<ProjectsResponse> {
    let raw = scan_projects(&state.config.base_paths);
    let configs = state.preferences.get().projects;
    Json(ProjectsResponse {
        projects: group_projects(&raw, &configs),
    })
}

#[derive(Serialize)]
pub struct SessionsResponse {
    sessions: Vec<fleet_scan::SessionSummary>,
}

pub async fn sessions_for_slug(
    State(state): State<AppState>,
    AxumPath(slug): AxumPath<String>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let dirs = resolve_group_dirs(&state, &slug)?;

    let mut sessions: Vec<fleet_scan::SessionSummary> = dirs
        .iter()
        .flat_map(|dir| scan_sessions(dir))
        .collect();
    sessions.sort_by(|a, b| match (&b.last_active_at, &a.last_active_at) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    Ok(Json(SessionsResponse { sessions }))
}

#[derive(Serialize)]
pub struct WorktreesResponse {
    worktrees: Vec<fleet_scan::WorktreeSummary>,
}

pub async fn worktrees_for_slug(
    State(state): State<AppState>,
    AxumPath(slug): AxumPath<String>,
) -> Result<Json<WorktreesResponse>, ApiError> {
    let dirs = resolve_group_dirs(&state, &slug)?;

    let mut worktrees: Vec<fleet_scan::WorktreeSummary> = dirs
        .iter()
        .flat_map(|dir| scan_worktrees(dir))
        .collect();
    worktrees.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(WorktreesResponse { worktrees }))
}

/// Resolve `slug` to the filesystem directories backing its matched
/// project ids. A grouped project's `matchedDirIds` are raw directory
/// names, not paths — each one is joined back against the raw summary's
/// `source` (the base path it was found under) to recover the directory.
fn resolve_group_dirs(state: &AppState, slug: &str) -> Result<Vec<std::path::PathBuf>, ApiError> {
    let raw = scan_projects(&state.config.base_paths);
    let configs = state.preferences.get().projects;
    let grouped = group_projects(&raw, &configs);

    let group = grouped
        .into_iter()
        .find(|g| g.slug == slug)
        .ok_or_else(|| ApiError::not_found(format!("no project matches slug {slug}")))?;

    Ok(group
        .matched_dir_ids
        .iter()
        .filter_map(|id| find_source(&raw, id))
        .collect())
}

fn find_source(raw: &[ProjectSummary], id: &str) -> Option<std::path::PathBuf> {
    raw.iter()
        .find(|p| p.id == id)
        .map(|p| Path::new(&p.source).join(&p.id))
}
