//! `GET /api/directories` — the raw, ungrouped project directory list.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use fleet_scan::{scan_projects, ProjectSummary};

use crate::state::AppState;

#[derive(Serialize)]
pub struct DirectoriesResponse {
    directories: Vec<ProjectSummary>,
}

pub async fn list_directories(State(state): State<AppState>) -> Json<DirectoriesResponse> {
    Json(DirectoriesResponse {
        directories: scan_projects(&state.config.base_paths),
    })
}
