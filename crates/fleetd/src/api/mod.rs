pub mod directories;
pub mod preferences;
pub mod projects;
pub mod sessions;

use axum::routing::{get, post};
use axum::Router;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` route table. Carries its own fallback so an unmatched
/// path under `/api/` gets the route table's `{"error":"Not found"}` JSON
/// body (§6.1) rather than falling through to the SPA/static fallback
/// nested at the top level.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(projects::list_projects))
        .route("/projects/:slug/sessions", get(projects::sessions_for_slug))
        .route("/projects/:slug/worktrees", get(projects::worktrees_for_slug))
        .route("/directories", get(directories::list_directories))
        .route("/sessions", post(sessions::start_session))
        .route("/sessions/:session_id", get(sessions::get_session))
        .route("/sessions/:session_id/stop", post(sessions::stop_session))
        .route("/sessions/:session_id/resume", post(sessions::resume_session))
        .route("/sessions/:session_id/message", post(sessions::send_message))
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::put_preferences),
        )
        .fallback(api_not_found)
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}
