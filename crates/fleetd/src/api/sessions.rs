//! `GET /api/sessions/:sessionId` and the `POST` session lifecycle
//! endpoints (start, stop, resume, message).

use std::fs;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use fleet_scan::resolve_session_path;
use fleet_transcript::{enrich_session, parse_line, EnrichedSession};
use fleet_transport::ServerFrame;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    session: EnrichedSession,
}

/// The only handler that parses a whole transcript file: every other
/// consumer of `ParsedMessage` sees only the tailer's incremental batches.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let path = resolve_session_path(&state.config.base_paths, &session_id)
        .ok_or_else(|| ApiError::not_found(format!("no session {session_id}")))?;

    let content = fs::read_to_string(&path)?;
    let messages = content
        .lines()
        .enumerate()
        .flat_map(|(i, line)| parse_line(line, i))
        .collect();

    Ok(Json(SessionResponse {
        session: enrich_session(messages),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    project_dir: String,
    prompt: Option<String>,
    cwd: Option<String>,
}

#[derive(Serialize)]
pub struct SessionIdResponse {
    session_id: String,
}

pub async fn start_session(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionIdResponse>), ApiError> {
    if body.project_dir.trim().is_empty() {
        return Err(ApiError::bad_request("projectDir is required"));
    }

    let session_id = state.controller.start_session(
        &body.project_dir,
        body.prompt.as_deref(),
        body.cwd.as_deref(),
    )?;

    fleet_domain::TraceEvent::SessionStarted {
        session_id: &session_id,
        project_id: &body.project_dir,
        cwd: body.cwd.as_deref().unwrap_or(""),
    }
    .emit();

    state.registry.broadcast(ServerFrame::SessionStarted {
        session_id: session_id.clone(),
        project_id: body.project_dir,
        cwd: body.cwd.unwrap_or_default(),
        started_at: Utc::now().to_rfc3339(),
    });

    Ok((
        StatusCode::CREATED,
        Json(SessionIdResponse { session_id }),
    ))
}

pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionIdResponse>, ApiError> {
    state.controller.stop_session(&session_id).await?;
    Ok(Json(SessionIdResponse { session_id }))
}

pub async fn resume_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionIdResponse>, ApiError> {
    state.controller.resume_session(&session_id)?;
    Ok(Json(SessionIdResponse { session_id }))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    message: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidJson(body): ValidJson<SendMessageRequest>,
) -> Result<Json<SessionIdResponse>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }

    state.controller.send_message(&session_id, &body.message)?;
    Ok(Json(SessionIdResponse { session_id }))
}
