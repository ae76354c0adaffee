//! `GET`/`PUT /api/preferences`.

use axum::extract::State;
use axum::Json;

use fleet_domain::Preferences;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::AppState;

pub async fn get_preferences(State(state): State<AppState>) -> Json<Preferences> {
    Json(state.preferences.get())
}

pub async fn put_preferences(
    State(state): State<AppState>,
    ValidJson(preferences): ValidJson<Preferences>,
) -> Result<Json<Preferences>, ApiError> {
    state.preferences.set(preferences.clone())?;
    Ok(Json(preferences))
}
