use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};

use super::dto::{DetectRequest, DetectionModel, DETECTION_MODELS};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(list_models))
        .route("/detect", post(detect))
}

/// GET /auth/models
pub async fn list_models() -> Json<[DetectionModel; 6]> {
    Json(DETECTION_MODELS)
}

/// POST /auth/detect { imageUrl, model }
#[instrument(skip(state, session, payload), fields(user_id = %session.id, model = %payload.model))]
pub async fn detect(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(payload): Json<DetectRequest>,
) -> AppResult<Json<serde_json::Value>> {
    payload
        .validate()
        .map_err(|_| AppError::BadRequest("No imageUrl or model provided".into()))?;

    let result = state
        .detector
        .detect(&payload.image_url, &payload.model)
        .await
        .map_err(|e| AppError::upstream("Failed to detect objects", e))?;
    debug!("detection finished");
    Ok(Json(result))
}
