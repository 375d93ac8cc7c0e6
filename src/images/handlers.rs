use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{UploadedImageResponse, UserImagesResponse},
    services::{upload_user_image, UploadItem},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024; // 20MB

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_image))
        .route("/images_user", get(list_user_images))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
}

pub(crate) fn bad_multipart(e: MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

/// POST /auth/upload (multipart, field `file`)
#[instrument(skip(state, session, mp), fields(user_id = %session.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<UploadedImageResponse>> {
    let mut file = None;
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await.map_err(bad_multipart)?;
        file = Some(UploadItem { body, content_type });
    }
    let file = file
        .filter(|f| !f.body.is_empty())
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;

    let image_url = upload_user_image(&state, session.id, file)
        .await
        .map_err(|e| AppError::upstream("Failed to upload image", e))?;
    info!(%image_url, "image uploaded");

    Ok(Json(UploadedImageResponse {
        message: "Image uploaded successfully!",
        image_url,
    }))
}

/// GET /auth/images_user
#[instrument(skip(state, session), fields(user_id = %session.id))]
pub async fn list_user_images(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> AppResult<Json<UserImagesResponse>> {
    let images = state
        .images
        .list_images(session.id)
        .await
        .map_err(|e| AppError::upstream("Failed to fetch user images", e))?;
    Ok(Json(UserImagesResponse { images }))
}
