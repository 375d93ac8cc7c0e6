use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ModelListResponse, UploadedModelResponse},
    repo_types::ModelType,
    services::{self, ModelUpload},
};
use crate::{
    auth::{dto::MessageResponse, extractors::AdminUser},
    error::{AppError, AppResult, FieldError},
    images::handlers::bad_multipart,
    state::AppState,
};

pub const MAX_MODEL_BYTES: usize = 500 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/models", get(list_models))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/upload_model", post(upload_model))
        .route("/models/:id", delete(delete_model))
        .layer(DefaultBodyLimit::max(MAX_MODEL_BYTES))
}

/// POST /admin/upload_model (multipart: file, modelName, modelType)
#[instrument(skip(state, admin, mp), fields(user_id = %admin.id))]
pub async fn upload_model(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    mut mp: Multipart,
) -> AppResult<Json<UploadedModelResponse>> {
    let mut file = None;
    let mut model_name = String::new();
    let mut model_type = String::new();
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(bad_multipart)?;
                file = Some((body, content_type));
            }
            Some("modelName") => model_name = field.text().await.map_err(bad_multipart)?,
            Some("modelType") => model_type = field.text().await.map_err(bad_multipart)?,
            _ => {}
        }
    }

    let mut errors = Vec::new();
    let file = file.filter(|(body, _)| !body.is_empty());
    if file.is_none() {
        errors.push(FieldError::new("file", "is required"));
    }
    let model_name = model_name.trim().to_string();
    if model_name.is_empty() {
        errors.push(FieldError::new("modelName", "is required"));
    }
    let model_type = model_type.trim().parse::<ModelType>().ok();
    if model_type.is_none() {
        errors.push(FieldError::new(
            "modelType",
            "must be object_detection or image_classification",
        ));
    }
    let (Some((body, content_type)), Some(model_type)) = (file, model_type) else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let model = services::upload_model(
        &state,
        admin.id,
        ModelUpload {
            model_name,
            model_type,
            body,
            content_type,
        },
    )
    .await
    .map_err(|e| AppError::upstream("Failed to upload model", e))?;
    info!(model_id = %model.id, model_name = %model.model_name, "model uploaded");

    Ok(Json(UploadedModelResponse {
        message: "Model uploaded successfully!",
        model_url: model.model_url.clone(),
        model,
    }))
}

/// GET /admin/models
#[instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>) -> AppResult<Json<ModelListResponse>> {
    let models = state
        .artifacts
        .list_with_owner()
        .await
        .map_err(|e| AppError::upstream("Failed to fetch models", e))?;
    Ok(Json(ModelListResponse {
        success: true,
        models,
    }))
}

/// DELETE /admin/models/:id
#[instrument(skip(state, admin), fields(user_id = %admin.id))]
pub async fn delete_model(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let deleted = services::delete_model(&state, id)
        .await
        .map_err(|e| AppError::upstream("Failed to delete model", e))?;
    if !deleted {
        return Err(AppError::NotFound("Model"));
    }
    info!(model_id = %id, "model deleted");
    Ok(Json(MessageResponse {
        message: "Model deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, Router};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        auth::repo_types::Role,
        testing::{body_json, multipart_request, request, Fakes, Part},
    };

    async fn upload(app: &Router, cookie: &str, name: &str, kind: &str) -> (StatusCode, Value) {
        let res = app
            .clone()
            .oneshot(multipart_request(
                "/admin/upload_model",
                Some(cookie),
                &[
                    Part::text("modelName", name),
                    Part::text("modelType", kind),
                    Part::file("file", "best.onnx", "application/octet-stream", b"onnx-bytes"),
                ],
            ))
            .await
            .unwrap();
        let status = res.status();
        (status, body_json(res).await)
    }

    #[tokio::test]
    async fn admin_upload_list_delete() {
        let fakes = Fakes::new();
        let app = build_app(fakes.state());
        let cookie = fakes.user_cookie("root@x.com", Role::Admin).await;

        let (status, body) = upload(&app, &cookie, "pets-v1", "object_detection").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Model uploaded successfully!");
        assert!(body["modelUrl"]
            .as_str()
            .unwrap()
            .starts_with("http://storage.test/models/"));
        assert_eq!(body["model"]["modelName"], "pets-v1");
        assert_eq!(body["model"]["modelType"], "object_detection");
        assert!(body["model"].get("storageKey").is_none());
        let first_id = body["model"]["id"].as_str().unwrap().to_string();

        let (status, _) = upload(&app, &cookie, "birds-v2", "image_classification").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fakes.model_storage.keys().len(), 2);

        let res = app
            .clone()
            .oneshot(request("GET", "/admin/models", None, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        let models = body["models"].as_array().unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0]["modelName"], "birds-v2");
        assert_eq!(models[1]["username"], "root name");
        assert_eq!(models[1]["userEmail"], "root@x.com");

        let res = app
            .clone()
            .oneshot(request("DELETE", &format!("/admin/models/{first_id}"), Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!({ "message": "Model deleted successfully" }));
        assert_eq!(fakes.artifacts.len(), 1);
        assert_eq!(fakes.model_storage.keys().len(), 1);

        let res = app
            .oneshot(request("DELETE", &format!("/admin/models/{first_id}"), Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await, json!({ "error": "Model not found" }));
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let fakes = Fakes::new();
        let app = build_app(fakes.state());
        let cookie = fakes.user_cookie("a@x.com", Role::User).await;

        let (status, _) = upload(&app, &cookie, "pets-v1", "object_detection").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(fakes.model_storage.keys().is_empty());

        let res = app
            .oneshot(request(
                "DELETE",
                "/admin/models/00000000-0000-0000-0000-000000000000",
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_unknown_model_type() {
        let fakes = Fakes::new();
        let app = build_app(fakes.state());
        let cookie = fakes.user_cookie("root@x.com", Role::Admin).await;

        let (status, body) = upload(&app, &cookie, "pets-v1", "segmentation").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "modelType");
        assert_eq!(fakes.artifacts.len(), 0);
    }
}
