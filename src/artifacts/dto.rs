use serde::Serialize;

use super::repo_types::{ArtifactWithOwner, ModelArtifact};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedModelResponse {
    pub message: &'static str,
    pub model_url: String,
    pub model: ModelArtifact,
}

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub success: bool,
    pub models: Vec<ArtifactWithOwner>,
}
