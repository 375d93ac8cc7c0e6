use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "model_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    ObjectDetection,
    ImageClassification,
}

impl std::str::FromStr for ModelType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object_detection" => Ok(Self::ObjectDetection),
            "image_classification" => Ok(Self::ImageClassification),
            _ => Err(()),
        }
    }
}

/// Uploaded model file plus the metadata recorded for it.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub model_name: String,
    pub model_type: ModelType,
    pub model_url: String,
    #[serde(skip)]
    pub storage_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub user_id: Uuid,
    pub model_name: String,
    pub model_type: ModelType,
    pub model_url: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub artifact: ModelArtifact,
    pub username: String,
    pub user_email: String,
}
