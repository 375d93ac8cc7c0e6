use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use super::repo_types::{ModelArtifact, ModelType, NewArtifact};
use crate::{state::AppState, storage::object_key};

pub struct ModelUpload {
    pub model_name: String,
    pub model_type: ModelType,
    pub body: Bytes,
    pub content_type: String,
}

/// Stores the model file, then its record. A failed insert removes the object again.
pub async fn upload_model(
    st: &AppState,
    owner: Uuid,
    upload: ModelUpload,
) -> anyhow::Result<ModelArtifact> {
    let key = object_key(&upload.content_type);
    st.model_storage
        .put_object(&key, upload.body, &upload.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let new = NewArtifact {
        user_id: owner,
        model_name: upload.model_name,
        model_type: upload.model_type,
        model_url: st.model_storage.public_url(&key),
        storage_key: key.clone(),
    };
    match st.artifacts.insert(new).await {
        Ok(artifact) => Ok(artifact),
        Err(e) => {
            if let Err(cleanup) = st.model_storage.delete_object(&key).await {
                warn!(error = %cleanup, %key, "orphaned model object");
            }
            Err(e)
        }
    }
}

/// Returns `false` when the artifact does not exist.
pub async fn delete_model(st: &AppState, id: Uuid) -> anyhow::Result<bool> {
    let Some(artifact) = st.artifacts.find(id).await? else {
        return Ok(false);
    };
    st.model_storage
        .delete_object(&artifact.storage_key)
        .await
        .with_context(|| format!("delete_object {}", artifact.storage_key))?;
    st.artifacts.delete(id).await
}
