use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::{state::AppState, storage::object_key};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Puts the file in the images bucket and appends its URL to the owner's list.
pub async fn upload_user_image(
    st: &AppState,
    user_id: Uuid,
    item: UploadItem,
) -> anyhow::Result<String> {
    anyhow::ensure!(!item.body.is_empty(), "empty upload");

    let key = object_key(&item.content_type);
    st.image_storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let url = st.image_storage.public_url(&key);
    st.images
        .append_image(user_id, &url)
        .await
        .with_context(|| format!("record image {} for {}", key, user_id))?;
    Ok(url)
}
