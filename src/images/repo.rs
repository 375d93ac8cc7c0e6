use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Per-user ordered list of uploaded image URLs.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn append_image(&self, user_id: Uuid, url: &str) -> anyhow::Result<()>;
    async fn list_images(&self, user_id: Uuid) -> anyhow::Result<Vec<String>>;
}

#[derive(Clone)]
pub struct PgImageStore {
    db: PgPool,
}

impl PgImageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn append_image(&self, user_id: Uuid, url: &str) -> anyhow::Result<()> {
        // One statement, so concurrent uploads never lose an entry.
        sqlx::query(
            r#"
            INSERT INTO user_images (user_id, urls)
            VALUES ($1, ARRAY[$2])
            ON CONFLICT (user_id) DO UPDATE SET urls = user_images.urls || EXCLUDED.urls
            "#,
        )
        .bind(user_id)
        .bind(url)
        .execute(&self.db)
        .await
        .context("append user image")?;
        Ok(())
    }

    async fn list_images(&self, user_id: Uuid) -> anyhow::Result<Vec<String>> {
        let row: Option<(Vec<String>,)> =
            sqlx::query_as(r#"SELECT urls FROM user_images WHERE user_id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await
                .context("list user images")?;
        Ok(row.map(|(urls,)| urls).unwrap_or_default())
    }
}
