use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{ArtifactWithOwner, ModelArtifact, NewArtifact};

const ARTIFACT_COLUMNS: &str =
    "id, user_id, model_name, model_type, model_url, storage_key, created_at";

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn insert(&self, new: NewArtifact) -> anyhow::Result<ModelArtifact>;
    /// Newest first, each joined with its owner's name and email.
    async fn list_with_owner(&self) -> anyhow::Result<Vec<ArtifactWithOwner>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<ModelArtifact>>;
    /// `false` when no row had that id.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgArtifactStore {
    db: PgPool,
}

impl PgArtifactStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ArtifactStore for PgArtifactStore {
    async fn insert(&self, new: NewArtifact) -> anyhow::Result<ModelArtifact> {
        let sql = format!(
            r#"
            INSERT INTO model_artifacts (user_id, model_name, model_type, model_url, storage_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ARTIFACT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ModelArtifact>(&sql)
            .bind(new.user_id)
            .bind(&new.model_name)
            .bind(new.model_type)
            .bind(&new.model_url)
            .bind(&new.storage_key)
            .fetch_one(&self.db)
            .await
            .context("insert model artifact")
    }

    async fn list_with_owner(&self) -> anyhow::Result<Vec<ArtifactWithOwner>> {
        sqlx::query_as::<_, ArtifactWithOwner>(
            r#"
            SELECT m.id, m.user_id, m.model_name, m.model_type, m.model_url, m.storage_key,
                   m.created_at, u.full_name AS username, u.email AS user_email
            FROM model_artifacts m
            JOIN users u ON u.id = m.user_id
            ORDER BY m.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list model artifacts")
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<ModelArtifact>> {
        let sql = format!("SELECT {ARTIFACT_COLUMNS} FROM model_artifacts WHERE id = $1");
        sqlx::query_as::<_, ModelArtifact>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find model artifact")
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM model_artifacts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete model artifact")?;
        Ok(res.rows_affected() > 0)
    }
}
