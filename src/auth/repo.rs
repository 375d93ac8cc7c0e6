use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::repo_types::{AuthProvider, NewLocalUser, OAuthIdentity, User, UserCredentials},
    error::AppError,
};

const USER_COLUMNS: &str =
    "id, email, full_name, auth_provider, google_id, github_id, profile_picture, role, created_at";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("{0} is already linked to another account")]
    ProviderIdTaken(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            other => AppError::Internal(other.into()),
        }
    }
}

/// Persistence for user accounts. Uniqueness of email and provider ids is the
/// store's job; callers never check-then-insert.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_local(&self, new: NewLocalUser) -> Result<User, StoreError>;
    async fn find_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Create-or-update by email in one atomic step.
    async fn upsert_oauth_user(&self, identity: OAuthIdentity) -> Result<User, StoreError>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// Constraint names from migrations/0001_init.sql.
const EMAIL_KEY: &str = "users_email_key";
const GOOGLE_ID_KEY: &str = "users_google_id_key";
const GITHUB_ID_KEY: &str = "users_github_id_key";

fn unique_violation(constraint: Option<&str>) -> StoreError {
    match constraint {
        Some(GOOGLE_ID_KEY) => StoreError::ProviderIdTaken("google id"),
        Some(GITHUB_ID_KEY) => StoreError::ProviderIdTaken("github id"),
        Some(EMAIL_KEY) | _ => StoreError::DuplicateEmail,
    }
}

fn map_unique_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return unique_violation(db_err.constraint());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_local(&self, new: NewLocalUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, full_name, password_hash, auth_provider)
            VALUES ($1, $2, $3, 'local')
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.full_name)
            .bind(&new.password_hash)
            .fetch_one(&self.db)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn upsert_oauth_user(&self, identity: OAuthIdentity) -> Result<User, StoreError> {
        let (google_id, github_id) = match identity.provider {
            AuthProvider::Google => (Some(identity.provider_id.as_str()), None),
            AuthProvider::Github => (None, Some(identity.provider_id.as_str())),
            AuthProvider::Local => (None, None),
        };
        // Existing rows keep their name and password; the picture is only backfilled.
        let sql = format!(
            r#"
            INSERT INTO users (email, full_name, auth_provider, google_id, github_id, profile_picture)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, ''))
            ON CONFLICT (email) DO UPDATE SET
                auth_provider = EXCLUDED.auth_provider,
                google_id = COALESCE(EXCLUDED.google_id, users.google_id),
                github_id = COALESCE(EXCLUDED.github_id, users.github_id),
                profile_picture = CASE
                    WHEN users.profile_picture = '' THEN EXCLUDED.profile_picture
                    ELSE users.profile_picture
                END
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&identity.email)
            .bind(&identity.full_name)
            .bind(identity.provider)
            .bind(google_id)
            .bind(github_id)
            .bind(identity.profile_picture.as_deref())
            .fetch_one(&self.db)
            .await
            .map_err(map_unique_violation)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
