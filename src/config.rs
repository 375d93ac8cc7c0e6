use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub local_ttl_minutes: i64,
    pub github_ttl_minutes: i64,
    pub google_ttl_minutes: i64,
}

/// Client credentials for one OAuth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    /// Base used to build the URLs handed back to clients.
    pub public_url: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub images_bucket: String,
    pub models_bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub github: Option<OAuthClientConfig>,
    pub google: Option<OAuthClientConfig>,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub storage: StorageConfig,
    pub detection_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "visionauth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "visionauth-users".into()),
            local_ttl_minutes: env_parse("JWT_TTL_LOCAL_MINUTES", 60 * 24),
            github_ttl_minutes: env_parse("JWT_TTL_GITHUB_MINUTES", 60 * 24),
            google_ttl_minutes: env_parse("JWT_TTL_GOOGLE_MINUTES", 60 * 24 * 7),
        };

        let endpoint =
            std::env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:9000".into());
        let storage = StorageConfig {
            public_url: std::env::var("S3_PUBLIC_URL").unwrap_or_else(|_| endpoint.clone()),
            endpoint,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY must be set")?,
            secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY must be set")?,
            images_bucket: std::env::var("S3_IMAGES_BUCKET").unwrap_or_else(|_| "minio-test".into()),
            models_bucket: std::env::var("S3_MODELS_BUCKET").unwrap_or_else(|_| "models".into()),
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:8080".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 3000),
            production: std::env::var("APP_ENV")
                .map(|v| v == "production")
                .unwrap_or(false),
            database_url,
            jwt,
            github: oauth_client("GITHUB"),
            google: oauth_client("GOOGLE"),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            cors_origins,
            storage,
            detection_url: std::env::var("DETECTION_URL")
                .unwrap_or_else(|_| "http://localhost:5000".into()),
        })
    }

    /// Redirect URI registered with the OAuth providers.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/auth", self.frontend_url.trim_end_matches('/'))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// Both id and secret must be present for the flow to be enabled.
fn oauth_client(prefix: &str) -> Option<OAuthClientConfig> {
    let client_id = std::env::var(format!("{prefix}_CLIENT_ID")).ok()?;
    let client_secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
    if client_id.is_empty() || client_secret.is_empty() {
        return None;
    }
    Some(OAuthClientConfig {
        client_id,
        client_secret,
    })
}
