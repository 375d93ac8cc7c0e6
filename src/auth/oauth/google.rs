use async_trait::async_trait;
use serde::Deserialize;

use super::{get_json, request_access_token, OAuthError, OAuthProvider};
use crate::{
    auth::repo_types::{AuthProvider, OAuthIdentity},
    config::OAuthClientConfig,
};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

pub struct GoogleOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuth {
    pub fn new(client: reqwest::Client, cfg: &OAuthClientConfig, redirect_uri: String) -> Self {
        Self {
            client,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri,
            token_url: TOKEN_URL.into(),
            userinfo_url: USERINFO_URL.into(),
        }
    }

    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        request_access_token(
            &self.client,
            &self.token_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthIdentity, OAuthError> {
        let user: GoogleUser = get_json(&self.client, &self.userinfo_url, access_token).await?;
        let full_name = match user.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => user.email.split('@').next().unwrap_or_default().to_string(),
        };
        Ok(OAuthIdentity {
            provider: AuthProvider::Google,
            provider_id: user.id,
            email: user.email,
            full_name,
            profile_picture: user.picture.filter(|p| !p.is_empty()),
        })
    }
}
