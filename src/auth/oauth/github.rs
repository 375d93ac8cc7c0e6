use async_trait::async_trait;
use serde::Deserialize;

use super::{get_json, request_access_token, OAuthError, OAuthProvider};
use crate::{
    auth::repo_types::{AuthProvider, OAuthIdentity},
    config::OAuthClientConfig,
};

const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    #[serde(default)]
    verified: bool,
}

pub struct GitHubOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    api_base: String,
}

impl GitHubOAuth {
    pub fn new(client: reqwest::Client, cfg: &OAuthClientConfig, redirect_uri: String) -> Self {
        Self {
            client,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri,
            token_url: TOKEN_URL.into(),
            api_base: API_BASE.into(),
        }
    }

    /// Points the flow at other endpoints (GitHub Enterprise, mock servers).
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

fn primary_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

#[async_trait]
impl OAuthProvider for GitHubOAuth {
    fn name(&self) -> &'static str {
        "github"
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
            ],
        )
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthIdentity, OAuthError> {
        let user_url = format!("{}/user", self.api_base);
        let emails_url = format!("{}/user/emails", self.api_base);
        let (user, emails) = tokio::try_join!(
            get_json::<GitHubUser>(&self.client, &user_url, access_token),
            get_json::<Vec<GitHubEmail>>(&self.client, &emails_url, access_token),
        )?;

        let email = primary_email(emails).ok_or(OAuthError::NoPrimaryEmail)?;
        let full_name = user
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(user.login);

        Ok(OAuthIdentity {
            provider: AuthProvider::Github,
            provider_id: user.id.to_string(),
            email,
            full_name,
            profile_picture: user.avatar_url.filter(|u| !u.is_empty()),
        })
    }
}
