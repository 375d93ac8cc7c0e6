//! Authorization-code flows against external identity providers.
//!
//! Each provider turns a one-time `code` into an access token and then into an
//! [`OAuthIdentity`]. Reconciliation with the user store happens in
//! `auth::services::oauth_sign_in`, outside the providers.
//!
//! No `state` nonce or PKCE verifier is exchanged: the client posts the bare
//! code it got from the provider redirect.

mod github;
mod google;

pub use github::GitHubOAuth;
pub use google::GoogleOAuth;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::repo_types::OAuthIdentity;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("token endpoint returned {0}")]
    ExchangeStatus(reqwest::StatusCode),
    #[error("token endpoint refused the code: {0}")]
    ExchangeRefused(String),
    #[error("profile endpoint returned {0}")]
    ProfileStatus(reqwest::StatusCode),
    #[error("account has no verified primary email")]
    NoPrimaryEmail,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError>;
    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthIdentity, OAuthError>;
}

/// Shared client for provider and detection calls. Calls are never retried
/// and run with reqwest's default (unbounded) timeouts.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Posts the form to a token endpoint and pulls out `access_token`. GitHub
/// answers a bad code with 200 and an `error` field, so both shapes are checked.
async fn request_access_token(
    client: &reqwest::Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<String, OAuthError> {
    let res = client
        .post(token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(form)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        warn!(%status, token_url, "oauth token exchange rejected");
        return Err(OAuthError::ExchangeStatus(status));
    }

    let body: TokenResponse = res.json().await?;
    match body.access_token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(OAuthError::ExchangeRefused(
            body.error_description
                .or(body.error)
                .unwrap_or_else(|| "no access_token in response".into()),
        )),
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    access_token: &str,
) -> Result<T, OAuthError> {
    let res = client.get(url).bearer_auth(access_token).send().await?;
    let status = res.status();
    if !status.is_success() {
        warn!(%status, url, "oauth profile fetch rejected");
        return Err(OAuthError::ProfileStatus(status));
    }
    Ok(res.json().await?)
}
