use std::time::Duration;

use axum::extract::FromRef;
use axum_extra::extract::cookie::SameSite;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}

/// Which sign-in path minted a session. Each has its own lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    Local,
    GitHub,
    Google,
}

impl SessionFlow {
    pub fn same_site(self) -> Option<SameSite> {
        match self {
            SessionFlow::Google => Some(SameSite::Strict),
            SessionFlow::Local | SessionFlow::GitHub => None,
        }
    }
}

/// Process-wide signing material, built once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    local_ttl: Duration,
    github_ttl: Duration,
    google_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

fn minutes(m: i64) -> Duration {
    Duration::from_secs(m.max(0) as u64 * 60)
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            local_ttl: minutes(cfg.local_ttl_minutes),
            github_ttl: minutes(cfg.github_ttl_minutes),
            google_ttl: minutes(cfg.google_ttl_minutes),
        }
    }

    pub fn ttl(&self, flow: SessionFlow) -> Duration {
        match flow {
            SessionFlow::Local => self.local_ttl,
            SessionFlow::GitHub => self.github_ttl,
            SessionFlow::Google => self.google_ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str, ttl: Duration) -> anyhow::Result<String> {
        self.issue_at(OffsetDateTime::now_utc(), user_id, email, ttl)
    }

    pub fn issue_for(&self, flow: SessionFlow, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.issue(user_id, email, self.ttl(flow))
    }

    fn issue_at(
        &self,
        now: OffsetDateTime,
        user_id: Uuid,
        email: &str,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, ttl_secs = ttl.as_secs(), "session token signed");
        Ok(token)
    }

    /// Signature is checked before any claim is looked at; expiry has no leeway.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "session token verified");
                Ok(data.claims)
            }
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(TokenError::Expired),
            Err(e) => {
                debug!(error = %e, "session token rejected");
                Err(TokenError::Invalid)
            }
        }
    }
}
