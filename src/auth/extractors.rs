use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    cookies::SESSION_COOKIE,
    jwt::{JwtKeys, TokenError},
    repo_types::{Role, User},
};
use crate::{error::AppError, state::AppState};

/// Identity carried by a verified session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

/// Gate for session-protected routes: reads the `token` cookie and verifies
/// it. Trusts the signed claim and never touches the user store.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

pub fn authenticate(jar: &CookieJar, keys: &JwtKeys) -> Result<SessionUser, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let claims = keys.verify(token).map_err(|e| {
        match e {
            TokenError::Expired => debug!("expired session token"),
            TokenError::Invalid => warn!("invalid session token"),
        }
        AppError::Forbidden
    })?;

    Ok(SessionUser {
        id: claims.sub,
        email: claims.email,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>() {
            return Ok(AuthUser(user.clone()));
        }
        let keys = JwtKeys::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let user = authenticate(&jar, &keys)?;
        parts.extensions.insert(user.clone());
        Ok(AuthUser(user))
    }
}

/// Session whose account currently holds the admin role. Unlike `AuthUser`
/// this one does load the account, since roles are not carried in the token.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(session) = AuthUser::from_request_parts(parts, state).await?;
        let user = state
            .users
            .find_by_id(session.id)
            .await?
            .ok_or(AppError::Forbidden)?;
        if user.role != Role::Admin {
            warn!(user_id = %user.id, "admin route refused");
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
