use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::SignupRequest,
        oauth::OAuthProvider,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{NewLocalUser, User},
    },
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email.trim())
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

lazy_static! {
    // Verified against when the account is missing so both failure paths cost one Argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("timing-equalizer").ok();
}

/// Hashes and persists a new local account. Duplicate emails are caught by the
/// store's unique constraint, so two racing signups yield exactly one account.
pub async fn create_local_user(
    users: &dyn UserStore,
    req: &SignupRequest,
) -> Result<User, AppError> {
    let email = normalize_email(&req.email);
    let password_hash = hash_password(&req.password)?;
    let user = users
        .insert_local(NewLocalUser {
            email,
            full_name: req.full_name.trim().to_string(),
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks email and password. Unknown email, an OAuth-only account, and a wrong
/// password all come back as the same `InvalidCredentials`.
pub async fn authenticate_local(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    let creds = users.find_by_email_with_password(&email).await?;

    let Some(creds) = creds else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(password, dummy);
        }
        warn!(email = %email, "signin unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let Some(hash) = creds.password_hash.as_deref() else {
        warn!(user_id = %creds.user.id, "signin on account without password");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, hash)? {
        warn!(user_id = %creds.user.id, "signin invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %creds.user.id, "user signed in");
    Ok(creds.user)
}

/// Returns `true` when a new hash was written. The stored hash is left alone
/// when the new password equals the current one.
pub async fn change_password(
    users: &dyn UserStore,
    email: &str,
    current: &str,
    new: &str,
) -> Result<bool, AppError> {
    let creds = users
        .find_by_email_with_password(&normalize_email(email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    let hash = creds
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(current, hash)? {
        return Err(AppError::InvalidCredentials);
    }
    if verify_password(new, hash)? {
        return Ok(false);
    }

    let new_hash = hash_password(new)?;
    users.update_password_hash(creds.user.id, &new_hash).await?;
    info!(user_id = %creds.user.id, "password changed");
    Ok(true)
}

/// Exchange, profile fetch and reconciliation for one provider callback.
/// Every failure is folded into `AuthenticationFailed`; the cause is only logged.
pub async fn oauth_sign_in(
    provider: Option<&dyn OAuthProvider>,
    users: &dyn UserStore,
    code: &str,
) -> Result<User, AppError> {
    let provider = provider.ok_or_else(|| {
        AppError::AuthenticationFailed(anyhow::anyhow!("oauth provider not configured"))
    })?;
    let name = provider.name();

    let access_token = provider
        .exchange_code(code)
        .await
        .with_context(|| format!("{name} code exchange"))
        .map_err(AppError::AuthenticationFailed)?;

    let mut identity = provider
        .fetch_profile(&access_token)
        .await
        .with_context(|| format!("{name} profile fetch"))
        .map_err(AppError::AuthenticationFailed)?;
    identity.email = normalize_email(&identity.email);

    let user = users
        .upsert_oauth_user(identity)
        .await
        .with_context(|| format!("{name} account reconciliation"))
        .map_err(AppError::AuthenticationFailed)?;

    info!(user_id = %user.id, provider = name, "oauth sign-in");
    Ok(user)
}
