use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::{error, info, instrument};

use crate::{
    auth::{
        cookies::{cleared_session_cookie, session_cookie},
        dto::{
            ChangePasswordRequest, MessageResponse, OAuthCallbackRequest, SigninRequest,
            SigninResponse, SignupRequest, SignupResponse, UserResponse,
        },
        extractors::AuthUser,
        jwt::SessionFlow,
        repo_types::User,
        services,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/github/callback", post(github_callback))
        .route("/google/callback", post(google_callback))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/password", put(change_password))
}

fn with_session(
    state: &AppState,
    jar: CookieJar,
    flow: SessionFlow,
    user: &User,
) -> AppResult<CookieJar> {
    let keys = &state.keys;
    let token = keys.issue_for(flow, user.id, &user.email).map_err(|e| {
        error!(error = %e, user_id = %user.id, "session token signing failed");
        AppError::Internal(e)
    })?;
    Ok(jar.add(session_cookie(
        token,
        keys.ttl(flow),
        state.config.production,
        flow.same_site(),
    )))
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<SignupResponse>)> {
    payload.validate().map_err(AppError::Validation)?;

    let user = services::create_local_user(state.users.as_ref(), &payload).await?;
    let jar = with_session(&state, jar, SessionFlow::Local, &user)?;

    Ok((
        StatusCode::CREATED,
        jar,
        Json(SignupResponse {
            message: "User created successfully",
            success: true,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SigninRequest>,
) -> AppResult<(CookieJar, Json<SigninResponse>)> {
    // Missing fields fail like any other bad credential.
    payload.validate().map_err(|_| AppError::InvalidCredentials)?;

    let user =
        services::authenticate_local(state.users.as_ref(), &payload.email, &payload.password)
            .await?;
    let jar = with_session(&state, jar, SessionFlow::Local, &user)?;

    Ok((
        jar,
        Json(SigninResponse {
            user,
            message: "Logged in successfully",
            success: true,
        }),
    ))
}

/// Any session failure here is a 401, forged and expired tokens included.
#[instrument(skip(state, session, jar))]
pub async fn signout(
    State(state): State<AppState>,
    session: Result<AuthUser, AppError>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    let AuthUser(session) = session.map_err(|_| AppError::Unauthorized)?;
    info!(user_id = %session.id, "user signed out");
    Ok((
        jar.add(cleared_session_cookie(state.config.production)),
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    ))
}

#[instrument(skip(state, session), fields(user_id = %session.id))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .users
        .find_by_id(session.id)
        .await?
        .ok_or_else(|| AppError::BadRequest("User not found".into()))?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, session, payload), fields(user_id = %session.id))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<SignupResponse>> {
    payload.validate().map_err(AppError::Validation)?;
    let changed = services::change_password(
        state.users.as_ref(),
        &session.email,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;
    Ok(Json(SignupResponse {
        message: if changed {
            "Password updated"
        } else {
            "Password unchanged"
        },
        success: true,
    }))
}

#[instrument(skip(state, jar, payload))]
pub async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<OAuthCallbackRequest>,
) -> AppResult<(CookieJar, Json<UserResponse>)> {
    payload.validate().map_err(AppError::Validation)?;
    let user = services::oauth_sign_in(
        state.github.as_deref(),
        state.users.as_ref(),
        &payload.code,
    )
    .await?;
    let jar = with_session(&state, jar, SessionFlow::GitHub, &user)?;
    Ok((jar, Json(UserResponse { success: true, user })))
}

#[instrument(skip(state, jar, payload))]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<OAuthCallbackRequest>,
) -> AppResult<(CookieJar, Json<UserResponse>)> {
    payload.validate().map_err(AppError::Validation)?;
    let user = services::oauth_sign_in(
        state.google.as_deref(),
        state.users.as_ref(),
        &payload.code,
    )
    .await?;
    let jar = with_session(&state, jar, SessionFlow::Google, &user)?;
    Ok((jar, Json(UserResponse { success: true, user })))
}
