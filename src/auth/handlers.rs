use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, ConfirmQuery, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::CurrentUser,
        jwt::JwtKeys,
        repo_types::User,
        services::{self, normalize_email, NotificationOutcome},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/confirm", get(confirm))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).delete(delete_me))
}

fn token_response(state: &AppState, user: User, warnings: Vec<String>) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let (access_token, refresh_token) = keys.sign_pair(user.id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
        warnings,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let registration = services::register(&state, &payload.email, &payload.password).await?;

    let warnings = match registration.notification {
        NotificationOutcome::Sent => Vec::new(),
        NotificationOutcome::Failed(reason) => vec![reason],
    };
    let body = token_response(&state, registration.user, warnings)?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized("invalid credentials".into()));
    };

    if !state
        .credentials
        .verify(&payload.password, Some(&user.password_digest))
    {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("invalid credentials".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(token_response(&state, user, Vec::new())?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;

    Ok(Json(token_response(&state, user, Vec::new())?))
}

/// GET /auth/confirm?email=..&token=.. — target of the confirmation email.
#[instrument(skip(state, q), fields(email = %q.email))]
pub async fn confirm(
    State(state): State<AppState>,
    Query(q): Query<ConfirmQuery>,
) -> AppResult<Json<PublicUser>> {
    let invalid = || AppError::BadRequest("invalid confirmation link".into());

    let email = normalize_email(&q.email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    if !services::authenticate_token(&state.credentials, &user, &q.token) {
        warn!(user_id = %user.id, "confirmation token mismatch");
        return Err(invalid());
    }

    let user = services::activate(&state.db, &user).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<StatusCode> {
    if !User::delete(&state.db, user.id).await? {
        return Err(AppError::NotFound("user not found".into()));
    }
    info!(user_id = %user.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
