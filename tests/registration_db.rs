//! Database-backed tests. They need a Postgres reachable through
//! `DATABASE_URL`; run with `cargo test -- --ignored`.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use episode_queue::{
    auth::{repo_types::User, services},
    build_app,
    error::AppError,
    mailer::RecordingMailer,
    AppState,
};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use common::*;

fn state_with(pool: PgPool) -> (AppState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    (AppState::with_pool(pool, mailer.clone()), mailer)
}

async fn user_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM users")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn register_stores_lowercase_unconfirmed_user(pool: PgPool) {
    let (state, mailer) = state_with(pool.clone());

    let reg = services::register(&state, "Test@Example.com", "validpass123")
        .await
        .expect("registered");

    assert_eq!(reg.notification, services::NotificationOutcome::Sent);
    let stored = User::find_by_id(&pool, reg.user.id).await.unwrap().unwrap();
    assert_eq!(stored.email, "test@example.com");
    assert!(!stored.confirmed);
    assert!(stored.confirmed_at.is_none());
    assert_ne!(stored.password_digest, "validpass123");
    assert!(state.credentials.verify("validpass123", Some(&stored.password_digest)));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "test@example.com");
    assert!(stored.confirmation_digest.is_some());
    assert_ne!(stored.confirmation_digest.as_deref(), Some(sent[0].token.as_str()));
    assert!(services::authenticate_token(&state.credentials, &stored, &sent[0].token));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn emails_differing_only_in_case_are_duplicates(pool: PgPool) {
    let (state, _) = state_with(pool.clone());
    services::register(&state, "foo@example.com", "validpass123")
        .await
        .unwrap();

    let err = services::register(&state, "FOO@Example.com", "validpass123")
        .await
        .unwrap_err();
    match err {
        AppError::Validation(fields) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "email");
            assert_eq!(fields[0].reason, "has already been taken");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(user_count(&pool).await, 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn blank_email_persists_nothing(pool: PgPool) {
    let (state, mailer) = state_with(pool.clone());
    let err = services::register(&state, "", "validpass123").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(ref f) if f.iter().any(|e| e.field == "email")));
    assert_eq!(user_count(&pool).await, 0);
    assert!(mailer.sent().is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn failed_notification_keeps_the_user(pool: PgPool) {
    let state = AppState::with_pool(pool.clone(), Arc::new(RecordingMailer::failing()));
    let app = build_app(state);

    let res = app
        .oneshot(post_json(
            "/api/v1/auth/register",
            serde_json::json!({"email": "late@example.com", "password": "validpass123"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["user"]["confirmed"], false);
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("late@example.com"));
    assert_eq!(user_count(&pool).await, 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn activation_happens_once(pool: PgPool) {
    let (state, _) = state_with(pool.clone());
    let user = services::register(&state, "once@example.com", "validpass123")
        .await
        .unwrap()
        .user;

    let first = services::activate(&pool, &user).await.unwrap();
    assert!(first.confirmed);
    let stamped = first.confirmed_at.expect("confirmed_at set");

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let second = services::activate(&pool, &first).await.unwrap();
    assert!(second.confirmed);
    assert_eq!(second.confirmed_at, Some(stamped));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn confirmation_link_activates_account(pool: PgPool) {
    let (state, mailer) = state_with(pool.clone());
    services::register(&state, "link@example.com", "validpass123")
        .await
        .unwrap();
    let token = mailer.sent()[0].token.clone();
    let app = build_app(state);

    let bad = app
        .clone()
        .oneshot(get("/api/v1/auth/confirm?email=link%40example.com&token=wrong"))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let ok = app
        .oneshot(get(&format!(
            "/api/v1/auth/confirm?email=LINK%40example.com&token={token}"
        )))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    assert_eq!(body["confirmed"], true);
    assert!(body["confirmed_at"].is_string());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn login_checks_password(pool: PgPool) {
    let (state, _) = state_with(pool);
    services::register(&state, "login@example.com", "validpass123")
        .await
        .unwrap();
    let app = build_app(state);

    let wrong = app
        .clone()
        .oneshot(post_json(
            "/api/v1/auth/login",
            serde_json::json!({"email": "login@example.com", "password": "nope-nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = app
        .oneshot(post_json(
            "/api/v1/auth/login",
            serde_json::json!({"email": "Login@Example.com", "password": "validpass123"}),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    assert!(body["access_token"].as_str().unwrap().len() > 20);
}

async fn set_last_seen(pool: &PgPool, user: &User, at: OffsetDateTime) {
    sqlx::query("UPDATE users SET last_seen_at = $2 WHERE id = $1")
        .bind(user.id)
        .bind(at)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn authenticated_request_refreshes_stale_last_seen(pool: PgPool) {
    let (state, _) = state_with(pool.clone());
    let user = services::register(&state, "seen@example.com", "validpass123")
        .await
        .unwrap()
        .user;
    let token = access_token(&state, user.id);
    let app = build_app(state);

    set_last_seen(&pool, &user, OffsetDateTime::now_utc() - Duration::minutes(20)).await;
    let res = app
        .clone()
        .oneshot(get_with_bearer("/api/v1/queued_episodes", &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let seen = User::find_by_id(&pool, user.id)
        .await
        .unwrap()
        .unwrap()
        .last_seen_at
        .unwrap();
    assert!(OffsetDateTime::now_utc() - seen < Duration::seconds(5));

    let recent = OffsetDateTime::now_utc() - Duration::minutes(5);
    set_last_seen(&pool, &user, recent).await;
    app.oneshot(get_with_bearer("/api/v1/me", &token))
        .await
        .unwrap();
    let after = User::find_by_id(&pool, user.id)
        .await
        .unwrap()
        .unwrap()
        .last_seen_at
        .unwrap();
    // Postgres keeps microseconds.
    assert!((after - recent).abs() < Duration::milliseconds(1));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn queue_lists_own_episodes_and_cascades_on_delete(pool: PgPool) {
    let (state, _) = state_with(pool.clone());
    let owner = services::register(&state, "owner@example.com", "validpass123")
        .await
        .unwrap()
        .user;
    let other = services::register(&state, "other@example.com", "validpass123")
        .await
        .unwrap()
        .user;

    let (episode_id,): (uuid::Uuid,) = sqlx::query_as(
        "INSERT INTO episodes (tmdb_show_id, season_number, episode_number, name, air_date)
         VALUES (1399, 1, 1, 'Winter Is Coming', '2011-04-17') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    for user_id in [owner.id, other.id] {
        sqlx::query("INSERT INTO queued_episodes (user_id, episode_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(episode_id)
            .execute(&pool)
            .await
            .unwrap();
    }

    let token = access_token(&state, owner.id);
    let app = build_app(state);

    let res = app
        .clone()
        .oneshot(get_with_bearer("/api/v1/queued_episodes", &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["episode"]["name"], "Winter Is Coming");

    let req = axum::http::Request::builder()
        .method("DELETE")
        .uri("/api/v1/me")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let remaining: i64 = sqlx::query_scalar("SELECT count(*) FROM queued_episodes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
    assert!(User::find_by_id(&pool, owner.id).await.unwrap().is_none());
}
