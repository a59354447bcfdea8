#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
};
use axum::extract::FromRef;
use episode_queue::{auth::jwt::JwtKeys, AppState};
use http_body_util::BodyExt;
use uuid::Uuid;

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn access_token(state: &AppState, user_id: Uuid) -> String {
    JwtKeys::from_ref(state).sign_access(user_id).unwrap()
}

pub fn refresh_token(state: &AppState, user_id: Uuid) -> String {
    JwtKeys::from_ref(state).sign_refresh(user_id).unwrap()
}
