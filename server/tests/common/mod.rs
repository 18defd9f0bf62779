//! Common utilities for HTTP tests

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use steward_core::Steward;
use steward_storage_memory::MemoryStore;
use tower::ServiceExt;
use tracing::Level;

pub const ORIGIN: &str = "http://localhost:4200";

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Users 1..=3, roles 1..=2 and one row in each lookup table.
pub fn app() -> Result<Router> {
    let store = MemoryStore::builder()
        .user("ayu", "ayu-secret")
        .user("bima", "bima-secret")
        .user("citra", "citra-secret")
        .role("owner")
        .role("maintainer")
        .tracker("feature")
        .activity("design")
        .priority("normal")
        .state("new")
        .build();
    steward_server::router(Steward::new(Arc::new(store)), &[ORIGIN.to_owned()])
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

pub async fn call(app: &Router, method: Method, uri: &str, body: Option<&str>) -> Result<Reply> {
    let request = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_owned()))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok(Reply { status, body })
}

pub async fn get(app: &Router, uri: &str) -> Result<Reply> { call(app, Method::GET, uri, None).await }

pub async fn post(app: &Router, uri: &str, body: &str) -> Result<Reply> { call(app, Method::POST, uri, Some(body)).await }

pub async fn put(app: &Router, uri: &str, body: &str) -> Result<Reply> { call(app, Method::PUT, uri, Some(body)).await }

pub const NEW_PROJECT: &str = r#"{"projectName":"Gudang","description":"stock","creatorId":1,"targetDate":"2025-06-30T00:00:00Z","picId":2}"#;
