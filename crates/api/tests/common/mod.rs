#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use rollcall_core::collection::Collection;
use rollcall_core::row::MirrorRow;
use rollcall_db::{DbError, MirrorStore};
use rollcall_pipeline::Dispatcher;
use tower::ServiceExt;

use rollcall_api::config::ServerConfig;
use rollcall_api::router::build_app_router;
use rollcall_api::state::AppState;

pub const RESOURCE_PREFIX: &str = "projects/demo/databases/(default)/documents";

/// Build the full application router over `store`, with the same middleware
/// stack as the binary.
pub fn build_test_app(store: Arc<dyn MirrorStore>) -> Router {
    let state = AppState {
        dispatcher: Dispatcher::new(store),
        config: Arc::new(ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
        }),
    };
    build_app_router(state)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a document event with optional `ce-*` headers.
pub async fn post_event(
    app: Router,
    body: impl Into<Body>,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/events")
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(body.into()).unwrap()).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `{"value": {...}}` event body for a write of `path`.
pub fn write_event(path: &str, fields: serde_json::Value, update_time: &str) -> String {
    serde_json::json!({
        "value": {
            "name": format!("{RESOURCE_PREFIX}/{path}"),
            "fields": fields,
            "updateTime": update_time,
        }
    })
    .to_string()
}

/// `{"oldValue": {...}}` event body for a delete of `path`.
pub fn delete_event(path: &str) -> String {
    serde_json::json!({
        "oldValue": {
            "name": format!("{RESOURCE_PREFIX}/{path}"),
            "fields": {},
        }
    })
    .to_string()
}

/// Store whose every call fails as if the database were unreachable.
#[derive(Debug, Default)]
pub struct UnreachableStore;

#[async_trait]
impl MirrorStore for UnreachableStore {
    async fn upsert(&self, _row: &MirrorRow) -> Result<bool, DbError> {
        Err(DbError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn delete(&self, _collection: Collection, _id: &str) -> Result<bool, DbError> {
        Err(DbError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Err(DbError::Database(sqlx::Error::PoolTimedOut))
    }
}
