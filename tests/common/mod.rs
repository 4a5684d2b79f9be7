#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use collab_session_relay::config::Config;
use collab_session_relay::ws::mutation::MessagePolicy;
use collab_session_relay::ws::session::ExpiryPolicy;
use collab_session_relay::ws::store::SessionStore;
use collab_session_relay::{build_app, AppState};

pub fn test_state(policy: MessagePolicy) -> AppState {
    AppState::new(Arc::new(SessionStore::new(ExpiryPolicy::default())), policy)
}

pub fn test_app(state: AppState) -> Router {
    build_app(state, &Config::default())
}

/// Send one request through the router and decode the JSON body (Null when empty).
pub async fn call(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Start a real listener for streaming tests. The server runs in the background.
pub async fn start_server(state: AppState) -> SocketAddr {
    let app = test_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
