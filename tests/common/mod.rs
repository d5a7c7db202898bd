//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Json, Path};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

async fn serve(addr: SocketAddr, router: Router) {
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Start a programmable Lambda invocation endpoint. The handler receives
/// the function name and the event payload and returns the full response.
pub async fn start_function_endpoint<F>(addr: SocketAddr, handler: F)
where
    F: Fn(&str, serde_json::Value) -> Response + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let router = Router::new().route(
        "/2015-03-31/functions/{name}/invocations",
        post(move |Path(name): Path<String>, Json(payload): Json<serde_json::Value>| {
            let handler = handler.clone();
            async move { handler(&name, payload) }
        }),
    );
    serve(addr, router).await;
}

/// Start a mock origin that counts hits and echoes the request line plus
/// the `x-added` header value, so tests can observe applied mutations.
#[allow(dead_code)]
pub async fn start_echo_origin(addr: SocketAddr, hits: Arc<AtomicU32>) {
    let router = Router::new().fallback(move |req: Request<Body>| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            let added = req
                .headers()
                .get("x-added")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            format!("{}|{}", req.uri(), added).into_response()
        }
    });
    serve(addr, router).await;
}
