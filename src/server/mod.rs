//! Proxy host adapter.
//!
//! # Responsibilities
//! - Accept intercepted requests (Axum, one task per request)
//! - Buffer the body and capture the client address
//! - Run the request pipeline; install its terminal response, or
//!   forward the mutated request to the configured origin
//! - Apply config/descriptor reloads delivered by the watchers
//!
//! # Design Decisions
//! - Origin forwarding uses the hyper-util legacy client with
//!   title-case headers, the wire convention most origins expect
//! - The response-intercepted hook is an inert pass-through; there is
//!   no per-request memory of which routing entry applied
//! - Client disconnect drops the handler task; an in-flight invocation
//!   result is never applied

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ProxyConfig, Reload};
use crate::event::{InterceptedRequest, SyntheticResponse};
use crate::invoke::LambdaClient;
use crate::pipeline::{Disposition, Engine};

/// Largest request body the adapter will buffer for translation.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Application state injected into the intercept handler.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
    client: Client<HttpConnector, Body>,
    origin: String,
}

/// The intercepting HTTP server.
pub struct ProxyServer {
    router: Router,
    engine: Arc<Engine>,
}

impl ProxyServer {
    pub fn new(config: &ProxyConfig, engine: Arc<Engine>) -> Self {
        let mut builder = Client::builder(TokioExecutor::new());
        builder.http1_title_case_headers(true);
        let client = builder.build(HttpConnector::new());

        let state = AppState {
            engine: engine.clone(),
            client,
            origin: config.origin.address.clone(),
        };

        let router = Router::new()
            .route("/{*path}", any(intercept_handler))
            .route("/", any(intercept_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http());

        Self { router, engine }
    }

    /// Run the server until shutdown, applying reloads as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut reloads: mpsc::UnboundedReceiver<Reload>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "intercepting proxy starting");

        let engine = self.engine.clone();
        tokio::spawn(async move {
            while let Some(reload) = reloads.recv().await {
                match reload {
                    Reload::Descriptor(table) => engine.reload_routes(table),
                    Reload::Config(config) => {
                        match LambdaClient::new(
                            &config.lambda.endpoint,
                            Duration::from_secs(config.lambda.invoke_timeout_secs),
                        ) {
                            Ok(client) => {
                                tracing::info!(endpoint = %config.lambda.endpoint, "invocation client rebuilt");
                                engine.set_invoker(Box::new(client));
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "failed to rebuild invocation client");
                            }
                        }
                    }
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("intercepting proxy stopped");
        Ok(())
    }
}

/// Request-intercepted hook: translate, dispatch, re-apply.
async fn intercept_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut intercepted = InterceptedRequest {
        client_ip: addr.ip(),
        method: parts.method,
        path_and_query,
        headers: parts.headers,
        body,
    };

    match state.engine.handle(&mut intercepted).await {
        Disposition::Respond(response) => synthetic_response(response),
        Disposition::Forward => forward_to_origin(&state, intercepted).await,
    }
}

fn synthetic_response(synthetic: SyntheticResponse) -> Response {
    if let Some(description) = &synthetic.status_description {
        // hyper always writes the canonical reason phrase.
        tracing::debug!(status = %synthetic.status, description = %description, "status description");
    }
    let mut response = Response::new(Body::from(synthetic.body));
    *response.status_mut() = synthetic.status;
    *response.headers_mut() = synthetic.headers;
    response
}

/// Forward the (possibly mutated) request to the origin and stream the
/// response back. The response-side hook stages are not implemented.
async fn forward_to_origin(state: &AppState, request: InterceptedRequest) -> Response {
    let uri: Uri = match format!("http://{}{}", state.origin, request.path_and_query).parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(error = %e, "mutated request produced an invalid origin uri");
            return (StatusCode::BAD_GATEWAY, "invalid origin uri").into_response();
        }
    };

    let mut builder = Request::builder().method(request.method).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        *headers = request.headers;
    }
    let outbound = match builder.body(Body::from(request.body)) {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::error!(error = %e, "failed to build origin request");
            return (StatusCode::BAD_GATEWAY, "failed to build origin request").into_response();
        }
    };

    match state.client.request(outbound).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "origin request failed");
            (StatusCode::BAD_GATEWAY, "origin request failed").into_response()
        }
    }
}
