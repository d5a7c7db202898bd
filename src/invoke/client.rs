//! HTTP client for the local Lambda invocation endpoint.

use std::time::Duration;

use async_trait::async_trait;

use crate::invoke::{InvocationOutcome, Invoker};

/// Header the invocation endpoint sets when the function raised.
const FUNCTION_ERROR_HEADER: &str = "x-amz-function-error";

/// Client for a local Lambda-compatible invocation endpoint
/// (SAM local, LocalStack). Synchronous from the pipeline's point of
/// view: one bounded call per stage per request, no retries.
pub struct LambdaClient {
    http: reqwest::Client,
    endpoint: String,
}

impl LambdaClient {
    /// Build a client against `endpoint` with the given read timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn invoke_url(&self, function_name: &str) -> String {
        format!("{}/2015-03-31/functions/{}/invocations", self.endpoint, function_name)
    }
}

#[async_trait]
impl Invoker for LambdaClient {
    async fn invoke(&self, function_name: &str, payload: serde_json::Value) -> InvocationOutcome {
        let response = match self.http.post(self.invoke_url(function_name)).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(function = function_name, error = %e, "invocation transport failure");
                return InvocationOutcome::TransportFailure { cause: e.to_string() };
            }
        };

        let status = response.status();
        let error_marker = response
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let raw = match response.bytes().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(function = function_name, error = %e, "invocation read failure");
                return InvocationOutcome::TransportFailure { cause: e.to_string() };
            }
        };

        if !status.is_success() {
            tracing::error!(function = function_name, status = status.as_u16(), "invocation status");
            return InvocationOutcome::FunctionError {
                message: format!("invocation returned status {}", status.as_u16()),
            };
        }

        if raw.is_empty() {
            return InvocationOutcome::Malformed { raw };
        }

        let value: serde_json::Value = match serde_json::from_slice(&raw) {
            Ok(value) => value,
            Err(e) => {
                // Logged verbatim: a truncated timeout payload looks very
                // different from a function printing to stdout.
                tracing::error!(
                    function = function_name,
                    error = %e,
                    payload = %String::from_utf8_lossy(&raw),
                    "invocation payload not parseable"
                );
                return InvocationOutcome::Malformed { raw };
            }
        };

        if let Some(marker) = error_marker {
            tracing::error!(function = function_name, marker = %marker, detail = %value, "function error");
            return InvocationOutcome::FunctionError {
                message: format!("{marker}: {value}"),
            };
        }

        if value.get("status").is_some() {
            match serde_json::from_value(value) {
                Ok(direct) => InvocationOutcome::Direct(direct),
                Err(e) => {
                    tracing::error!(
                        function = function_name,
                        error = %e,
                        payload = %String::from_utf8_lossy(&raw),
                        "direct-response envelope not parseable"
                    );
                    InvocationOutcome::Malformed { raw }
                }
            }
        } else {
            match serde_json::from_value(value) {
                Ok(envelope) => InvocationOutcome::Continue(envelope),
                Err(e) => {
                    tracing::error!(
                        function = function_name,
                        error = %e,
                        payload = %String::from_utf8_lossy(&raw),
                        "mutation envelope not parseable"
                    );
                    InvocationOutcome::Malformed { raw }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::Router;

    use super::*;

    async fn serve(addr: SocketAddr, router: Router) {
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    fn client(addr: SocketAddr) -> LambdaClient {
        LambdaClient::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_failure() {
        let client = LambdaClient::new("http://127.0.0.1:39999", Duration::from_millis(300)).unwrap();
        let outcome = client.invoke("fn", serde_json::json!({})).await;
        assert!(matches!(outcome, InvocationOutcome::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn mutation_payload_is_continue() {
        let addr: SocketAddr = "127.0.0.1:39871".parse().unwrap();
        let router = Router::new().route(
            "/2015-03-31/functions/{name}/invocations",
            post(|| async { r#"{"uri": "/rewritten"}"# }),
        );
        serve(addr, router).await;

        let outcome = client(addr).invoke("fn", serde_json::json!({})).await;
        match outcome {
            InvocationOutcome::Continue(envelope) => {
                assert_eq!(envelope.uri.as_deref(), Some("/rewritten"));
            }
            other => panic!("expected Continue, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_field_means_direct() {
        let addr: SocketAddr = "127.0.0.1:39872".parse().unwrap();
        let router = Router::new().route(
            "/2015-03-31/functions/{name}/invocations",
            post(|| async { r#"{"status": "204"}"# }),
        );
        serve(addr, router).await;

        let outcome = client(addr).invoke("fn", serde_json::json!({})).await;
        match outcome {
            InvocationOutcome::Direct(direct) => assert_eq!(direct.status, 204),
            other => panic!("expected Direct, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_marker_beats_payload_shape() {
        let addr: SocketAddr = "127.0.0.1:39873".parse().unwrap();
        let router = Router::new().route(
            "/2015-03-31/functions/{name}/invocations",
            post(|| async {
                let mut headers = HeaderMap::new();
                headers.insert("x-amz-function-error", "Unhandled".parse().unwrap());
                (headers, r#"{"errorMessage": "boom"}"#)
            }),
        );
        serve(addr, router).await;

        let outcome = client(addr).invoke("fn", serde_json::json!({})).await;
        match outcome {
            InvocationOutcome::FunctionError { message } => {
                assert!(message.contains("Unhandled"));
                assert!(message.contains("boom"));
            }
            other => panic!("expected FunctionError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_and_garbage_payloads_are_malformed() {
        let addr: SocketAddr = "127.0.0.1:39874".parse().unwrap();
        let router = Router::new()
            .route("/2015-03-31/functions/empty/invocations", post(|| async { "" }))
            .route("/2015-03-31/functions/garbage/invocations", post(|| async { "not json" }));
        serve(addr, router).await;

        let c = client(addr);
        match c.invoke("empty", serde_json::json!({})).await {
            InvocationOutcome::Malformed { raw } => assert!(raw.is_empty()),
            other => panic!("expected Malformed, got {other:?}"),
        }
        match c.invoke("garbage", serde_json::json!({})).await {
            InvocationOutcome::Malformed { raw } => assert_eq!(&raw[..], b"not json"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_is_function_error() {
        let addr: SocketAddr = "127.0.0.1:39875".parse().unwrap();
        let router = Router::new().route(
            "/2015-03-31/functions/{name}/invocations",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "{}") }),
        );
        serve(addr, router).await;

        let outcome = client(addr).invoke("fn", serde_json::json!({})).await;
        match outcome {
            InvocationOutcome::FunctionError { message } => assert!(message.contains("500")),
            other => panic!("expected FunctionError, got {other:?}"),
        }
    }
}
