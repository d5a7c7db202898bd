//! Per-request stage sequencing.

use std::time::Instant;

use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use uuid::Uuid;

use crate::event::{self, InterceptedRequest, SyntheticResponse};
use crate::invoke::InvocationOutcome;
use crate::observability::metrics;
use crate::pipeline::Engine;
use crate::routing::EventType;

/// Status codes for the failure taxonomy. Distinct per kind so a
/// developer can tell the failures apart from the client side.
const STATUS_POLICY_VIOLATION: StatusCode = StatusCode::BAD_REQUEST;
const STATUS_FUNCTION_ERROR: StatusCode = StatusCode::BAD_GATEWAY;
const STATUS_TRANSPORT_FAILURE: StatusCode = StatusCode::GATEWAY_TIMEOUT;
const STATUS_MALFORMED: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Terminal state of one request's trip through the pipeline.
#[derive(Debug)]
pub enum Disposition {
    /// Forward the request, with accumulated mutations, to the origin.
    Forward,
    /// A response is installed; the request goes no further.
    Respond(SyntheticResponse),
}

impl Engine {
    /// Run the two request stages against one intercepted request.
    ///
    /// The request is mutated in place by `Continue` outcomes; the
    /// origin-request lookup uses the viewer-request-mutated URI.
    pub async fn handle(&self, request: &mut InterceptedRequest) -> Disposition {
        let request_id = Uuid::new_v4().to_string();
        let routes = self.routes();
        let invoker = self.invoker();

        for stage in [EventType::ViewerRequest, EventType::OriginRequest] {
            let Some(entry) = routes.lookup(stage, request.path()) else {
                tracing::trace!(request_id = %request_id, stage = %stage, path = request.path(), "no routing entry, stage is a no-op");
                continue;
            };

            tracing::debug!(
                request_id = %request_id,
                stage = %stage,
                pattern = %entry.pattern,
                function = %entry.function_name,
                "dispatching edge function"
            );

            let event = event::encode(request, stage, entry.include_body, &request_id);
            let payload = match serde_json::to_value(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "event envelope serialization failed");
                    metrics::record_stage(stage, "internal-error");
                    return Disposition::Respond(error_response(
                        STATUS_MALFORMED,
                        format!("Lambda@Edge: event serialization failed: {e}"),
                    ));
                }
            };

            let started = Instant::now();
            let outcome = invoker.invoke(&entry.function_name, payload).await;
            metrics::record_invoke(&entry.function_name, started.elapsed());

            match outcome {
                InvocationOutcome::Continue(envelope) => {
                    match event::apply_mutation(request, &envelope) {
                        Ok(()) => {
                            metrics::record_stage(stage, "continue");
                        }
                        Err(violation) => {
                            tracing::error!(request_id = %request_id, stage = %stage, %violation, "mutation rejected");
                            metrics::record_stage(stage, "policy-violation");
                            return Disposition::Respond(error_response(
                                STATUS_POLICY_VIOLATION,
                                format!("Lambda@Edge: {violation}"),
                            ));
                        }
                    }
                }
                InvocationOutcome::Direct(envelope) => {
                    metrics::record_stage(stage, "direct");
                    return match event::build_direct_response(&envelope) {
                        Ok(response) => Disposition::Respond(response),
                        Err(violation) => {
                            // The envelope's body is never used on this path.
                            tracing::error!(request_id = %request_id, stage = %stage, %violation, "direct response rejected");
                            metrics::record_stage(stage, "policy-violation");
                            Disposition::Respond(error_response(
                                STATUS_POLICY_VIOLATION,
                                format!("Lambda@Edge: {violation}"),
                            ))
                        }
                    };
                }
                InvocationOutcome::FunctionError { message } => {
                    metrics::record_stage(stage, "function-error");
                    return Disposition::Respond(error_response(
                        STATUS_FUNCTION_ERROR,
                        format!("Lambda@Edge error: {message}"),
                    ));
                }
                InvocationOutcome::TransportFailure { cause } => {
                    metrics::record_stage(stage, "transport-failure");
                    return Disposition::Respond(error_response(
                        STATUS_TRANSPORT_FAILURE,
                        format!("Lambda@Edge endpoint unreachable: {cause}"),
                    ));
                }
                InvocationOutcome::Malformed { raw } => {
                    metrics::record_stage(stage, "malformed");
                    let detail = if raw.is_empty() {
                        "function returned no payload".to_string()
                    } else {
                        format!("function payload not parseable ({} bytes)", raw.len())
                    };
                    return Disposition::Respond(error_response(
                        STATUS_MALFORMED,
                        format!("Lambda@Edge: {detail}"),
                    ));
                }
            }
        }

        Disposition::Forward
    }
}

fn error_response(status: StatusCode, message: String) -> SyntheticResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    SyntheticResponse {
        status,
        status_description: None,
        headers,
        body: Bytes::from(message),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::http::Method;

    use super::*;
    use crate::event::{DirectResponse, MutationEnvelope};
    use crate::invoke::Invoker;
    use crate::routing::{PathPattern, RoutingEntry, RoutingTable};

    /// Invoker returning scripted outcomes in order, recording calls.
    struct ScriptedInvoker {
        script: Mutex<Vec<InvocationOutcome>>,
        calls: std::sync::Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    }

    impl ScriptedInvoker {
        fn new(script: Vec<InvocationOutcome>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: std::sync::Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_log(&self) -> std::sync::Arc<Mutex<Vec<(String, serde_json::Value)>>> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl Invoker for ScriptedInvoker {
        async fn invoke(&self, function_name: &str, payload: serde_json::Value) -> InvocationOutcome {
            self.calls.lock().unwrap().push((function_name.to_string(), payload));
            let mut script = self.script.lock().unwrap();
            assert!(!script.is_empty(), "unexpected invocation of {function_name}");
            script.remove(0)
        }
    }

    fn entry(pattern: &str, event_type: EventType, name: &str) -> RoutingEntry {
        RoutingEntry {
            pattern: PathPattern::new(pattern),
            event_type,
            function_name: name.to_string(),
            include_body: false,
        }
    }

    fn request(path_and_query: &str) -> InterceptedRequest {
        InterceptedRequest {
            client_ip: "127.0.0.1".parse().unwrap(),
            method: Method::GET,
            path_and_query: path_and_query.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn mutation(json: &str) -> MutationEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn no_matching_entry_forwards_unchanged() {
        let mut table = RoutingTable::default();
        table.push(entry("/api/*", EventType::ViewerRequest, "fnA"));
        let engine = Engine::new(table, Box::new(ScriptedInvoker::new(vec![])));

        let mut req = request("/static/app.js");
        let disposition = engine.handle(&mut req).await;
        assert!(matches!(disposition, Disposition::Forward));
        assert_eq!(req.path_and_query, "/static/app.js");
    }

    #[tokio::test]
    async fn origin_stage_routes_on_the_mutated_uri() {
        let mut table = RoutingTable::default();
        table.push(entry("*", EventType::ViewerRequest, "rewriter"));
        table.push(entry("/rewritten/*", EventType::OriginRequest, "origin-fn"));

        let invoker = ScriptedInvoker::new(vec![
            InvocationOutcome::Continue(mutation(r#"{"uri": "/rewritten/page"}"#)),
            InvocationOutcome::Continue(mutation("{}")),
        ]);
        let engine = Engine::new(table, Box::new(invoker));

        let mut req = request("/original/page");
        let disposition = engine.handle(&mut req).await;
        assert!(matches!(disposition, Disposition::Forward));
        assert_eq!(req.path_and_query, "/rewritten/page");
    }

    #[tokio::test]
    async fn direct_response_short_circuits_origin_stage() {
        let mut table = RoutingTable::default();
        table.push(entry("*", EventType::ViewerRequest, "responder"));
        table.push(entry("*", EventType::OriginRequest, "never-called"));

        let direct: DirectResponse =
            serde_json::from_str(r#"{"status": 302, "headers": {"location": [{"key": "Location", "value": "/login"}]}}"#)
                .unwrap();
        let engine = Engine::new(
            table,
            Box::new(ScriptedInvoker::new(vec![InvocationOutcome::Direct(direct)])),
        );

        let mut req = request("/private");
        match engine.handle(&mut req).await {
            Disposition::Respond(response) => {
                assert_eq!(response.status.as_u16(), 302);
                assert_eq!(response.headers.get("location").unwrap(), "/login");
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_uri_mutation_yields_client_error_without_mutation() {
        let mut table = RoutingTable::default();
        table.push(entry("*", EventType::ViewerRequest, "fn"));
        let invoker =
            ScriptedInvoker::new(vec![InvocationOutcome::Continue(mutation(r#"{"uri": "nope"}"#))]);
        let engine = Engine::new(table, Box::new(invoker));

        let mut req = request("/page");
        match engine.handle(&mut req).await {
            Disposition::Respond(response) => {
                assert!(response.status.is_client_error());
            }
            other => panic!("expected Respond, got {other:?}"),
        }
        assert_eq!(req.path_and_query, "/page");
    }

    #[tokio::test]
    async fn direct_response_with_forbidden_header_uses_error_body() {
        let mut table = RoutingTable::default();
        table.push(entry("*", EventType::ViewerRequest, "fn"));
        let direct: DirectResponse = serde_json::from_str(
            r#"{"status": 200, "body": "function body", "headers": {"connection": [{"value": "close"}]}}"#,
        )
        .unwrap();
        let engine = Engine::new(
            table,
            Box::new(ScriptedInvoker::new(vec![InvocationOutcome::Direct(direct)])),
        );

        let mut req = request("/page");
        match engine.handle(&mut req).await {
            Disposition::Respond(response) => {
                assert_eq!(response.status, STATUS_POLICY_VIOLATION);
                assert_ne!(&response.body[..], b"function body");
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_outcomes_map_to_distinct_statuses() {
        for (outcome, expected) in [
            (
                InvocationOutcome::FunctionError { message: "Unhandled: boom".into() },
                STATUS_FUNCTION_ERROR,
            ),
            (
                InvocationOutcome::TransportFailure { cause: "connection refused".into() },
                STATUS_TRANSPORT_FAILURE,
            ),
            (InvocationOutcome::Malformed { raw: Bytes::new() }, STATUS_MALFORMED),
            (
                InvocationOutcome::Malformed { raw: Bytes::from_static(b"garbage") },
                STATUS_MALFORMED,
            ),
        ] {
            let mut table = RoutingTable::default();
            table.push(entry("*", EventType::ViewerRequest, "fn"));
            let engine = Engine::new(table, Box::new(ScriptedInvoker::new(vec![outcome])));

            let mut req = request("/page");
            match engine.handle(&mut req).await {
                Disposition::Respond(response) => assert_eq!(response.status, expected),
                other => panic!("expected Respond, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn malformed_messages_distinguish_empty_from_garbage() {
        for (raw, needle) in [
            (Bytes::new(), "no payload"),
            (Bytes::from_static(b"garbage"), "not parseable"),
        ] {
            let mut table = RoutingTable::default();
            table.push(entry("*", EventType::ViewerRequest, "fn"));
            let engine = Engine::new(
                table,
                Box::new(ScriptedInvoker::new(vec![InvocationOutcome::Malformed { raw }])),
            );
            let mut req = request("/page");
            match engine.handle(&mut req).await {
                Disposition::Respond(response) => {
                    let body = String::from_utf8_lossy(&response.body).to_string();
                    assert!(body.contains(needle), "body {body:?} should contain {needle:?}");
                }
                other => panic!("expected Respond, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn both_stages_invoke_their_own_functions() {
        let mut table = RoutingTable::default();
        table.push(entry("*", EventType::ViewerRequest, "viewer-fn"));
        table.push(entry("*", EventType::OriginRequest, "origin-fn"));

        let invoker = ScriptedInvoker::new(vec![
            InvocationOutcome::Continue(mutation("{}")),
            InvocationOutcome::Continue(mutation("{}")),
        ]);
        let calls = invoker.call_log();
        let engine = Engine::new(table, Box::new(invoker));

        let mut req = request("/page");
        let disposition = engine.handle(&mut req).await;
        assert!(matches!(disposition, Disposition::Forward));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "viewer-fn");
        assert_eq!(calls[1].0, "origin-fn");
        assert_eq!(
            calls[0].1["Records"][0]["cf"]["config"]["eventType"],
            "viewer-request"
        );
        assert_eq!(
            calls[1].1["Records"][0]["cf"]["config"]["eventType"],
            "origin-request"
        );
    }

    #[tokio::test]
    async fn reload_swaps_routes_for_new_requests() {
        let mut table = RoutingTable::default();
        table.push(entry("*", EventType::ViewerRequest, "old-fn"));
        let invoker = ScriptedInvoker::new(vec![InvocationOutcome::Continue(mutation("{}"))]);
        let engine = Engine::new(table, Box::new(invoker));

        let mut replacement = RoutingTable::default();
        replacement.push(entry("/only/*", EventType::ViewerRequest, "new-fn"));
        engine.reload_routes(replacement);

        // Path no longer matched by the new table: nothing is invoked.
        let mut req = request("/page");
        let disposition = engine.handle(&mut req).await;
        assert!(matches!(disposition, Disposition::Forward));
    }
}
