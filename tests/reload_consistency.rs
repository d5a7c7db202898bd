//! Snapshot consistency under concurrent descriptor reload.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lambda_edge_proxy::invoke::{InvocationOutcome, Invoker};
use lambda_edge_proxy::pipeline::Engine;
use lambda_edge_proxy::routing::{EventType, PathPattern, RoutingEntry, RoutingTable};

struct NullInvoker;

#[async_trait]
impl Invoker for NullInvoker {
    async fn invoke(&self, _: &str, _: serde_json::Value) -> InvocationOutcome {
        InvocationOutcome::Continue(Default::default())
    }
}

/// Build a table whose every entry is tagged with one generation, so a
/// mixed-generation snapshot is detectable.
fn generation_table(generation: u32) -> RoutingTable {
    let mut table = RoutingTable::default();
    for i in 0..20 {
        table.push(RoutingEntry {
            pattern: PathPattern::new(format!("/g/{i}/*")),
            event_type: EventType::ViewerRequest,
            function_name: format!("gen-{generation}"),
            include_body: false,
        });
    }
    table
}

#[tokio::test]
async fn concurrent_reload_never_exposes_a_mixed_table() {
    let engine = Arc::new(Engine::new(generation_table(0), Box::new(NullInvoker)));

    // Swapper: rebuild the table wholesale, generation by generation.
    let swapper = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for generation in 1..200u32 {
                engine.reload_routes(generation_table(generation));
                tokio::time::sleep(Duration::from_micros(50)).await;
            }
        })
    };

    // 100 concurrent readers resolving routes while swaps happen.
    let mut readers = Vec::new();
    for reader in 0..100 {
        let engine = engine.clone();
        readers.push(tokio::spawn(async move {
            for i in 0..200 {
                let snapshot = engine.routes();
                let entries = snapshot.entries(EventType::ViewerRequest);
                let first = entries.first().expect("table never empty").function_name.clone();
                for entry in entries {
                    assert_eq!(
                        entry.function_name, first,
                        "reader {reader} iteration {i}: snapshot mixes generations"
                    );
                }
                let hit = snapshot.lookup(EventType::ViewerRequest, "/g/7/x").unwrap();
                assert_eq!(hit.function_name, first);
                tokio::task::yield_now().await;
            }
        }));
    }

    for reader in readers {
        reader.await.unwrap();
    }
    swapper.await.unwrap();
}
