//! Shared engine state: the routing table and the invocation client.
//!
//! Both pieces are rebuilt wholesale on reload (descriptor change,
//! endpoint change) and swapped atomically; in-flight requests keep the
//! snapshot they loaded.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::invoke::Invoker;
use crate::routing::RoutingTable;

pub struct Engine {
    routes: ArcSwap<RoutingTable>,
    invoker: ArcSwap<Box<dyn Invoker>>,
}

impl Engine {
    pub fn new(routes: RoutingTable, invoker: Box<dyn Invoker>) -> Self {
        Self {
            routes: ArcSwap::from_pointee(routes),
            invoker: ArcSwap::from_pointee(invoker),
        }
    }

    /// Swap in a freshly resolved routing table.
    pub fn reload_routes(&self, table: RoutingTable) {
        tracing::info!(entries = table.len(), "routing table swapped");
        self.routes.store(Arc::new(table));
    }

    /// Swap in a rebuilt invocation client (endpoint change).
    pub fn set_invoker(&self, invoker: Box<dyn Invoker>) {
        self.invoker.store(Arc::new(invoker));
    }

    /// Immutable routing snapshot for one request's lifetime.
    pub fn routes(&self) -> Arc<RoutingTable> {
        self.routes.load_full()
    }

    pub fn invoker(&self) -> Arc<Box<dyn Invoker>> {
        self.invoker.load_full()
    }
}
