//! File watchers for hot reload.
//!
//! Two files feed the running engine: the process config (rebuilds the
//! invocation client) and the deployment descriptor (rebuilds the
//! routing table). Both are watched the same way; a failed reload keeps
//! the current state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;
use crate::descriptor;
use crate::routing::RoutingTable;

/// A reload event delivered to the server's apply loop.
#[derive(Debug)]
pub enum Reload {
    /// Process config changed and revalidated.
    Config(ProxyConfig),
    /// Descriptor changed and resolved into a fresh table.
    Descriptor(RoutingTable),
}

#[derive(Clone, Copy)]
enum WatchedKind {
    Config,
    Descriptor,
}

/// Watches one file and emits [`Reload`] events on change.
pub struct ReloadWatcher {
    path: PathBuf,
    kind: WatchedKind,
    update_tx: mpsc::UnboundedSender<Reload>,
}

impl ReloadWatcher {
    pub fn config(path: &Path, update_tx: mpsc::UnboundedSender<Reload>) -> Self {
        Self { path: path.to_path_buf(), kind: WatchedKind::Config, update_tx }
    }

    pub fn descriptor(path: &Path, update_tx: mpsc::UnboundedSender<Reload>) -> Self {
        Self { path: path.to_path_buf(), kind: WatchedKind::Descriptor, update_tx }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let kind = self.kind;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !event.kind.is_modify() && !event.kind.is_create() {
                        return;
                    }
                    match kind {
                        WatchedKind::Config => {
                            tracing::info!(path = ?path, "config file change detected, reloading");
                            match load_config(&path) {
                                Ok(config) => {
                                    let _ = tx.send(Reload::Config(config));
                                }
                                Err(e) => {
                                    tracing::error!("failed to reload config: {}. Keeping current configuration.", e);
                                }
                            }
                        }
                        WatchedKind::Descriptor => {
                            tracing::info!(path = ?path, "descriptor change detected, reloading");
                            match descriptor::load(&path) {
                                Ok(table) => {
                                    let _ = tx.send(Reload::Descriptor(table));
                                }
                                Err(e) => {
                                    tracing::error!("failed to reload descriptor: {}. Keeping current routing table.", e);
                                }
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "file watcher started");
        Ok(watcher)
    }
}
