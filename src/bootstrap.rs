//! Composition Root
//!
//! Constructs the shared services exactly once and wires them together.
//! Nothing in this crate is a global singleton: consumers receive the
//! `Arc`s assembled here by reference.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{shared_cache, SharedCache};
use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;
use crate::http::{ApiClient, Transport};
use crate::offline::{FormStore, OfflineQueue};
use crate::tasks::spawn_sweep_task;

// == Services ==
/// The assembled client services plus handles to their background tasks.
pub struct Services {
    pub config: Config,
    pub cache: SharedCache,
    pub monitor: Arc<ConnectivityMonitor>,
    pub offline: Arc<OfflineQueue>,
    pub api: Arc<ApiClient>,
    /// Periodic cache sweep; abort on shutdown
    pub sweep_handle: JoinHandle<()>,
    /// Replay-on-reconnect listener; abort on shutdown
    pub reconnect_handle: JoinHandle<()>,
}

impl Services {
    // == Build ==
    /// Single construction point for the whole pipeline.
    ///
    /// The caller supplies the durable form store and the transport, which
    /// is what lets tests substitute mocks for both.
    pub fn build(
        config: Config,
        form_store: Arc<dyn FormStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let cache = shared_cache();
        let monitor = Arc::new(ConnectivityMonitor::new(true));

        let offline = Arc::new(OfflineQueue::new(
            form_store,
            Arc::clone(&transport),
            Arc::clone(&monitor),
        ));

        let api = Arc::new(ApiClient::new(
            config.clone(),
            cache.clone(),
            transport,
            Arc::clone(&monitor),
            Arc::clone(&offline),
        ));

        let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_interval);
        let reconnect_handle = offline.spawn_reconnect_listener();

        info!(
            api_url = %config.api_url,
            cache_enabled = config.cache_enabled,
            offline_enabled = config.offline_enabled,
            "client services initialized"
        );

        Self {
            config,
            cache,
            monitor,
            offline,
            api,
            sweep_handle,
            reconnect_handle,
        }
    }

    // == Shutdown ==
    /// Aborts the background tasks. Pending offline records stay in durable
    /// storage and replay on the next start.
    pub fn shutdown(&self) {
        self.sweep_handle.abort();
        self.reconnect_handle.abort();
    }
}
