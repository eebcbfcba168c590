//! Offline Queue Module
//!
//! Persists mutating requests that failed while offline and replays them
//! when connectivity returns. Replay failures are per-record: one bad record
//! never blocks the rest, and a failed record stays in storage for the next
//! pass.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connectivity::{ConnectivityMonitor, SyncEvent};
use crate::error::ApiError;
use crate::http::{Method, Transport, TransportRequest};
use crate::offline::{FormStore, QueuedFormDraft};

// == Replay Outcome ==
/// Result of replaying a single queued record.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub id: u64,
    pub url: String,
    pub ok: bool,
    /// Failure description when `ok` is false
    pub error: Option<String>,
}

// == Replay Report ==
/// Aggregate result of one replay pass.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// True only if zero records failed
    pub success: bool,
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<ReplayOutcome>,
}

impl ReplayReport {
    /// The report returned without touching storage (offline, or storage
    /// unreadable).
    fn skipped() -> Self {
        Self {
            success: false,
            ..Self::default()
        }
    }
}

// == Offline Queue ==
/// Durable queue of failed mutating requests with replay-on-reconnect.
pub struct OfflineQueue {
    store: Arc<dyn FormStore>,
    transport: Arc<dyn Transport>,
    monitor: Arc<ConnectivityMonitor>,
}

impl OfflineQueue {
    // == Constructor ==
    pub fn new(
        store: Arc<dyn FormStore>,
        transport: Arc<dyn Transport>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            store,
            transport,
            monitor,
        }
    }

    // == Save Form For Later ==
    /// Appends a durable replay record.
    ///
    /// Returns `true` on successful persistence, `false` on any storage
    /// failure; never an error to the caller. A request that cannot be
    /// persisted is lost, not a crash.
    pub async fn save_form_for_later(
        &self,
        url: impl Into<String>,
        method: Method,
        headers: HashMap<String, String>,
        body: Option<Value>,
    ) -> bool {
        let url = url.into();
        let draft = QueuedFormDraft {
            url: url.clone(),
            method,
            headers,
            body,
            queued_at: Utc::now(),
        };

        match self.store.add(draft).await {
            Ok(id) => {
                info!(id, %method, url, "queued request for offline replay");
                true
            }
            Err(err) => {
                let err = ApiError::from(err);
                warn!(%method, url, error = %err, "failed to persist offline request");
                false
            }
        }
    }

    // == Pending Count ==
    /// Number of records currently stored. A storage read failure reads as
    /// zero pending records.
    pub async fn pending_count(&self) -> usize {
        match self.store.get_all().await {
            Ok(forms) => forms.len(),
            Err(err) => {
                warn!(error = %ApiError::from(err), "failed to read offline queue");
                0
            }
        }
    }

    // == Has Pending ==
    pub async fn has_pending(&self) -> bool {
        self.pending_count().await > 0
    }

    // == Process Pending Forms ==
    /// Replays every stored record against the transport.
    ///
    /// Returns immediately without touching storage when offline. Records
    /// are replayed in parallel, each independently: success deletes the
    /// record, failure leaves it in place for the next pass. No concurrency
    /// cap and no backoff between passes.
    pub async fn process_pending_forms(&self) -> ReplayReport {
        if !self.monitor.is_online() {
            debug!("skipping offline replay: still offline");
            return ReplayReport::skipped();
        }

        let forms = match self.store.get_all().await {
            Ok(forms) => forms,
            Err(err) => {
                warn!(error = %ApiError::from(err), "failed to read offline queue for replay");
                return ReplayReport::skipped();
            }
        };

        if forms.is_empty() {
            return ReplayReport {
                success: true,
                ..ReplayReport::default()
            };
        }

        info!(count = forms.len(), "replaying offline-queued requests");

        let mut handles: Vec<JoinHandle<ReplayOutcome>> = Vec::with_capacity(forms.len());
        for form in forms {
            let store = Arc::clone(&self.store);
            let transport = Arc::clone(&self.transport);
            handles.push(tokio::spawn(async move {
                let request = TransportRequest {
                    method: form.method,
                    url: form.url.clone(),
                    headers: form.headers.clone(),
                    params: None,
                    body: form.body.clone(),
                };

                match transport.send(&request).await {
                    Ok(response) if response.is_success() => {
                        if let Err(err) = store.delete(form.id).await {
                            warn!(id = form.id, error = %ApiError::from(err), "replayed form could not be deleted");
                        }
                        ReplayOutcome {
                            id: form.id,
                            url: form.url,
                            ok: true,
                            error: None,
                        }
                    }
                    Ok(response) => ReplayOutcome {
                        id: form.id,
                        url: form.url,
                        ok: false,
                        error: Some(format!("HTTP {}", response.status)),
                    },
                    Err(err) => ReplayOutcome {
                        id: form.id,
                        url: form.url,
                        ok: false,
                        error: Some(err.to_string()),
                    },
                }
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => results.push(outcome),
                Err(err) => warn!(error = %err, "offline replay task panicked"),
            }
        }

        let processed = results.iter().filter(|r| r.ok).count();
        let failed = results.len() - processed;
        info!(processed, failed, "offline replay pass finished");

        ReplayReport {
            success: failed == 0,
            processed,
            failed,
            results,
        }
    }

    // == Reconnect Listener ==
    /// Spawns the listener that replays the queue whenever connectivity is
    /// restored, broadcasting a summary for status indicators.
    pub fn spawn_reconnect_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        let mut events = queue.monitor.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SyncEvent::ConnectivityRestored) => {
                        let report = queue.process_pending_forms().await;
                        if report.processed + report.failed > 0 {
                            queue.monitor.broadcast(SyncEvent::OfflineFormsProcessed {
                                processed: report.processed,
                                failed: report.failed,
                            });
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "reconnect listener lagged behind event stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
