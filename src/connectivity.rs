//! Connectivity Module
//!
//! Owns the "is the network reachable" signal and the broadcast channel the
//! rest of the system subscribes to. Components register interest through
//! [`ConnectivityMonitor::subscribe`] instead of listening on any platform
//! event mechanism.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// == Sync Event ==
/// Events broadcast to interested components (status indicators, pages that
/// refresh derived counts after a sync).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The environment transitioned from offline to online.
    ConnectivityRestored,
    /// The environment transitioned from online to offline.
    ConnectivityLost,
    /// An offline replay pass finished with something to report.
    OfflineFormsProcessed { processed: usize, failed: usize },
    /// A request failed without any server response.
    ApiConnectionError { message: String, url: String },
}

// == Connectivity Monitor ==
/// Process-wide connectivity signal plus event fan-out.
///
/// The flag is consulted at decision points (never polled); transitions are
/// announced on the broadcast channel.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl ConnectivityMonitor {
    // == Constructor ==
    /// Creates a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            online: AtomicBool::new(initially_online),
            events,
        }
    }

    // == Is Online ==
    /// Current connectivity state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    // == Set Online ==
    /// Updates the connectivity state, broadcasting on transitions.
    ///
    /// Setting the same state twice is a no-op and broadcasts nothing.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }
        if online {
            info!("connectivity restored");
            self.broadcast(SyncEvent::ConnectivityRestored);
        } else {
            warn!("connectivity lost");
            self.broadcast(SyncEvent::ConnectivityLost);
        }
    }

    // == Subscribe ==
    /// Registers a new subscriber for sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    // == Broadcast ==
    /// Publishes an event to all current subscribers. Events sent with no
    /// subscribers are dropped silently.
    pub fn broadcast(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
