//! HTTP Module
//!
//! The request pipeline: transport seam, read-through caching, request
//! de-duplication, tag invalidation, and offline fallback.

mod client;
mod transport;

pub use client::{ApiClient, CacheOptions, Outcome, RequestConfig};
pub use transport::{Method, ReqwestTransport, Transport, TransportRequest, TransportResponse};

// == Test Support ==
#[cfg(test)]
pub(crate) mod testing {
    //! Mock transport shared by the unit tests across modules.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::{Transport, TransportRequest, TransportResponse};
    use crate::error::ApiError;

    type Handler =
        Box<dyn Fn(&TransportRequest) -> Result<TransportResponse, ApiError> + Send + Sync>;

    /// Transport stub with a programmable handler, an invocation counter,
    /// and an optional artificial delay (for racing concurrent requests).
    pub struct MockTransport {
        calls: AtomicUsize,
        delay: Duration,
        handler: Handler,
    }

    impl MockTransport {
        pub fn new(
            handler: impl Fn(&TransportRequest) -> Result<TransportResponse, ApiError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                handler: Box::new(handler),
            }
        }

        /// Always responds 200 with the given body.
        pub fn ok(body: Value) -> Self {
            Self::new(move |_| {
                Ok(TransportResponse {
                    status: 200,
                    body: body.clone(),
                })
            })
        }

        /// Always fails as if no response was received.
        pub fn refusing() -> Self {
            Self::new(|_| Err(ApiError::Transport("connection refused".to_string())))
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Number of times `send` was invoked.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(
            &self,
            request: &TransportRequest,
        ) -> Result<TransportResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.handler)(request)
        }
    }
}
