//! HTTP Request Client
//!
//! The single entry point UI code calls. Orchestrates cache-read,
//! de-duplication of concurrent identical GETs, cache-write with tags,
//! tag/pattern invalidation, and the offline fallbacks around every call.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::cache::{SharedCache, TAG_PREFIX};
use crate::config::Config;
use crate::connectivity::{ConnectivityMonitor, SyncEvent};
use crate::error::{ApiError, Result};
use crate::http::{Method, Transport, TransportRequest};
use crate::offline::OfflineQueue;

// == Cache Options ==
/// Per-request caching behavior.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Whether the response may be served from / written to the cache.
    /// Defaults to true for GET and false for every mutating verb.
    pub enabled: bool,
    /// TTL in seconds; `None` applies the client's default (300 s)
    pub ttl_seconds: Option<u64>,
    /// Explicit cache key overriding the derived `METHOD:URL[...]` key
    pub key: Option<String>,
    /// Tags attached to the cached entry, enabling bulk invalidation
    pub tags: Vec<String>,
    /// Tags whose entries are invalidated after this request succeeds
    pub invalidate_tags: Vec<String>,
}

impl CacheOptions {
    /// Default options for a verb: caching on for GET, off for mutations.
    pub fn for_method(method: Method) -> Self {
        Self {
            enabled: !method.is_mutating(),
            ttl_seconds: None,
            key: None,
            tags: Vec::new(),
            invalidate_tags: Vec::new(),
        }
    }
}

// == Request Config ==
/// A request as the UI describes it: a path (or absolute URL), optional
/// params/body/headers, and cache behavior.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    /// Path joined onto the configured base URL, or an absolute URL
    pub url: String,
    pub headers: HashMap<String, String>,
    pub params: Option<Value>,
    pub body: Option<Value>,
    pub cache: CacheOptions,
}

impl RequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            params: None,
            body: None,
            cache: CacheOptions::for_method(method),
        }
    }
}

// == Outcome ==
/// Resolution of a request.
///
/// `OfflineQueued` is a distinct success shape, not an error: the request
/// was persisted for replay because the client is offline. Callers branch
/// on the variant, never on error vs. resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The server responded; here is the payload.
    Data(Value),
    /// The request was queued for replay when connectivity returns.
    OfflineQueued { message: String },
}

impl Outcome {
    pub fn is_offline_queued(&self) -> bool {
        matches!(self, Outcome::OfflineQueued { .. })
    }

    /// The payload, if the request actually reached the server.
    pub fn into_data(self) -> Option<Value> {
        match self {
            Outcome::Data(value) => Some(value),
            Outcome::OfflineQueued { .. } => None,
        }
    }
}

/// How de-duplicated racers on one cache key settle: the leader issues the
/// network call and broadcasts the shared outcome to every follower.
type SettleSender = broadcast::Sender<Result<Value>>;

// == Api Client ==
/// Read-through caching HTTP client with offline fallbacks.
///
/// Constructed once by the composition root and passed by reference to
/// consumers; holds no global state.
pub struct ApiClient {
    config: Config,
    cache: SharedCache,
    transport: Arc<dyn Transport>,
    monitor: Arc<ConnectivityMonitor>,
    offline: Arc<OfflineQueue>,
    /// In-flight GETs by cache key. Invariant: at most one concurrent
    /// network call per distinct cache key.
    pending: Mutex<HashMap<String, SettleSender>>,
}

impl ApiClient {
    // == Constructor ==
    pub fn new(
        config: Config,
        cache: SharedCache,
        transport: Arc<dyn Transport>,
        monitor: Arc<ConnectivityMonitor>,
        offline: Arc<OfflineQueue>,
    ) -> Self {
        Self {
            config,
            cache,
            transport,
            monitor,
            offline,
            pending: Mutex::new(HashMap::new()),
        }
    }

    // == Verb Wrappers ==
    /// Cached GET. GETs are never offline-queued, so the payload comes back
    /// directly.
    pub async fn get(&self, path: &str, params: Option<Value>) -> Result<Value> {
        let mut config = RequestConfig::new(Method::Get, path);
        config.params = params;
        self.get_with(config).await
    }

    /// GET with full control over caching (TTL, tags, explicit key).
    pub async fn get_with(&self, config: RequestConfig) -> Result<Value> {
        match self.request(config).await? {
            Outcome::Data(value) => Ok(value),
            Outcome::OfflineQueued { .. } => Err(ApiError::Internal(
                "GET requests are never offline-queued".to_string(),
            )),
        }
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Outcome> {
        let mut config = RequestConfig::new(Method::Post, path);
        config.body = body;
        self.request(config).await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<Outcome> {
        let mut config = RequestConfig::new(Method::Put, path);
        config.body = body;
        self.request(config).await
    }

    pub async fn patch(&self, path: &str, body: Option<Value>) -> Result<Outcome> {
        let mut config = RequestConfig::new(Method::Patch, path);
        config.body = body;
        self.request(config).await
    }

    pub async fn delete(&self, path: &str) -> Result<Outcome> {
        self.request(RequestConfig::new(Method::Delete, path)).await
    }

    // == Request ==
    /// The single entry point all verbs funnel into.
    pub async fn request(&self, config: RequestConfig) -> Result<Outcome> {
        let url = self.resolve_url(&config.url);
        let cacheable =
            self.config.cache_enabled && config.cache.enabled && !config.method.is_mutating();

        if cacheable {
            self.cached_request(config, url).await.map(Outcome::Data)
        } else {
            self.direct_request(config, url).await
        }
    }

    // == Cache Key Derivation ==
    /// `METHOD:URL[:JSON(params)][:JSON(body)]`; the body segment only for
    /// POST/PUT/PATCH. An explicit `cache.key` overrides derivation.
    pub fn cache_key(&self, config: &RequestConfig, url: &str) -> String {
        if let Some(key) = &config.cache.key {
            return key.clone();
        }

        let mut key = format!("{}:{}", config.method, url);
        if let Some(params) = &config.params {
            key.push(':');
            key.push_str(&params.to_string());
        }
        if config.method.key_includes_body() {
            if let Some(body) = &config.body {
                key.push(':');
                key.push_str(&body.to_string());
            }
        }
        key
    }

    // == Read Path ==
    /// Fresh cache hit, then in-flight de-duplication, then the network.
    async fn cached_request(&self, config: RequestConfig, url: String) -> Result<Value> {
        let key = self.cache_key(&config, &url);

        // Freshness probe leaves an expired entry in place so the offline
        // fallback below can still serve it.
        let stale = {
            let store = self.cache.read().await;
            if let Some(value) = store.peek_fresh(&key) {
                debug!(key, "cache hit");
                return Ok(value);
            }
            store.get_stale(&key)
        };

        // Join an identical in-flight request instead of issuing another
        // network call for the same key.
        let settle: SettleSender = {
            let mut pending = self.pending.lock().await;
            if let Some(tx) = pending.get(&key) {
                let mut rx = tx.subscribe();
                drop(pending);
                debug!(key, "joining in-flight request");
                return match rx.recv().await {
                    Ok(result) => result,
                    Err(_) => Err(ApiError::Internal(
                        "in-flight request settled without a result".to_string(),
                    )),
                };
            }
            let (tx, _) = broadcast::channel(1);
            pending.insert(key.clone(), tx.clone());
            tx
        };

        let result = self.fetch_and_cache(&config, &url, &key, stale).await;

        // Remove from the pending map before settling: a caller arriving
        // after this point starts fresh (and will usually hit the cache).
        self.pending.lock().await.remove(&key);
        let _ = settle.send(result.clone());

        result
    }

    async fn fetch_and_cache(
        &self,
        config: &RequestConfig,
        url: &str,
        key: &str,
        stale: Option<Value>,
    ) -> Result<Value> {
        let request = TransportRequest {
            method: config.method,
            url: url.to_string(),
            headers: config.headers.clone(),
            params: config.params.clone(),
            body: config.body.clone(),
        };

        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                let ttl = config
                    .cache
                    .ttl_seconds
                    .unwrap_or(self.config.default_cache_ttl);
                {
                    let mut store = self.cache.write().await;
                    store.set(key.to_string(), response.body.clone(), Some(ttl));
                    if !config.cache.tags.is_empty() {
                        store.set(
                            format!("{}{}", TAG_PREFIX, key),
                            Value::from(config.cache.tags.clone()),
                            Some(ttl),
                        );
                    }
                }
                if !config.cache.invalidate_tags.is_empty() {
                    self.invalidate_by_tags(&config.cache.invalidate_tags).await;
                }
                Ok(response.body)
            }
            Ok(response) => {
                self.log_status(response.status, url);
                Err(status_error(response.status, &response.body))
            }
            Err(err) => {
                self.report_connection_error(&err, url);
                if !self.monitor.is_online() {
                    if let Some(value) = stale {
                        // Availability over consistency while offline
                        warn!(key, "offline; serving stale cached value");
                        return Ok(value);
                    }
                }
                Err(err)
            }
        }
    }

    // == Write Path ==
    /// Non-cached and mutating requests: straight to the network, with the
    /// offline queue as the connectivity-failure fallback.
    async fn direct_request(&self, config: RequestConfig, url: String) -> Result<Outcome> {
        let request = TransportRequest {
            method: config.method,
            url: url.clone(),
            headers: config.headers.clone(),
            params: config.params.clone(),
            body: config.body.clone(),
        };

        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                if !config.cache.invalidate_tags.is_empty() {
                    self.invalidate_by_tags(&config.cache.invalidate_tags).await;
                }
                Ok(Outcome::Data(response.body))
            }
            Ok(response) => {
                self.log_status(response.status, &url);
                Err(status_error(response.status, &response.body))
            }
            Err(err) => {
                self.report_connection_error(&err, &url);
                let queueable = config.method.is_mutating()
                    && self.config.offline_enabled
                    && !self.monitor.is_online()
                    && err.is_connectivity_failure();
                if queueable {
                    let saved = self
                        .offline
                        .save_form_for_later(
                            url,
                            config.method,
                            config.headers.clone(),
                            config.body.clone(),
                        )
                        .await;
                    if saved {
                        return Ok(Outcome::OfflineQueued {
                            message: "Request saved; it will be sent when the connection is restored"
                                .to_string(),
                        });
                    }
                }
                Err(err)
            }
        }
    }

    // == Tag Invalidation ==
    /// Deletes every cached entry tagged with any of the given tags, along
    /// with its tag record. Returns the number of data entries removed.
    pub async fn invalidate_by_tags(&self, tags: &[String]) -> usize {
        let mut store = self.cache.write().await;
        let tag_keys = store.keys(&format!("{}*", TAG_PREFIX));

        let mut removed = 0;
        for tag_key in tag_keys {
            let tagged = store
                .get_stale(&tag_key)
                .as_ref()
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .any(|tag| tags.iter().any(|t| t == tag))
                })
                .unwrap_or(false);

            if tagged {
                if let Some(data_key) = tag_key.strip_prefix(TAG_PREFIX) {
                    let data_key = data_key.to_string();
                    if store.delete(&data_key) {
                        removed += 1;
                    }
                }
                store.delete(&tag_key);
            }
        }

        if removed > 0 {
            debug!(?tags, removed, "invalidated cache entries by tag");
        }
        removed
    }

    // == URL Pattern Invalidation ==
    /// Deletes all GET cache entries under `GET:<base><pattern>*`.
    pub async fn invalidate_by_url_pattern(&self, pattern: &str) -> usize {
        let full = format!("GET:{}{}*", self.config.api_url, pattern);
        self.cache.write().await.delete_pattern(&full)
    }

    // == Clear Cache ==
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    // == URL Resolution ==
    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.api_url, path)
        }
    }

    // == Interceptor ==
    /// Logs notable status codes. Never retries or redirects; that is left
    /// to callers.
    fn log_status(&self, status: u16, url: &str) {
        match status {
            401 => warn!(url, "unauthorized (401)"),
            403 => warn!(url, "forbidden (403)"),
            429 => warn!(url, "rate limited (429)"),
            500 => warn!(url, "server error (500)"),
            _ => debug!(url, status, "request failed"),
        }
    }

    fn report_connection_error(&self, err: &ApiError, url: &str) {
        warn!(url, error = %err, "network request failed");
        self.monitor.broadcast(SyncEvent::ApiConnectionError {
            message: err.to_string(),
            url: url.to_string(),
        });
    }
}

fn status_error(status: u16, body: &Value) -> ApiError {
    let message = body
        .get("error")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();
    ApiError::Status {
        code: status,
        message,
    }
}
