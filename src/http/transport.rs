//! Transport Module
//!
//! Wraps the HTTP transport behind a trait so the request pipeline can be
//! exercised against a mock that counts invocations. The production
//! implementation is a thin layer over `reqwest`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

// == HTTP Method ==
/// The verbs the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Canonical uppercase name, used in cache keys and queued records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// True for verbs that mutate server state. Mutating responses are never
    /// cached, and only mutating requests are eligible for offline queueing.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }

    /// True for verbs whose cache key includes the request body.
    pub fn key_includes_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Transport Request ==
/// A fully-resolved request handed to the transport: absolute URL, headers,
/// optional query params and JSON body.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub params: Option<Value>,
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Convenience constructor with no headers/params/body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            params: None,
            body: None,
        }
    }
}

// == Transport Response ==
/// Any HTTP response, success or error status. A response with an error
/// status is still `Ok` at this layer; the client's interceptor owns
/// status-code handling.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// == Transport Trait ==
/// The seam between the request pipeline and the wire.
///
/// `Err(ApiError::Transport)` means no response was received at all; that is
/// the signal the offline fallbacks key on.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError>;
}

// == Reqwest Transport ==
/// Production transport backed by a shared `reqwest::Client`.
///
/// No request timeout is configured here; callers supply their own plumbing
/// where they need one (the health prober wraps its calls in a timeout).
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Patch => self.client.patch(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(params) = request.params.as_ref().and_then(Value::as_object) {
            let query: Vec<(String, String)> = params
                .iter()
                .map(|(k, v)| {
                    let rendered = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), rendered)
                })
                .collect();
            builder = builder.query(&query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        // Empty or non-JSON bodies come back as null rather than an error
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok(TransportResponse { status, body })
    }
}
