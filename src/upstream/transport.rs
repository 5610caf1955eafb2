use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};

pub const JSON: &str = "application/json";
pub const JSON_PATCH: &str = "application/json-patch+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Query-language document, sent as plain JSON.
    Query(Value),
    /// Array of update operations, sent as a JSON patch document.
    Patch(Value),
}

impl RequestBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Query(_) => JSON,
            RequestBody::Patch(_) => JSON_PATCH,
        }
    }

    pub fn json(&self) -> &Value {
        match self {
            RequestBody::Query(v) | RequestBody::Patch(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub authorization: String,
    pub body: Option<RequestBody>,
    /// Short description of what the call is for, used in error messages.
    pub phase: &'static str,
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Status code plus reason phrase, e.g. `404 Not Found`.
    pub status_line: String,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn error_for_status(self, phase: &str) -> Result<Self> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            warn!(phase, status = %self.status_line, "upstream returned an error status");
            Err(AdapterError::upstream(phase, self.status_line))
        }
    }

    pub fn json<T: DeserializeOwned>(&self, phase: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| AdapterError::decode(phase, e))
    }
}

/// Performs a single HTTP exchange with the upstream service.
///
/// Implementations return every response, whatever its status; status checks
/// and deadlines are applied by [`dispatch`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

/// Runs `request` under a deadline and cancellation token and rejects non-2xx responses.
pub async fn dispatch(
    transport: &dyn Transport,
    request: UpstreamRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<UpstreamResponse> {
    let phase = request.phase;
    debug!(method = %request.method, url = %request.url, phase, "upstream request");

    if cancel.is_cancelled() {
        return Err(AdapterError::Cancelled { phase: phase.into() });
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(AdapterError::Cancelled { phase: phase.into() });
        }
        outcome = tokio::time::timeout(timeout, transport.execute(request)) => match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(AdapterError::Timeout {
                    phase: phase.into(),
                    seconds: timeout.as_secs(),
                });
            }
        },
    };

    response.error_for_status(phase)
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let phase = request.phase;
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Patch => self.client.patch(&request.url),
        };
        let mut builder = builder.header("Authorization", &request.authorization);
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body.json()).map_err(|e| AdapterError::decode(phase, e))?;
            builder = builder.header("Content-Type", body.content_type()).body(bytes);
        }

        let resp = builder.send().await.map_err(|source| AdapterError::Transport {
            phase: phase.into(),
            source,
        })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|source| AdapterError::Transport {
            phase: phase.into(),
            source,
        })?;

        Ok(UpstreamResponse {
            status: status.as_u16(),
            status_line: status.to_string(),
            body: body.to_vec(),
        })
    }
}
