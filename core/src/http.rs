//! HTTP transport types and the single I/O seam.
//!
//! # Design
//! Requests and responses are plain data. `ApolearnClient` builds an
//! `HttpRequest` without touching the network, hands it to a `Transport`, and
//! parses the returned `HttpResponse`. Only `Transport::execute` performs I/O,
//! which keeps request construction deterministic and lets tests substitute a
//! recording transport.
//!
//! `UreqTransport` builds a fresh agent for every call, so no connection is
//! reused and every handle is released when `execute` returns.

use std::time::Duration;

use tracing::warn;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    /// Parse a method name case-insensitively. Anything other than `post` or
    /// `put` is treated as GET.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("post") {
            HttpMethod::Post
        } else if name.eq_ignore_ascii_case("put") {
            HttpMethod::Put
        } else {
            HttpMethod::Get
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Full URL, including any query suffix.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub connect_timeout: Duration,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Not read by `parse_response`; kept for callers and custom transports
    /// that need `set-cookie`, rate-limit or similar headers.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes one HTTP round-trip.
///
/// Non-2xx statuses are responses, not errors. `Err` is reserved for requests
/// that never produced a readable response.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(request.connect_timeout))
            .build()
            .new_agent();

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if request.method == HttpMethod::Post {
                    agent.post(&request.url)
                } else {
                    agent.put(&request.url)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(request.body.as_deref().unwrap_or_default().as_bytes())
            }
        };

        let mut response = result.map_err(|e| {
            warn!(url = %request.url, error = %e, "apolearn request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(|e| {
            warn!(url = %request.url, error = %e, "failed to read apolearn response body");
            ApiError::Transport(e.to_string())
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
