//! Synchronous client for the Apolearn learning-management REST API.
//!
//! # Overview
//! Authenticates an administrator with `login`, then lists, creates, edits,
//! enables and disables user accounts. Every operation funnels through one
//! request routine that builds `{instance_url}/services/api/rest/json/{call}`,
//! attaches `api_key` and `auth_token`, and encodes arguments by verb: a form
//! body for POST and PUT, a URL suffix for everything else.
//!
//! # Design
//! - `build_*` methods produce `HttpRequest` values without I/O; a `Transport`
//!   executes them. `UreqTransport` is the default and opens a fresh
//!   connection per call.
//! - Responses are returned as parsed JSON (`ApiResult`). HTTP status codes
//!   are not interpreted; only `login` reads the `{status, result}` envelope.
//! - Ordinary request failures come back as `Err(ApiError)`, never as panics.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::{parse_response, ApolearnClient, API_PATH, DEFAULT_CALL};
pub use config::{BasicAuth, ClientConfig, QueryEncoding, DEFAULT_TIMEOUT};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{ApiResult, RequestArgs, Scalar, UserQuery};
