//! Request builder, dispatcher and response parser for the Apolearn API.
//!
//! # Design
//! Every operation is split into a `build_*` method that produces an
//! `HttpRequest` and a public method that sends it through the client's
//! `Transport` and parses the body. The `build_*` half is pure, so request
//! shapes can be checked without a server.
//!
//! The session token is the only mutable state. `login` is its single writer
//! and takes `&mut self`; every other operation reads it through `&self`.
//! Clients that need concurrent logins should use separate instances.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::config::{ClientConfig, QueryEncoding};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::{ApiResult, RequestArgs, UserQuery};

/// REST path between the instance URL and the call name.
pub const API_PATH: &str = "/services/api/rest/json/";

/// Call issued when none is specified: the server's method listing.
pub const DEFAULT_CALL: &str = "system.api.list";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Synchronous client for one Apolearn instance.
#[derive(Debug)]
pub struct ApolearnClient<T = UreqTransport> {
    config: ClientConfig,
    token: Option<String>,
    transport: T,
}

impl ApolearnClient<UreqTransport> {
    /// No network call happens until an operation is invoked.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport)
    }
}

impl<T> ApolearnClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            token: None,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session token from the last successful `login`.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_login(&self, username: &str, password: &str) -> HttpRequest {
        let args = RequestArgs::new()
            .with("username", username)
            .with("password", password);
        self.build_request("auth.gettoken", HttpMethod::Post, args)
    }

    pub fn build_get_users(&self, query: UserQuery) -> HttpRequest {
        let args = RequestArgs::new()
            .with("limit", query.limit)
            .with("offset", query.offset)
            .with("enabledonly", query.enabled_only)
            .with("auth_token", self.token.clone());
        self.build_request("users", HttpMethod::Get, args)
    }

    pub fn build_get_users_types(&self) -> HttpRequest {
        let args = RequestArgs::new().with("auth_token", self.token.clone());
        self.build_request("users/types", HttpMethod::Get, args)
    }

    /// `firstname`, `lastname`, `email`, `sendusercredential` and
    /// `auth_token` overwrite same-named keys in `other_fields`.
    pub fn build_add_user(
        &self,
        firstname: &str,
        lastname: &str,
        email: &str,
        mut other_fields: RequestArgs,
        send_user_credential: bool,
    ) -> HttpRequest {
        other_fields
            .insert("firstname", firstname)
            .insert("lastname", lastname)
            .insert("email", email)
            .insert("sendusercredential", send_user_credential)
            .insert("auth_token", self.token.clone());
        self.build_request("users", HttpMethod::Post, other_fields)
    }

    /// `_send_user_credential` is accepted for parity with `build_add_user`
    /// but is not transmitted.
    pub fn build_edit_user(
        &self,
        user_id: u64,
        mut fields: RequestArgs,
        _send_user_credential: bool,
    ) -> HttpRequest {
        fields.insert("auth_token", self.token.clone());
        self.build_request(&format!("users/{user_id}"), HttpMethod::Put, fields)
    }

    pub fn build_disable_user(&self, user_id: u64, reason: &str) -> HttpRequest {
        let args = RequestArgs::new()
            .with("auth_token", self.token.clone())
            .with("reason", reason);
        self.build_request(&format!("users/disable/{user_id}"), HttpMethod::Put, args)
    }

    pub fn build_enable_user(&self, user_id: u64) -> HttpRequest {
        let args = RequestArgs::new().with("auth_token", self.token.clone());
        self.build_request(&format!("users/enable/{user_id}"), HttpMethod::Put, args)
    }

    pub fn build_list_api_methods(&self) -> HttpRequest {
        self.build_request(DEFAULT_CALL, HttpMethod::Get, RequestArgs::new())
    }

    /// Build a call with the configured connect timeout. The public key, when
    /// set, is added as `api_key`, replacing any caller-supplied value.
    pub fn build_request(&self, call: &str, method: HttpMethod, mut args: RequestArgs) -> HttpRequest {
        let mut url = format!("{}{API_PATH}{call}", self.config.instance_url);

        if !self.config.public_key.is_empty() {
            args.insert("api_key", self.config.public_key.as_str());
        }

        let mut headers = Vec::new();
        if let Some(auth) = &self.config.http_auth {
            let credentials = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
            headers.push(("authorization".to_string(), format!("Basic {credentials}")));
        }

        let body = match method {
            HttpMethod::Post | HttpMethod::Put => {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
                Some(args.to_form_body())
            }
            HttpMethod::Get => {
                match self.config.query_encoding {
                    QueryEncoding::Legacy => args.append_legacy_query(&mut url),
                    QueryEncoding::Encoded => args.append_encoded_query(&mut url),
                }
                None
            }
        };

        HttpRequest {
            method,
            url,
            headers,
            body,
            connect_timeout: self.config.timeout,
        }
    }
}

impl<T: Transport> ApolearnClient<T> {
    /// Exchange admin credentials for a session token and keep it for later
    /// calls. On failure the previous token, if any, is left in place.
    pub fn login(&mut self, username: &str, password: &str) -> Result<String, ApiError> {
        let result = self.send(&self.build_login(username, password))?;
        let token = token_from_envelope(&result)?;
        debug!("apolearn login succeeded");
        self.token = Some(token.clone());
        Ok(token)
    }

    pub fn get_users(&self, query: UserQuery) -> Result<ApiResult, ApiError> {
        self.send(&self.build_get_users(query))
    }

    pub fn get_users_types(&self) -> Result<ApiResult, ApiError> {
        self.send(&self.build_get_users_types())
    }

    /// Create a user. `other_fields` carries any extra profile fields the
    /// server recognises (`usertype_id`, `password`, `gender`, `company`,
    /// `job`, `city`, `country`, `language`); they are not checked here.
    pub fn add_user(
        &self,
        firstname: &str,
        lastname: &str,
        email: &str,
        other_fields: RequestArgs,
        send_user_credential: bool,
    ) -> Result<ApiResult, ApiError> {
        self.send(&self.build_add_user(
            firstname,
            lastname,
            email,
            other_fields,
            send_user_credential,
        ))
    }

    /// Update profile fields of `user_id`. `send_user_credential` is not sent
    /// to the server (see `build_edit_user`).
    pub fn edit_user(
        &self,
        user_id: u64,
        fields: RequestArgs,
        send_user_credential: bool,
    ) -> Result<ApiResult, ApiError> {
        self.send(&self.build_edit_user(user_id, fields, send_user_credential))
    }

    pub fn disable_user(&self, user_id: u64, reason: &str) -> Result<ApiResult, ApiError> {
        self.send(&self.build_disable_user(user_id, reason))
    }

    pub fn enable_user(&self, user_id: u64) -> Result<ApiResult, ApiError> {
        self.send(&self.build_enable_user(user_id))
    }

    pub fn list_api_methods(&self) -> Result<ApiResult, ApiError> {
        self.send(&self.build_list_api_methods())
    }

    /// Issue an arbitrary call. `method` decides the encoding: POST and PUT
    /// send a form body, anything else appends the arguments to the URL.
    /// `timeout` bounds connection establishment only.
    pub fn request(
        &self,
        call: &str,
        method: HttpMethod,
        args: RequestArgs,
        timeout: std::time::Duration,
    ) -> Result<ApiResult, ApiError> {
        let mut request = self.build_request(call, method, args);
        request.connect_timeout = timeout;
        self.send(&request)
    }

    /// Execute a built request and parse its body.
    pub fn send(&self, request: &HttpRequest) -> Result<ApiResult, ApiError> {
        debug!(method = ?request.method, url = %request.url, "dispatching apolearn request");
        let response = self.transport.execute(request)?;
        Ok(parse_response(response))
    }
}

/// Parse a response body as JSON. The HTTP status is ignored; a body that is
/// not JSON yields `Null`.
pub fn parse_response(response: HttpResponse) -> ApiResult {
    serde_json::from_str(&response.body).unwrap_or_else(|e| {
        debug!(status = response.status, error = %e, "apolearn response is not JSON");
        ApiResult::Null
    })
}

/// Extract the token from an `auth.gettoken` envelope: `status` must be `0`
/// and `result` a non-empty string other than `"0"`, a non-zero number, or
/// `true` (stored as `"1"`). Arrays and objects are never tokens.
fn token_from_envelope(result: &ApiResult) -> Result<String, ApiError> {
    let status = result.get("status").and_then(ApiResult::as_i64);
    let token = match result.get("result") {
        Some(ApiResult::String(s)) if !s.is_empty() && s != "0" => Some(s.clone()),
        Some(ApiResult::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Some(ApiResult::Bool(true)) => Some("1".to_string()),
        _ => None,
    };
    match (status, token) {
        (Some(0), Some(token)) => Ok(token),
        _ => Err(ApiError::AuthenticationFailed {
            status,
            message: result
                .get("message")
                .and_then(ApiResult::as_str)
                .map(str::to_string),
        }),
    }
}
