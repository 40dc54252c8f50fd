//! Client configuration.
//!
//! # Design
//! `ClientConfig` is assembled once, then moved into the client, which only
//! ever reads it. Values are stored verbatim: the instance URL is neither
//! validated nor normalised, and keys may be empty.
//!
//! The private key is stored but never sent. It is kept so request signing can
//! be added without changing how clients are constructed.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::ApiError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How GET parameters are attached to the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryEncoding {
    /// `&key=value` appended to the call path with no percent-encoding. This
    /// is the byte-exact shape deployed servers have always received.
    #[default]
    Legacy,
    /// A percent-encoded `?key=value&...` query string.
    Encoded,
}

/// HTTP basic-auth credentials, for instances behind an authenticating proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) instance_url: String,
    pub(crate) public_key: String,
    #[allow(dead_code)]
    pub(crate) private_key: String,
    pub(crate) http_auth: Option<BasicAuth>,
    pub(crate) query_encoding: QueryEncoding,
    pub(crate) timeout: Duration,
}

impl ClientConfig {
    /// `instance_url` is the deployment root with scheme and without a
    /// trailing slash, e.g. `https://yourcompany.apolearn.com`.
    pub fn new(
        instance_url: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            public_key: public_key.into(),
            private_key: private_key.into(),
            http_auth: None,
            query_encoding: QueryEncoding::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read `APOLEARN_INSTANCE_URL` (required), `APOLEARN_PUBLIC_KEY`,
    /// `APOLEARN_PRIVATE_KEY` and `APOLEARN_TIMEOUT_SECS` from the process
    /// environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`. Missing keys
    /// default to empty. A timeout that is not a whole number of seconds is
    /// ignored and the default kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let instance_url = lookup("APOLEARN_INSTANCE_URL")
            .ok_or(ApiError::MissingConfig("APOLEARN_INSTANCE_URL"))?;
        let public_key = lookup("APOLEARN_PUBLIC_KEY").unwrap_or_default();
        let private_key = lookup("APOLEARN_PRIVATE_KEY").unwrap_or_default();

        let mut config = Self::new(instance_url, public_key, private_key);
        match lookup("APOLEARN_TIMEOUT_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) => config.timeout = Duration::from_secs(secs),
            Some(Err(e)) => warn!(error = %e, "ignoring invalid APOLEARN_TIMEOUT_SECS"),
            None => {}
        }
        Ok(config)
    }

    pub fn with_http_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.http_auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_query_encoding(mut self, encoding: QueryEncoding) -> Self {
        self.query_encoding = encoding;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn query_encoding(&self) -> QueryEncoding {
        self.query_encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stores_values_verbatim() {
        let config = ClientConfig::new("https://acme.apolearn.com/", "", "secret");
        assert_eq!(config.instance_url(), "https://acme.apolearn.com/");
        assert_eq!(config.public_key(), "");
        assert_eq!(config.private_key, "secret");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.query_encoding(), QueryEncoding::Legacy);
        assert!(config.http_auth.is_none());
    }

    #[test]
    fn setters_override_defaults() {
        let config = ClientConfig::new("http://x", "pub", "priv")
            .with_timeout(Duration::from_secs(3))
            .with_query_encoding(QueryEncoding::Encoded)
            .with_http_auth("proxy", "pw");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.query_encoding(), QueryEncoding::Encoded);
        assert_eq!(config.http_auth.as_ref().map(|a| a.username.as_str()), Some("proxy"));
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn lookup_requires_instance_url() {
        let err = ClientConfig::from_lookup(lookup(&[("APOLEARN_PUBLIC_KEY", "pub")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingConfig("APOLEARN_INSTANCE_URL")));
    }

    #[test]
    fn lookup_defaults_keys_and_timeout() {
        let config =
            ClientConfig::from_lookup(lookup(&[("APOLEARN_INSTANCE_URL", "https://acme.apolearn.com")]))
                .unwrap();
        assert_eq!(config.instance_url(), "https://acme.apolearn.com");
        assert_eq!(config.public_key(), "");
        assert_eq!(config.private_key, "");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn lookup_reads_keys_and_timeout_override() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("APOLEARN_INSTANCE_URL", "http://x"),
            ("APOLEARN_PUBLIC_KEY", "pub"),
            ("APOLEARN_PRIVATE_KEY", "priv"),
            ("APOLEARN_TIMEOUT_SECS", "25"),
        ]))
        .unwrap();
        assert_eq!(config.public_key(), "pub");
        assert_eq!(config.private_key, "priv");
        assert_eq!(config.timeout(), Duration::from_secs(25));
    }

    #[test]
    fn lookup_ignores_malformed_timeout() {
        for raw in ["ten", "-5", "1.5", ""] {
            let config = ClientConfig::from_lookup(lookup(&[
                ("APOLEARN_INSTANCE_URL", "http://x"),
                ("APOLEARN_TIMEOUT_SECS", raw),
            ]))
            .unwrap();
            assert_eq!(config.timeout(), DEFAULT_TIMEOUT, "{raw}");
        }
    }

    #[test]
    fn basic_auth_debug_hides_password() {
        let auth = BasicAuth {
            username: "u".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{auth:?}").contains("hunter2"));
    }
}
