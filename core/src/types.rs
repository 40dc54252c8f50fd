//! Request argument types for the Apolearn API.
//!
//! # Design
//! The API takes flat `name=value` parameters, so arguments are modelled as an
//! insertion-ordered list of `(name, Scalar)` pairs rather than typed DTOs.
//! Caller-supplied user fields pass through opaquely; the client only ever
//! injects or overwrites a handful of well-known keys (`auth_token`,
//! `api_key`, `firstname`, ...).
//!
//! Scalars render the way the server has always received them: `true` is
//! `1`, `false` and null are empty.

use std::fmt;

use serde::Deserialize;
use url::form_urlencoded;

/// Parsed JSON response body, returned to the caller without coercion.
pub type ApiResult = serde_json::Value;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null | Scalar::Bool(false) => Ok(()),
            Scalar::Bool(true) => f.write_str("1"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Int(n.into())
    }
}

impl From<u32> for Scalar {
    fn from(n: u32) -> Self {
        Scalar::Int(n.into())
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or_else(|_| Scalar::Str(n.to_string()), Scalar::Int)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

/// Insertion-ordered request parameters. Inserting an existing key replaces
/// its value without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestArgs {
    entries: Vec<(String, Scalar)>,
}

impl RequestArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Builder-style `insert`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `application/x-www-form-urlencoded` body. Null entries are omitted.
    pub fn to_form_body(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            if *value != Scalar::Null {
                serializer.append_pair(key, &value.to_string());
            }
        }
        serializer.finish()
    }

    /// Append every pair as `&key=value`, byte for byte, with no
    /// percent-encoding. Values containing `&`, `=` or other reserved
    /// characters corrupt the resulting URL.
    pub fn append_legacy_query(&self, url: &mut String) {
        for (key, value) in self.iter() {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&value.to_string());
        }
    }

    /// Append a percent-encoded `?key=value&...` query string.
    pub fn append_encoded_query(&self, url: &mut String) {
        if self.is_empty() {
            return;
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            serializer.append_pair(key, &value.to_string());
        }
        url.push('?');
        url.push_str(&serializer.finish());
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for RequestArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = RequestArgs::new();
        for (key, value) in iter {
            args.insert(key, value);
        }
        args
    }
}

/// Paging and filtering for `get_users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserQuery {
    pub offset: u32,
    pub limit: u32,
    pub enabled_only: bool,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
            enabled_only: false,
        }
    }
}
