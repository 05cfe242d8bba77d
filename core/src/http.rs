//! HTTP vocabulary shared by the client and the transfer layer.
//!
//! # Design
//! These types describe request configuration as plain data: the method
//! enumeration, an ordered header list and the request body. They carry no
//! I/O. The `Client` mutates them through its setters, and the transfer
//! handle turns them into wire traffic when `send()` runs.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross the C
//! boundary in `rest-ffi` without lifetime concerns.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::RestError;
use crate::multipart::Multipart;

/// Common MIME types for `Client::set_content_type`.
pub mod content_type {
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const PLAIN: &str = "text/plain";
    pub const OCTET: &str = "application/octet-stream";
    pub const HTML: &str = "text/html";
    pub const CSS: &str = "text/css";
    pub const JS: &str = "text/javascript";
    pub const FORM: &str = "application/x-www-form-urlencoded";
    pub const MULTIPART: &str = "multipart/form-data";
}

/// HTTP method for a request.
///
/// Each variant has a stable numeric code (`HEAD = 0` through `PATCH = 6`)
/// used by the C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Head,
    Get,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Head,
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Options,
        Method::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Head => "HEAD",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Method::Head => 0,
            Method::Get => 1,
            Method::Post => 2,
            Method::Put => 3,
            Method::Delete => 4,
            Method::Options => 5,
            Method::Patch => 6,
        }
    }

    /// Whether the transfer layer sends a request body for this method.
    /// HEAD and GET never carry one.
    pub fn carries_body(&self) -> bool {
        !matches!(self, Method::Head | Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for Method {
    type Error = RestError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Method::ALL
            .into_iter()
            .find(|m| m.code() == code)
            .ok_or_else(|| RestError::InvalidArgument(format!("invalid HTTP method: {code}")))
    }
}

impl FromStr for Method {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RestError::InvalidArgument(format!("invalid HTTP method: {s}")))
    }
}

impl TryFrom<&str> for Method {
    type Error = RestError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Infallible> for RestError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Ordered header list with case-insensitive keys.
///
/// Inserting an existing key replaces the value in place, so the original
/// position is kept and the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    /// Append without replacing; used for response headers, which may repeat.
    pub(crate) fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into `self`; colliding keys take the value from `other`.
    pub fn merge(&mut self, other: Headers) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }

    /// Render every entry as a `Key: Value` line.
    pub fn to_lines(&self) -> Vec<String> {
        self.entries.iter().map(|(k, v)| format!("{k}: {v}")).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// The body of a request: a raw string payload or a multipart field set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Raw(String),
    Multipart(Multipart),
}

impl Body {
    /// Encode into the bytes handed to the transfer layer.
    pub fn to_payload(&self) -> Vec<u8> {
        match self {
            Body::Raw(s) => s.as_bytes().to_vec(),
            Body::Multipart(m) => m.encode(),
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Raw(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Raw(s)
    }
}

impl From<Multipart> for Body {
    fn from(m: Multipart) -> Self {
        Body::Multipart(m)
    }
}
