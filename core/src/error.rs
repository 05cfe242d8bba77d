//! Error types for the REST client.
//!
//! # Design
//! Three failure classes, in the order they can occur during a call:
//! `InvalidArgument` is raised by setters before any network activity,
//! `Transport` when the transfer layer could not complete the exchange, and
//! `Http` when the exchange completed but the server answered with a status
//! of 400 or above. `Http` carries the full response for diagnosis together
//! with a `ClientRef` naming the client that sent the request.

use std::fmt;

use uuid::Uuid;

use crate::http::{Headers, Method};

pub type Result<T> = std::result::Result<T, RestError>;

/// Errors returned by `Client` setters and `Client::send`.
#[derive(Debug)]
pub enum RestError {
    /// A setter was given a value it cannot apply (bad port, unknown method).
    InvalidArgument(String),

    /// The transfer layer failed: DNS, connect, timeout, TLS.
    Transport(String),

    /// The server answered with status >= 400.
    Http(HttpError),
}

impl RestError {
    /// HTTP status for `Http` errors, `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RestError::Http(e) => Some(e.status_code()),
            _ => None,
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            RestError::Transport(msg) => write!(f, "transport error: {msg}"),
            RestError::Http(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HttpError> for RestError {
    fn from(e: HttpError) -> Self {
        RestError::Http(e)
    }
}

/// Identity of the client that produced an `HttpError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRef {
    pub id: Uuid,
    pub url: String,
    pub method: Method,
}

/// A completed exchange whose status was 400 or above.
#[derive(Debug, Clone)]
pub struct HttpError {
    status: u16,
    headers: Headers,
    body: String,
    client: ClientRef,
}

impl HttpError {
    pub fn new(status: u16, headers: Headers, body: String, client: ClientRef) -> Self {
        Self {
            status,
            headers,
            body,
            client,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn client(&self) -> &ClientRef {
        &self.client
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "the request came back with an error")?;
        writeln!(f, "status: {}", self.status)?;
        writeln!(f, "headers:")?;
        for (k, v) in self.headers.iter() {
            writeln!(f, "\t{k}:  {v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}
