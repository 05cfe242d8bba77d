//! Chainable, blocking REST client.
//!
//! # Design
//! `Client` owns its request configuration and one transfer handle. Setters
//! update the stored configuration and, where the transfer layer needs to
//! know, the handle as well. `send()` pushes the remaining options (headers,
//! connect timeout, payload, CA bundle) into the handle and performs one
//! exchange. Response state lives on the client, so after `send()` the caller
//! reads status, headers and body from the same value it configured.
//!
//! The handle is released exactly once, when the client is dropped or closed.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::{ClientConfig, DEFAULT_PORT};
use crate::error::{ClientRef, HttpError, RestError, Result};
use crate::http::{Body, Headers, Method};
use crate::transfer::{Handle, Transfer};

/// Response status before any exchange has completed.
pub const NO_STATUS: i32 = -1;

/// A configurable HTTP request that can be sent, inspected and re-sent.
///
/// Setters return `&mut Self` (or `Result<&mut Self>` when they validate), so
/// configuration chains:
///
/// ```no_run
/// use rest_core::{Client, Method};
///
/// let mut client = Client::with_method("http://example.com/rest/handler", Method::Post);
/// client
///     .set_body(r#"{"test":"message"}"#)
///     .add_headers([("X-Requested-With", "rest-core")])
///     .send()?;
/// println!("{}", client.response_body());
/// # Ok::<(), rest_core::RestError>(())
/// ```
pub struct Client<T: Transfer = Handle> {
    id: Uuid,
    url: String,
    port: u16,
    method: Method,
    content_type: String,
    headers: Headers,
    body: Option<Body>,
    response_status: i32,
    response_headers: Option<Headers>,
    response_body: String,
    response_bytes: Vec<u8>,
    connect_timeout_ms: u64,
    request_timeout_ms: u64,
    ca_bundle: Option<PathBuf>,
    transfer: T,
}

impl Client<Handle> {
    pub fn new(url: &str) -> Self {
        Self::with_method(url, Method::Get)
    }

    pub fn with_method(url: &str, method: Method) -> Self {
        Self::with_config(url, method, &ClientConfig::default())
    }

    pub fn with_config(url: &str, method: Method, config: &ClientConfig) -> Self {
        Self::with_transfer(url, method, config, Handle::new())
    }
}

impl<T: Transfer> Client<T> {
    /// Build a client around a caller-supplied transfer handle.
    pub fn with_transfer(url: &str, method: Method, config: &ClientConfig, transfer: T) -> Self {
        let mut client = Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            port: DEFAULT_PORT,
            method,
            content_type: String::new(),
            headers: Headers::new(),
            body: None,
            response_status: NO_STATUS,
            response_headers: None,
            response_body: String::new(),
            response_bytes: Vec::new(),
            connect_timeout_ms: config.connect_timeout_ms,
            request_timeout_ms: config.request_timeout_ms,
            ca_bundle: config.ca_bundle.clone(),
            transfer,
        };
        client.set_url(url);
        client.apply_method(method);
        client.set_content_type(&config.content_type);
        client.set_connect_timeout(config.connect_timeout_ms);
        client.set_request_timeout(config.request_timeout_ms);
        client
    }

    pub fn set_url(&mut self, url: &str) -> &mut Self {
        self.url = url.to_string();
        self.transfer.set_url(url);
        self
    }

    /// Override the port in the URL. Fails unless `1 <= port <= 65535`.
    pub fn set_port(&mut self, port: i64) -> Result<&mut Self> {
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| RestError::InvalidArgument(format!("invalid port: {port}")))?;
        self.port = port;
        self.transfer.set_port(port);
        Ok(self)
    }

    /// Accepts a `Method`, a method name (`"PATCH"`) or a method code (`6`).
    pub fn set_method<M>(&mut self, method: M) -> Result<&mut Self>
    where
        M: TryInto<Method>,
        M::Error: Into<RestError>,
    {
        let method = method.try_into().map_err(Into::into)?;
        self.apply_method(method);
        Ok(self)
    }

    fn apply_method(&mut self, method: Method) {
        self.transfer.clear_method(self.method);
        self.transfer.set_method(method);
        self.method = method;
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.headers.insert("Content-Type", content_type);
        self.content_type = content_type.to_string();
        self
    }

    /// Replace every request header, including Content-Type and
    /// Content-Length.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers.into_iter().collect();
        self
    }

    /// Merge into the current headers; on collision the new value wins.
    pub fn add_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.merge(headers.into_iter().collect());
        self
    }

    /// A string body also sets Content-Length to its byte length.
    pub fn set_body(&mut self, body: impl Into<Body>) -> &mut Self {
        let body = body.into();
        if let Body::Raw(raw) = &body {
            self.headers.insert("Content-Length", raw.len().to_string());
        }
        self.body = Some(body);
        self
    }

    /// 0 means unlimited.
    pub fn set_connect_timeout(&mut self, ms: u64) -> &mut Self {
        self.connect_timeout_ms = ms;
        self.transfer.set_connect_timeout(ms);
        self
    }

    /// 0 means unlimited; use it for long uploads.
    pub fn set_request_timeout(&mut self, ms: u64) -> &mut Self {
        self.request_timeout_ms = ms;
        self.transfer.set_request_timeout(ms);
        self
    }

    pub fn set_ca_bundle(&mut self, path: Option<PathBuf>) -> &mut Self {
        self.ca_bundle = path;
        self
    }

    /// Perform the request with the current configuration.
    ///
    /// Transport failures leave the previous response state untouched. Any
    /// completed exchange replaces it, including one that returns
    /// `RestError::Http`.
    pub fn send(&mut self) -> Result<&mut Self> {
        log::debug!("{} {} (client {})", self.method, self.url, self.id);

        self.transfer.set_header_lines(self.compile_headers());
        self.transfer.set_connect_timeout(self.connect_timeout_ms);
        self.transfer.set_payload(self.body.as_ref().map(Body::to_payload));
        self.transfer.set_ca_bundle(self.ca_bundle.as_deref());

        let response = self.transfer.perform().inspect_err(|e| {
            log::debug!("{} {} failed: {e}", self.method, self.url);
        })?;

        let status = response.status;
        self.response_status = i32::from(status);
        self.response_headers = Some(response.headers);
        self.response_body = String::from_utf8_lossy(&response.body).into_owned();
        self.response_bytes = response.body;

        if status > 399 {
            return Err(RestError::Http(HttpError::new(
                status,
                self.response_headers.clone().unwrap_or_default(),
                self.response_body.clone(),
                self.client_ref(),
            )));
        }
        Ok(self)
    }

    /// Release the transfer handle now instead of at end of scope.
    pub fn close(self) {
        drop(self);
    }

    /// Header lines as the transfer layer receives them.
    pub fn compile_headers(&self) -> Vec<String> {
        match &self.body {
            Some(Body::Multipart(form)) => {
                let mut headers = self.headers.clone();
                headers.insert("Content-Type", form.content_type());
                headers.to_lines()
            }
            _ => self.headers.to_lines(),
        }
    }

    pub fn client_ref(&self) -> ClientRef {
        ClientRef {
            id: self.id,
            url: self.url.clone(),
            method: self.method,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn connect_timeout_ms(&self) -> u64 {
        self.connect_timeout_ms
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    pub fn ca_bundle(&self) -> Option<&Path> {
        self.ca_bundle.as_deref()
    }

    /// `None` until an exchange completes.
    pub fn response_headers(&self) -> Option<&Headers> {
        self.response_headers.as_ref()
    }

    /// The body decoded as UTF-8; invalid sequences become U+FFFD. Use
    /// `response_bytes` for binary content.
    pub fn response_body(&self) -> &str {
        &self.response_body
    }

    /// The body exactly as received.
    pub fn response_bytes(&self) -> &[u8] {
        &self.response_bytes
    }

    /// `NO_STATUS` (-1) until an exchange completes.
    pub fn response_status_code(&self) -> i32 {
        self.response_status
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }
}

impl<T: Transfer> Drop for Client<T> {
    fn drop(&mut self) {
        self.transfer.close();
    }
}

impl<T: Transfer> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("port", &self.port)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("response_status", &self.response_status)
            .finish_non_exhaustive()
    }
}
