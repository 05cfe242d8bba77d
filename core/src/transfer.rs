//! The transfer layer: an option-setting handle that performs one blocking
//! HTTP exchange per `perform()` call.
//!
//! # Design
//! `Transfer` mirrors the shape of a classic transfer-library handle. The
//! client pushes options into it one at a time and then asks it to perform.
//! Switching methods is an explicit two-step operation: `clear_method` for the
//! old method, then `set_method` for the new one, so a handle that is reused
//! across sends never keeps state from a previous method.
//!
//! `Handle` is the production implementation on top of `ureq`. The `ureq`
//! agent is built lazily from the current options and discarded whenever an
//! option it depends on changes. Idle connections are not kept, redirects are
//! not followed and the response body is read without a size cap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ureq::http::uri::{Authority, Uri};
use ureq::tls::{PemItem, RootCerts, TlsConfig};
use ureq::Agent;

use crate::error::RestError;
use crate::http::{Headers, Method};

/// What the transfer layer captured from a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// A configurable, reusable handle for blocking HTTP exchanges.
pub trait Transfer {
    fn set_url(&mut self, url: &str);

    /// Override the port given in the URL.
    fn set_port(&mut self, port: u16);

    /// Undo the handle-level configuration of `method`.
    fn clear_method(&mut self, method: Method);

    fn set_method(&mut self, method: Method);

    /// Request headers as `Key: Value` lines.
    fn set_header_lines(&mut self, lines: Vec<String>);

    fn set_payload(&mut self, payload: Option<Vec<u8>>);

    /// Milliseconds; 0 means unlimited.
    fn set_connect_timeout(&mut self, ms: u64);

    /// Milliseconds for the whole exchange; 0 means unlimited.
    fn set_request_timeout(&mut self, ms: u64);

    fn set_ca_bundle(&mut self, path: Option<&Path>);

    /// Run the exchange with the current options, blocking until it
    /// completes, times out or fails.
    fn perform(&mut self) -> Result<TransferResponse, RestError>;

    /// Release the underlying resources. Calling it again is a no-op.
    fn close(&mut self);
}

/// `ureq`-backed transfer handle.
pub struct Handle {
    url: String,
    port: Option<u16>,
    method: Option<Method>,
    header_lines: Vec<String>,
    payload: Option<Vec<u8>>,
    connect_timeout_ms: u64,
    request_timeout_ms: u64,
    ca_bundle: Option<PathBuf>,
    agent: Option<Agent>,
    open: bool,
}

impl Handle {
    pub fn new() -> Self {
        Self {
            url: String::new(),
            port: None,
            method: None,
            header_lines: Vec::new(),
            payload: None,
            connect_timeout_ms: 0,
            request_timeout_ms: 0,
            ca_bundle: None,
            agent: None,
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The method a perform would use right now. An unset method means GET.
    pub fn effective_method(&self) -> Method {
        self.method.unwrap_or(Method::Get)
    }

    /// The URL a perform would target, with the port override applied.
    pub fn effective_url(&self) -> Result<String, RestError> {
        match self.port {
            Some(port) => with_port(&self.url, port),
            None => Ok(self.url.clone()),
        }
    }

    fn agent(&mut self) -> Result<Agent, RestError> {
        if let Some(agent) = &self.agent {
            return Ok(agent.clone());
        }
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .max_idle_connections(0)
            .timeout_connect(millis(self.connect_timeout_ms))
            .timeout_global(millis(self.request_timeout_ms));
        if let Some(path) = &self.ca_bundle {
            builder = builder.tls_config(tls_from_bundle(path)?);
        }
        let agent = builder.build().new_agent();
        self.agent = Some(agent.clone());
        Ok(agent)
    }

    fn header_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.header_lines.len());
        for line in &self.header_lines {
            let Some((name, value)) = line.split_once(':') else {
                log::warn!("skipping malformed header line {line:?}");
                continue;
            };
            let name = name.trim();
            // The transport derives Content-Length from the bytes it sends.
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            pairs.push((name, value.trim()));
        }
        pairs
    }

    fn request_builder(&self, method: Method, url: &str) -> ureq::http::request::Builder {
        self.header_pairs().into_iter().fold(
            ureq::http::Request::builder().method(method.as_str()).uri(url),
            |builder, (name, value)| builder.header(name, value),
        )
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("url", &self.url)
            .field("port", &self.port)
            .field("method", &self.method)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("ca_bundle", &self.ca_bundle)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl Transfer for Handle {
    fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    fn set_port(&mut self, port: u16) {
        self.port = Some(port);
    }

    fn clear_method(&mut self, method: Method) {
        if self.method == Some(method) {
            self.method = None;
        }
    }

    fn set_method(&mut self, method: Method) {
        self.method = Some(method);
    }

    fn set_header_lines(&mut self, lines: Vec<String>) {
        self.header_lines = lines;
    }

    fn set_payload(&mut self, payload: Option<Vec<u8>>) {
        self.payload = payload;
    }

    fn set_connect_timeout(&mut self, ms: u64) {
        if self.connect_timeout_ms != ms {
            self.connect_timeout_ms = ms;
            self.agent = None;
        }
    }

    fn set_request_timeout(&mut self, ms: u64) {
        if self.request_timeout_ms != ms {
            self.request_timeout_ms = ms;
            self.agent = None;
        }
    }

    fn set_ca_bundle(&mut self, path: Option<&Path>) {
        if self.ca_bundle.as_deref() != path {
            self.ca_bundle = path.map(Path::to_path_buf);
            self.agent = None;
        }
    }

    fn perform(&mut self) -> Result<TransferResponse, RestError> {
        if !self.open {
            return Err(RestError::Transport("transfer handle is closed".to_string()));
        }
        let url = self.effective_url()?;
        let method = self.effective_method();
        let agent = self.agent()?;

        let result = match &self.payload {
            // ureq only sends a DELETE or OPTIONS body when forced to.
            Some(payload) if matches!(method, Method::Delete | Method::Options) => {
                let builder = match method {
                    Method::Delete => agent.delete(url.as_str()),
                    _ => agent.options(url.as_str()),
                };
                self.header_pairs()
                    .into_iter()
                    .fold(builder, |builder, (name, value)| builder.header(name, value))
                    .force_send_body()
                    .send(payload.as_slice())
            }
            Some(payload) if method.carries_body() => {
                let request = self
                    .request_builder(method, &url)
                    .body(payload.as_slice())
                    .map_err(transport)?;
                agent.run(request)
            }
            payload => {
                if payload.is_some() {
                    log::warn!("{method} {url}: request body not sent for this method");
                }
                let request = self.request_builder(method, &url).body(()).map_err(transport)?;
                agent.run(request)
            }
        };
        let mut response = result.map_err(transport)?;

        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(transport)?;

        Ok(TransferResponse { status, headers, body })
    }

    fn close(&mut self) {
        if self.open {
            log::debug!("closing transfer handle for {}", self.url);
            self.agent = None;
            self.open = false;
        }
    }
}

fn transport<E: std::fmt::Display>(e: E) -> RestError {
    RestError::Transport(e.to_string())
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn tls_from_bundle(path: &Path) -> Result<TlsConfig, RestError> {
    let pem = std::fs::read(path)
        .map_err(|e| RestError::Transport(format!("cannot read CA bundle {}: {e}", path.display())))?;
    let mut certs = Vec::new();
    for item in ureq::tls::parse_pem(&pem) {
        if let PemItem::Certificate(cert) = item.map_err(transport)? {
            certs.push(cert.to_owned());
        }
    }
    if certs.is_empty() {
        return Err(RestError::Transport(format!(
            "no certificates in CA bundle {}",
            path.display()
        )));
    }
    Ok(TlsConfig::builder()
        .root_certs(RootCerts::Specific(Arc::new(certs)))
        .build())
}

/// Replace (or add) the port in `url`.
fn with_port(url: &str, port: u16) -> Result<String, RestError> {
    let uri: Uri = url
        .parse()
        .map_err(|e| RestError::Transport(format!("invalid url {url}: {e}")))?;
    let authority = uri
        .authority()
        .ok_or_else(|| RestError::Transport(format!("url has no host: {url}")))?;
    let userinfo = authority
        .as_str()
        .rsplit_once('@')
        .map(|(info, _)| format!("{info}@"))
        .unwrap_or_default();
    let host = authority.host();
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    let authority: Authority = format!("{userinfo}{host}:{port}").parse().map_err(transport)?;

    let mut parts = uri.into_parts();
    parts.authority = Some(authority);
    let uri = Uri::from_parts(parts).map_err(transport)?;
    Ok(uri.to_string())
}
