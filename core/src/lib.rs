//! Chainable, blocking REST client.
//!
//! # Overview
//! A `Client` is configured through fluent setters (URL, port, method,
//! headers, content type, body, timeouts) and then performs one synchronous
//! exchange per `send()`. The response status, headers and body are read back
//! from the client afterwards.
//!
//! # Design
//! - The network exchange sits behind the `Transfer` trait. `Handle` is the
//!   `ureq` implementation; tests substitute a recording fake.
//! - Errors form one sum type, `RestError`: local validation
//!   (`InvalidArgument`), transport failure (`Transport`) and HTTP status
//!   >= 400 (`Http`).
//! - Types use owned `String` / `Vec` fields so they map onto the C ABI in
//!   `rest-ffi`.
//! - No retries, no pooling, no async: one blocking attempt per `send()`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod transfer;

pub use client::{Client, NO_STATUS};
pub use config::ClientConfig;
pub use error::{ClientRef, HttpError, RestError, Result};
pub use http::{content_type, Body, Headers, Method};
pub use multipart::{Multipart, Part};
pub use transfer::{Handle, Transfer, TransferResponse};
