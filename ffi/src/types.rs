//! C-compatible types for the REST client ABI.
//!
//! # Ownership
//! - `FfiRestClient` is opaque to C; create it with `rest_client_new` and
//!   release it with `rest_client_free`.
//! - `FfiHeaderInput` is caller-owned and only read during the call.
//! - Strings and `FfiHeaderList` values returned by the library are owned by
//!   the caller and must be released with `rest_free_string` /
//!   `rest_free_headers`.

use std::ffi::CString;
use std::os::raw::c_char;

use rest_core::{Client, Headers, RestError};

/// Opaque client handle. Remembers the message of the last failed call.
pub struct FfiRestClient {
    pub(crate) inner: Client,
    pub(crate) last_error: Option<CString>,
}

impl FfiRestClient {
    pub(crate) fn new(inner: Client) -> Self {
        Self {
            inner,
            last_error: None,
        }
    }

    /// Store `err` as the last error and map it to its code.
    pub(crate) fn record(&mut self, err: RestError) -> FfiErrorCode {
        let code = FfiErrorCode::from(&err);
        log::debug!("rest-ffi call failed: {err}");
        self.last_error = Some(c_string(&err.to_string()));
        code
    }
}

/// Result codes for every fallible `rest_client_*` call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidArgument = 1,
    Transport = 2,
    Http = 3,
    NullArg = 4,
    Panic = 5,
}

impl From<&RestError> for FfiErrorCode {
    fn from(err: &RestError) -> Self {
        match err {
            RestError::InvalidArgument(_) => FfiErrorCode::InvalidArgument,
            RestError::Transport(_) => FfiErrorCode::Transport,
            RestError::Http(_) => FfiErrorCode::Http,
        }
    }
}

/// A header passed in by the C caller.
#[repr(C)]
pub struct FfiHeaderInput {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// A header returned to the C caller.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A list of headers returned to the C caller.
#[repr(C)]
pub struct FfiHeaderList {
    pub items: *mut FfiHeader,
    pub len: u32,
}

impl FfiHeaderList {
    /// Convert core headers into a heap-allocated list.
    ///
    /// The caller must free the returned pointer with `rest_free_headers`.
    pub(crate) fn from_core(headers: &Headers) -> *mut Self {
        let items: Box<[FfiHeader]> = headers
            .iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k).into_raw(),
                value: c_string(v).into_raw(),
            })
            .collect();
        let len = items.len() as u32;

        let items = if items.is_empty() {
            std::ptr::null_mut()
        } else {
            Box::into_raw(items) as *mut FfiHeader
        };
        Box::into_raw(Box::new(FfiHeaderList { items, len }))
    }
}

/// `CString` from Rust text; interior NUL bytes are dropped.
pub(crate) fn c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}
