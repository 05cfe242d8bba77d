//! C-ABI wrapper around `rest-core`.
//!
//! # Overview
//! Exposes the chainable REST client through `extern "C"` functions so any
//! language with a C FFI can configure a request, send it and read the
//! response without linking against Rust types.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Setters and `rest_client_send` return an `FfiErrorCode`. On failure the
//!   message is kept on the client and read with `rest_client_last_error`.
//! - Methods are passed as their numeric codes (`HEAD = 0` … `PATCH = 6`).
//! - The C caller owns every returned string or header list and must call
//!   `rest_free_string` / `rest_free_headers` to release it.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rest_core::{Client, Method, RestError};

use types::*;

/// Copy a C string argument. `None` for null; invalid UTF-8 is replaced.
unsafe fn arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Run `f` against a live client and translate the outcome to a code.
fn with_client<F>(client: *mut FfiRestClient, f: F) -> FfiErrorCode
where
    F: FnOnce(&mut Client) -> Result<(), RestError>,
{
    if client.is_null() {
        return FfiErrorCode::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &mut *client };
        match f(&mut client.inner) {
            Ok(()) => {
                client.last_error = None;
                FfiErrorCode::Ok
            }
            Err(e) => client.record(e),
        }
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for `url` using the method with code `method`.
///
/// Returns null if `url` is null, `method` is not a valid code, or an
/// internal panic occurs. Free the result with `rest_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_new(url: *const c_char, method: i32) -> *mut FfiRestClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { arg(url) }) else {
            return std::ptr::null_mut();
        };
        let Ok(method) = Method::try_from(method) else {
            return std::ptr::null_mut();
        };
        let client = Client::with_method(&url, method);
        Box::into_raw(Box::new(FfiRestClient::new(client)))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client and its transfer handle. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_free(client: *mut FfiRestClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_url(client: *mut FfiRestClient, url: *const c_char) -> FfiErrorCode {
    let Some(url) = (unsafe { arg(url) }) else {
        return FfiErrorCode::NullArg;
    };
    with_client(client, |c| {
        c.set_url(&url);
        Ok(())
    })
}

/// Fails with `InvalidArgument` unless `1 <= port <= 65535`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_port(client: *mut FfiRestClient, port: i64) -> FfiErrorCode {
    with_client(client, |c| c.set_port(port).map(|_| ()))
}

/// Fails with `InvalidArgument` for codes outside `0..=6`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_method(client: *mut FfiRestClient, method: i32) -> FfiErrorCode {
    with_client(client, |c| c.set_method(method).map(|_| ()))
}

#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_content_type(
    client: *mut FfiRestClient,
    content_type: *const c_char,
) -> FfiErrorCode {
    let Some(content_type) = (unsafe { arg(content_type) }) else {
        return FfiErrorCode::NullArg;
    };
    with_client(client, |c| {
        c.set_content_type(&content_type);
        Ok(())
    })
}

/// Add one header; an existing header with the same name is replaced.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_add_header(
    client: *mut FfiRestClient,
    key: *const c_char,
    value: *const c_char,
) -> FfiErrorCode {
    let (Some(key), Some(value)) = (unsafe { arg(key) }, unsafe { arg(value) }) else {
        return FfiErrorCode::NullArg;
    };
    with_client(client, |c| {
        c.add_headers([(key, value)]);
        Ok(())
    })
}

/// Replace all headers with `headers[0..len]`. `len == 0` clears them.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_headers(
    client: *mut FfiRestClient,
    headers: *const FfiHeaderInput,
    len: usize,
) -> FfiErrorCode {
    if headers.is_null() && len > 0 {
        return FfiErrorCode::NullArg;
    }
    let inputs = if len == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(headers, len) }
    };
    let mut pairs = Vec::with_capacity(len);
    for header in inputs {
        let (Some(key), Some(value)) = (unsafe { arg(header.key) }, unsafe { arg(header.value) }) else {
            return FfiErrorCode::NullArg;
        };
        pairs.push((key, value));
    }
    with_client(client, |c| {
        c.set_headers(pairs);
        Ok(())
    })
}

/// Set a raw string body; Content-Length is set from its byte length.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_body(client: *mut FfiRestClient, body: *const c_char) -> FfiErrorCode {
    let Some(body) = (unsafe { arg(body) }) else {
        return FfiErrorCode::NullArg;
    };
    with_client(client, |c| {
        c.set_body(body);
        Ok(())
    })
}

/// Milliseconds; 0 means unlimited.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_connect_timeout(client: *mut FfiRestClient, ms: u64) -> FfiErrorCode {
    with_client(client, |c| {
        c.set_connect_timeout(ms);
        Ok(())
    })
}

/// Milliseconds; 0 means unlimited.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_request_timeout(client: *mut FfiRestClient, ms: u64) -> FfiErrorCode {
    with_client(client, |c| {
        c.set_request_timeout(ms);
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Execution and response
// ---------------------------------------------------------------------------

/// Perform the request. Blocks until the exchange completes or fails.
///
/// Returns `Http` for status >= 400; the response is still readable.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_send(client: *mut FfiRestClient) -> FfiErrorCode {
    with_client(client, |c| c.send().map(|_| ()))
}

/// Status of the last completed exchange, -1 if none (or `client` is null).
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_response_status(client: *const FfiRestClient) -> i32 {
    if client.is_null() {
        return rest_core::NO_STATUS;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*client }.inner.response_status_code()))
        .unwrap_or(rest_core::NO_STATUS)
}

/// Body of the last completed exchange. Free with `rest_free_string`.
///
/// Returns null if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_response_body(client: *const FfiRestClient) -> *mut c_char {
    if client.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &*client };
        c_string(client.inner.response_body()).into_raw()
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Headers of the last completed exchange. Free with `rest_free_headers`.
///
/// Returns null if `client` is null or no exchange has completed yet.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_response_headers(client: *const FfiRestClient) -> *mut FfiHeaderList {
    if client.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &*client };
        match client.inner.response_headers() {
            Some(headers) => FfiHeaderList::from_core(headers),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Message of the last failed call, or null if the last call succeeded.
///
/// The pointer is borrowed from the client and stays valid until the next
/// call on the same client. Do not free it.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_last_error(client: *const FfiRestClient) -> *const c_char {
    if client.is_null() {
        return std::ptr::null();
    }
    let client = unsafe { &*client };
    client
        .last_error
        .as_ref()
        .map_or(std::ptr::null(), |msg| msg.as_ptr())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

/// Free a header list returned by `rest_client_response_headers`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_free_headers(list: *mut FfiHeaderList) {
    if list.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let list = unsafe { Box::from_raw(list) };
        if !list.items.is_null() {
            let items = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(list.items, list.len as usize))
            };
            for header in items.iter() {
                if !header.key.is_null() {
                    drop(unsafe { CString::from_raw(header.key) });
                }
                if !header.value.is_null() {
                    drop(unsafe { CString::from_raw(header.value) });
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::net::SocketAddr;

    fn start_server() -> SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });

        addr
    }

    fn new_client(url: &str, method: i32) -> *mut FfiRestClient {
        let url = CString::new(url).unwrap();
        let client = rest_client_new(url.as_ptr(), method);
        assert!(!client.is_null());
        client
    }

    fn last_error(client: *const FfiRestClient) -> Option<String> {
        let ptr = rest_client_last_error(client);
        (!ptr.is_null()).then(|| unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string())
    }

    fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        rest_free_string(ptr);
        s
    }

    #[test]
    fn client_new_and_free() {
        let client = new_client("http://localhost:3000", 1);
        assert_eq!(rest_client_response_status(client), -1);
        rest_client_free(client);
    }

    #[test]
    fn client_new_null_url_returns_null() {
        assert!(rest_client_new(std::ptr::null(), 1).is_null());
    }

    #[test]
    fn client_new_invalid_method_returns_null() {
        let url = CString::new("http://localhost:3000").unwrap();
        assert!(rest_client_new(url.as_ptr(), 7).is_null());
        assert!(rest_client_new(url.as_ptr(), -1).is_null());
    }

    #[test]
    fn free_functions_accept_null() {
        rest_client_free(std::ptr::null_mut());
        rest_free_string(std::ptr::null_mut());
        rest_free_headers(std::ptr::null_mut());
    }

    #[test]
    fn null_client_is_null_arg() {
        assert_eq!(rest_client_set_port(std::ptr::null_mut(), 80), FfiErrorCode::NullArg);
        assert_eq!(rest_client_send(std::ptr::null_mut()), FfiErrorCode::NullArg);
        assert_eq!(rest_client_response_status(std::ptr::null()), -1);
        assert!(rest_client_response_body(std::ptr::null()).is_null());
        assert!(rest_client_last_error(std::ptr::null()).is_null());
    }

    #[test]
    fn invalid_port_sets_last_error() {
        let client = new_client("http://localhost:3000", 1);
        assert_eq!(rest_client_set_port(client, 0), FfiErrorCode::InvalidArgument);
        assert!(last_error(client).unwrap().contains("invalid port: 0"));
        assert_eq!(unsafe { &*client }.inner.port(), 80);

        assert_eq!(rest_client_set_port(client, 8080), FfiErrorCode::Ok);
        assert!(last_error(client).is_none());
        assert_eq!(unsafe { &*client }.inner.port(), 8080);
        rest_client_free(client);
    }

    #[test]
    fn set_method_by_code() {
        let client = new_client("http://localhost:3000", 1);
        assert_eq!(rest_client_set_method(client, 6), FfiErrorCode::Ok);
        assert_eq!(unsafe { &*client }.inner.method(), Method::Patch);
        assert_eq!(rest_client_set_method(client, 9), FfiErrorCode::InvalidArgument);
        assert_eq!(unsafe { &*client }.inner.method(), Method::Patch);
        rest_client_free(client);
    }

    #[test]
    fn body_and_headers_are_configured() {
        let client = new_client("http://localhost:3000", 2);
        let body = CString::new("hello").unwrap();
        let key = CString::new("X-Foo").unwrap();
        let one = CString::new("1").unwrap();
        let two = CString::new("2").unwrap();

        assert_eq!(rest_client_set_body(client, body.as_ptr()), FfiErrorCode::Ok);
        assert_eq!(rest_client_add_header(client, key.as_ptr(), one.as_ptr()), FfiErrorCode::Ok);
        assert_eq!(rest_client_add_header(client, key.as_ptr(), two.as_ptr()), FfiErrorCode::Ok);

        let headers = unsafe { &*client }.inner.headers();
        assert_eq!(headers.get("Content-Length"), Some("5"));
        assert_eq!(headers.get("X-Foo"), Some("2"));
        rest_client_free(client);
    }

    #[test]
    fn set_headers_replaces_all() {
        let client = new_client("http://localhost:3000", 1);
        let key = CString::new("X-Bar").unwrap();
        let value = CString::new("3").unwrap();
        let input = [FfiHeaderInput {
            key: key.as_ptr(),
            value: value.as_ptr(),
        }];
        assert_eq!(rest_client_set_headers(client, input.as_ptr(), 1), FfiErrorCode::Ok);
        assert_eq!(unsafe { &*client }.inner.compile_headers(), vec!["X-Bar: 3".to_string()]);

        assert_eq!(rest_client_set_headers(client, std::ptr::null(), 0), FfiErrorCode::Ok);
        assert!(unsafe { &*client }.inner.headers().is_empty());
        assert_eq!(rest_client_set_headers(client, std::ptr::null(), 2), FfiErrorCode::NullArg);
        rest_client_free(client);
    }

    #[test]
    fn send_to_closed_port_is_transport_error() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = new_client(&format!("http://{addr}/echo"), 1);
        assert_eq!(rest_client_set_connect_timeout(client, 1000), FfiErrorCode::Ok);
        assert_eq!(rest_client_send(client), FfiErrorCode::Transport);
        assert!(last_error(client).unwrap().starts_with("transport error"));
        assert_eq!(rest_client_response_status(client), -1);
        assert!(rest_client_response_headers(client).is_null());
        rest_client_free(client);
    }

    #[test]
    fn send_round_trip_and_read_response() {
        let addr = start_server();
        let client = new_client(&format!("http://{addr}/echo"), 2);
        let body = CString::new("ping").unwrap();
        rest_client_set_body(client, body.as_ptr());

        assert_eq!(rest_client_send(client), FfiErrorCode::Ok);
        assert_eq!(rest_client_response_status(client), 200);

        let echo: mock_server::Echo =
            serde_json::from_str(&take_string(rest_client_response_body(client))).unwrap();
        assert_eq!(echo.method, "POST");
        assert_eq!(echo.body, "ping");

        let list = rest_client_response_headers(client);
        assert!(!list.is_null());
        let list_ref = unsafe { &*list };
        assert!(list_ref.len > 0);
        let items = unsafe { std::slice::from_raw_parts(list_ref.items, list_ref.len as usize) };
        let names: Vec<String> = items
            .iter()
            .map(|h| unsafe { CStr::from_ptr(h.key) }.to_str().unwrap().to_string())
            .collect();
        assert!(names.iter().any(|n| n == mock_server::REQUEST_ID_HEADER));
        rest_free_headers(list);
        rest_client_free(client);
    }

    #[test]
    fn send_http_error_keeps_response_readable() {
        let addr = start_server();
        let client = new_client(&format!("http://{addr}/status/418"), 1);
        assert_eq!(rest_client_send(client), FfiErrorCode::Http);
        assert_eq!(rest_client_response_status(client), 418);
        assert_eq!(take_string(rest_client_response_body(client)), "status 418");
        assert!(last_error(client).unwrap().contains("status: 418"));
        rest_client_free(client);
    }
}
