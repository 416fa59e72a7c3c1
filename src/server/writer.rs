//! Response state tracking.
//!
//! Filters and handlers never return a response. They write into a shared
//! [`ResponseWriter`], and the dispatcher asks the writer after every call
//! whether anything was written. Once a status or body byte has gone in,
//! the rest of the chain is skipped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use log::warn;

use crate::server::response::{HttpResponse, StatusCode};

#[derive(Debug)]
struct WriterState {
    response: HttpResponse,
    status_written: bool,
}

/// A cloneable handle to the response being built for one request.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    state: Arc<Mutex<WriterState>>,
    started: Arc<AtomicBool>,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    /// Create a writer around an empty `200 OK` response.
    pub fn new() -> Self {
        Self::wrap(HttpResponse::new(StatusCode::Ok))
    }

    /// Create a writer around an existing response (e.g. one carrying default headers).
    pub fn wrap(response: HttpResponse) -> Self {
        Self {
            state: Arc::new(Mutex::new(WriterState {
                response,
                status_written: false,
            })),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        // A handler that panicked mid-write leaves the state usable; the
        // response is already undefined at that point.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a status or body has been written.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// The status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        let state = self.lock();
        state.status_written.then_some(state.response.status)
    }

    /// Add or replace a header. Does not start the response.
    ///
    /// Once the response has started its headers are fixed, and this only
    /// logs a warning.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if self.is_started() {
            warn!("Header {name} set after the response started, ignored");
            return;
        }
        self.lock().response.headers.insert(name, value.into());
    }

    /// Read a header set so far (case-insensitive).
    pub fn header(&self, name: &str) -> Option<String> {
        self.lock().response.get_header(name).cloned()
    }

    /// Write the status code. Only the first call takes effect.
    pub fn write_status(&self, status: StatusCode) {
        let mut state = self.lock();
        if state.status_written {
            warn!(
                "Superfluous status write: {} after {}",
                status as u16, state.response.status as u16
            );
            return;
        }
        self.started.store(true, Ordering::SeqCst);
        state.status_written = true;
        state.response.status = status;
    }

    /// Append bytes to the body. Implies `200 OK` if no status was written.
    pub fn write(&self, bytes: impl AsRef<[u8]>) {
        let mut state = self.lock();
        self.started.store(true, Ordering::SeqCst);
        state.status_written = true;
        state.response.body.extend_from_slice(bytes.as_ref());
    }

    /// Append a string to the body.
    pub fn write_str(&self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Reply with a plain-text error message.
    pub fn error(&self, status: StatusCode, message: &str) {
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.set_header("X-Content-Type-Options", "nosniff");
        self.write_status(status);
        self.write(format!("{message}\n"));
    }

    /// Take the finished response, with `Content-Length` set from the body.
    pub fn into_response(self) -> HttpResponse {
        let state = self.lock();
        let mut response = state.response.clone();
        let content_length = response.body.len().to_string();
        response.headers.insert("Content-Length".to_string(), content_length);
        response
    }
}
