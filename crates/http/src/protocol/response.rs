//! HTTP response head and reason phrase handling.
//!
//! The engine uses `http::Response<()>` as the head of an outgoing response.
//! `http::StatusCode` only knows the canonical reason phrases, so a handler that
//! wants a custom one (for example `403 Request Forbidden`) stores a
//! [`ReasonPhrase`] in the response extensions; the header encoder picks it up
//! when it writes the status line.

use http::{Response, StatusCode};

/// The header portion of an HTTP response, before a body is attached.
pub type ResponseHead = Response<()>;

/// A custom reason phrase for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonPhrase(&'static str);

impl ReasonPhrase {
    /// Creates a reason phrase, refusing bytes that would break the status line.
    pub fn new(reason: &'static str) -> Option<Self> {
        reason.bytes().all(is_reason_byte).then_some(Self(reason))
    }

    /// Like [`ReasonPhrase::new`] but usable in constants.
    ///
    /// # Panics
    ///
    /// Panics if `reason` contains a control character other than tab.
    pub const fn from_static(reason: &'static str) -> Self {
        let bytes = reason.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            assert!(is_reason_byte(bytes[i]), "invalid reason phrase");
            i += 1;
        }
        Self(reason)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Returns the reason phrase to send for `head`: the custom one if present,
/// otherwise the canonical phrase of the status code.
pub fn reason_of(head: &ResponseHead) -> &'static str {
    match head.extensions().get::<ReasonPhrase>() {
        Some(reason) => reason.as_str(),
        None => canonical_reason(head.status()),
    }
}

const fn is_reason_byte(b: u8) -> bool {
    b == b'\t' || b == b' ' || (b > 0x20 && b < 0x7f)
}

fn canonical_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}
