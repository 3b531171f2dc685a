//! Connection driver.
//!
//! [`HttpConnection`] owns the read and write halves of one client stream and
//! runs the request/response loop over them. When a handler answers with an
//! `X-Reproxy-URL` header and [`ConnectionOptions::reproxy`] is set, the
//! driver fetches that URL and sends the upstream response instead.

mod http_connection;
mod reproxy;

pub use http_connection::{ConnectionOptions, HttpConnection};
pub use reproxy::X_REPROXY_URL;
