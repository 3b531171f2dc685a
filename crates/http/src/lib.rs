//! A small HTTP/1.x engine built on tokio codecs.
//!
//! The engine parses requests off a byte stream, collects each request body,
//! hands the complete `Request<Bytes>` to a [`handler::Handler`] and serializes
//! the returned `Response` back to the peer. Responses whose body size is
//! known are sent with `Content-Length`, all others with chunked transfer
//! encoding.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use docserve_http::connection::HttpConnection;
//! use docserve_http::handler::make_handler;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! async fn echo(request: Request<Bytes>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     Ok(Response::new(Full::new(request.into_body())))
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let handler = Arc::new(make_handler(echo));
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = stream.into_split();
//!             let _ = HttpConnection::new(reader, writer).process(handler).await;
//!         });
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`connection`]: the per-connection request loop and reproxy substitution
//! - [`codec`]: request decoder and response encoder
//! - [`protocol`]: message types and errors
//! - [`handler`]: the handler trait
//!
//! # Limits
//!
//! - HTTP/1.0 and HTTP/1.1 only, no TLS
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
