//! Streaming HTTP/1.x codecs for use with `tokio_util::codec::{FramedRead, FramedWrite}`.
//!
//! - [`RequestDecoder`] turns bytes into a request head followed by body items.
//! - [`ResponseEncoder`] turns a response head and body items back into bytes.
//!
//! Both sides support `Content-Length` and chunked framing. The chunked body
//! decoder is also exported on its own so that upstream responses fetched for
//! `X-Reproxy-URL` can be de-chunked with the same state machine.

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use body::ChunkedDecoder;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
