//! Request header decoding and response header encoding.
//!
//! - [`HeaderDecoder`]: request line + header fields, size limits, body framing
//! - [`HeaderEncoder`]: status line + header fields, Content-Length / Transfer-Encoding

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
