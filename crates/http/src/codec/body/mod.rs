//! Body framing: Content-Length and chunked transfer encoding, both directions.

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
