use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    /// bytes still allowed on the wire
    length: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                let remaining = bytes.remaining() as u64;
                if remaining > self.length {
                    warn!(expected = self.length, actual = remaining, "body is longer than its content-length");
                    return Err(SendError::invalid_body("body is longer than its content-length"));
                }
                self.length -= remaining;
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(len);
                }
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                if self.length == 0 {
                    Ok(())
                } else {
                    Err(SendError::invalid_body(format!("body ended {} bytes before its content-length", self.length)))
                }
            }
        }
    }
}
