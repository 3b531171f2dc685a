//! Decoder for `Transfer-Encoding: chunked` bodies (RFC 9112 section 7.1).
//!
//! Chunk extensions and trailer fields are accepted and discarded.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// first hex digit of the chunk size, at least one is required
    SizeStart,
    /// further hex digits of the chunk size
    Size,
    /// whitespace between the size and the line end or an extension
    SizeWhitespace,
    /// `;name=value` after the size, ignored
    Extension,
    /// LF closing the size line
    SizeLf,
    Data,
    DataCr,
    DataLf,
    /// start of a trailer line, or CR of the final empty line
    TrailerStart,
    Trailer,
    TrailerLf,
    EndLf,
    End,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::SizeStart, remaining: 0 }
    }

    /// Consumes one framing byte and moves the state machine forward.
    fn step(&mut self, byte: u8) -> Result<State, ParseError> {
        let next = match (self.state, byte) {
            (State::SizeStart | State::Size, b) if b.is_ascii_hexdigit() => {
                // is_ascii_hexdigit guarantees to_digit succeeds
                let digit = u64::from(char::from(b).to_digit(16).unwrap_or(0));
                self.remaining = self
                    .remaining
                    .checked_mul(16)
                    .and_then(|size| size.checked_add(digit))
                    .ok_or_else(|| ParseError::invalid_body("chunk size overflow"))?;
                State::Size
            }
            (State::Size | State::SizeWhitespace, b'\t' | b' ') => State::SizeWhitespace,
            (State::Size | State::SizeWhitespace, b';') => State::Extension,
            (State::Size | State::SizeWhitespace | State::Extension, b'\r') => State::SizeLf,
            (State::Extension, b'\n') => return Err(ParseError::invalid_body("chunk extension contains newline")),
            (State::Extension, _) => State::Extension,
            (State::SizeLf, b'\n') if self.remaining == 0 => State::TrailerStart,
            (State::SizeLf, b'\n') => State::Data,
            (State::DataCr, b'\r') => State::DataLf,
            (State::DataLf, b'\n') => State::SizeStart,
            (State::TrailerStart, b'\r') => State::EndLf,
            (State::TrailerStart | State::Trailer, b'\r') => State::TrailerLf,
            (State::TrailerStart | State::Trailer, _) => State::Trailer,
            (State::TrailerLf, b'\n') => State::TrailerStart,
            (State::EndLf, b'\n') => State::End,
            (state, b) => {
                return Err(ParseError::invalid_body(format!("unexpected byte {b:#04x} in chunked body state {state:?}")));
            }
        };
        Ok(next)
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }
                State::Data => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
                    let bytes = src.split_to(len).freeze();
                    self.remaining -= len as u64;
                    if self.remaining == 0 {
                        self.state = State::DataCr;
                    }
                    trace!(len = bytes.len(), "read chunked bytes");
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }
                _ => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let byte = src.get_u8();
                    self.state = self.step(byte)?;
                }
            }
        }
    }
}
