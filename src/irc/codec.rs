//! Line framing for the upstream IRC byte stream.

use crate::irc::message::{Line, ParseError};
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// RFC 2812 allows 512 bytes; modern networks with message tags go to 8191.
const MAX_LINE_LEN: usize = 8191;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("line exceeds {MAX_LINE_LEN} bytes")]
    LineTooLong,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Frames the upstream stream into [`Line`]s on `\n` boundaries (an
/// optional preceding `\r` is stripped). Blank lines are skipped.
#[derive(Debug, Default)]
pub struct IrcCodec;

impl tokio_util::codec::Decoder for IrcCodec {
    type Item = Line;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src.iter().position(|&b| b == b'\n') else {
                if src.len() > MAX_LINE_LEN {
                    return Err(CodecError::LineTooLong);
                }
                return Ok(None);
            };

            let raw = src.split_to(pos);
            src.advance(1); // the \n itself
            let raw = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
            if raw.is_empty() {
                continue;
            }

            let text = std::str::from_utf8(raw)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            return Ok(Some(Line::parse(text)?));
        }
    }
}

impl tokio_util::codec::Encoder<Line> for IrcCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Line, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let wire = item.to_wire();
        dst.reserve(wire.len() + 2);
        dst.put_slice(wire.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
