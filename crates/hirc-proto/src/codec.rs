//! Length-prefixed frame codecs for each end of the local socket.
//!
//! A frame is a 4-byte big-endian payload length followed by the encoded
//! envelope. The daemon decodes [`DaemonRequest`]s and encodes
//! [`ClientMsg`]s; the client does the reverse.

use crate::envelope::{ClientMsg, DaemonRequest};
use crate::wire::{Decode, Encode, WireError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Maximum payload size accepted on the wire (16 MiB). A peer announcing a
/// larger frame is malformed and its session is terminated.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

fn decode_frame<T: Decode>(src: &mut BytesMut) -> Result<Option<T>, WireError> {
    if src.len() < 4 {
        return Ok(None);
    }

    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    if src.len() < 4 + len {
        // Whole frame not buffered yet; reserve for the rest.
        src.reserve(4 + len - src.len());
        return Ok(None);
    }

    src.advance(4);
    let mut payload = src.split_to(len).freeze();
    let value = T::decode(&mut payload)?;
    if payload.has_remaining() {
        return Err(WireError::TrailingBytes(payload.remaining()));
    }
    Ok(Some(value))
}

fn encode_frame<T: Encode>(item: &T, dst: &mut BytesMut) {
    let mut payload = BytesMut::new();
    item.encode(&mut payload);
    dst.reserve(4 + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.extend_from_slice(&payload);
}

/// Codec for the daemon's side of the socket.
#[derive(Debug, Default)]
pub struct DaemonCodec;

impl Decoder for DaemonCodec {
    type Item = DaemonRequest;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<ClientMsg> for DaemonCodec {
    type Error = WireError;

    fn encode(&mut self, item: ClientMsg, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst);
        Ok(())
    }
}

/// Codec for the client's side of the socket.
#[derive(Debug, Default)]
pub struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = ClientMsg;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<DaemonRequest> for ClientCodec {
    type Error = WireError;

    fn encode(&mut self, item: DaemonRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst);
        Ok(())
    }
}
