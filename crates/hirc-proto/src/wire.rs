//! Field-by-field binary encoding of the envelope types.
//!
//! The scheme is deliberately explicit: every union carries a leading tag
//! byte, text is a 4-byte big-endian byte length followed by UTF-8, and
//! sequences and maps are a 4-byte big-endian count followed by their
//! elements (map entries are key then value). Integers are big-endian.

use crate::envelope::{ClientMsg, DaemonMsg, DaemonRequest};
use crate::types::{ChannelData, ChannelId, ChannelMessage, MessageBody};
use bytes::{Buf, BufMut, BytesMut};
use chrono::DateTime;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors produced while decoding a frame.
///
/// Any of these terminates the session that produced the frame; partial
/// decodes are never acted upon.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("frame truncated")]
    Truncated,
    #[error("unknown {context} tag {tag}")]
    UnknownTag { context: &'static str, tag: u8 },
    #[error("text field is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("unparseable timestamp: {0}")]
    BadTimestamp(#[from] chrono::ParseError),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serialize a value into a byte buffer.
pub trait Encode {
    fn encode(&self, dst: &mut BytesMut);
}

/// Deserialize a value from a byte buffer.
pub trait Decode: Sized {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError>;
}

fn get_u8(src: &mut impl Buf) -> Result<u8, WireError> {
    if src.remaining() < 1 {
        return Err(WireError::Truncated);
    }
    Ok(src.get_u8())
}

fn get_u32(src: &mut impl Buf) -> Result<u32, WireError> {
    if src.remaining() < 4 {
        return Err(WireError::Truncated);
    }
    Ok(src.get_u32())
}

fn get_u64(src: &mut impl Buf) -> Result<u64, WireError> {
    if src.remaining() < 8 {
        return Err(WireError::Truncated);
    }
    Ok(src.get_u64())
}

impl Encode for String {
    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32(self.len() as u32);
        dst.put_slice(self.as_bytes());
    }
}

impl Decode for String {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        let len = get_u32(src)? as usize;
        if src.remaining() < len {
            return Err(WireError::Truncated);
        }
        let mut raw = vec![0u8; len];
        src.copy_to_slice(&mut raw);
        Ok(String::from_utf8(raw)?)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32(self.len() as u32);
        for item in self {
            item.encode(dst);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        let count = get_u32(src)? as usize;
        // Cap the pre-allocation; a hostile count must not OOM the decoder.
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(T::decode(src)?);
        }
        Ok(items)
    }
}

impl<K: Encode + Ord, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32(self.len() as u32);
        for (key, value) in self {
            key.encode(dst);
            value.encode(dst);
        }
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        let count = get_u32(src)? as usize;
        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = K::decode(src)?;
            let value = V::decode(src)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl Encode for ChannelId {
    fn encode(&self, dst: &mut BytesMut) {
        self.server.encode(dst);
        self.channel.encode(dst);
    }
}

impl Decode for ChannelId {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        Ok(Self {
            server: String::decode(src)?,
            channel: String::decode(src)?,
        })
    }
}

impl Encode for MessageBody {
    fn encode(&self, dst: &mut BytesMut) {
        self.text.encode(dst);
        self.author.encode(dst);
        self.timestamp.to_rfc3339().encode(dst);
    }
}

impl Decode for MessageBody {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        let text = String::decode(src)?;
        let author = String::decode(src)?;
        let stamp = String::decode(src)?;
        Ok(Self {
            text,
            author,
            timestamp: DateTime::parse_from_rfc3339(&stamp)?,
        })
    }
}

impl Encode for ChannelMessage {
    fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Chat(body) => {
                dst.put_u8(0);
                body.encode(dst);
            }
            Self::Topic(body) => {
                dst.put_u8(1);
                body.encode(dst);
            }
        }
    }
}

impl Decode for ChannelMessage {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        match get_u8(src)? {
            0 => Ok(Self::Chat(MessageBody::decode(src)?)),
            1 => Ok(Self::Topic(MessageBody::decode(src)?)),
            tag => Err(WireError::UnknownTag {
                context: "channel message",
                tag,
            }),
        }
    }
}

impl Encode for ChannelData {
    fn encode(&self, dst: &mut BytesMut) {
        self.users.encode(dst);
        self.log.encode(dst);
        self.topic.encode(dst);
    }
}

impl Decode for ChannelData {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        Ok(Self {
            users: Vec::decode(src)?,
            log: Vec::decode(src)?,
            topic: String::decode(src)?,
        })
    }
}

impl Encode for ClientMsg {
    fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Hello {
                client_id,
                available_channels,
            } => {
                dst.put_u8(0);
                dst.put_u64(*client_id);
                available_channels.encode(dst);
            }
            Self::Subscriptions { channels } => {
                dst.put_u8(1);
                channels.encode(dst);
            }
            Self::NewMessage { target, message } => {
                dst.put_u8(2);
                target.encode(dst);
                message.encode(dst);
            }
            Self::NewTopic { target, message } => {
                dst.put_u8(3);
                target.encode(dst);
                message.encode(dst);
            }
            Self::InitialTopic { target, topic } => {
                dst.put_u8(4);
                target.encode(dst);
                topic.encode(dst);
            }
        }
    }
}

impl Decode for ClientMsg {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        match get_u8(src)? {
            0 => Ok(Self::Hello {
                client_id: get_u64(src)?,
                available_channels: Vec::decode(src)?,
            }),
            1 => Ok(Self::Subscriptions {
                channels: BTreeMap::decode(src)?,
            }),
            2 => Ok(Self::NewMessage {
                target: ChannelId::decode(src)?,
                message: ChannelMessage::decode(src)?,
            }),
            3 => Ok(Self::NewTopic {
                target: ChannelId::decode(src)?,
                message: ChannelMessage::decode(src)?,
            }),
            4 => Ok(Self::InitialTopic {
                target: ChannelId::decode(src)?,
                topic: String::decode(src)?,
            }),
            tag => Err(WireError::UnknownTag {
                context: "client message",
                tag,
            }),
        }
    }
}

impl Encode for DaemonMsg {
    fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Subscribe { channels } => {
                dst.put_u8(0);
                channels.encode(dst);
            }
            Self::SendMessage { target, text } => {
                dst.put_u8(1);
                target.encode(dst);
                text.encode(dst);
            }
            Self::Goodbye => {
                dst.put_u8(2);
            }
        }
    }
}

impl Decode for DaemonMsg {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        match get_u8(src)? {
            0 => Ok(Self::Subscribe {
                channels: Vec::decode(src)?,
            }),
            1 => Ok(Self::SendMessage {
                target: ChannelId::decode(src)?,
                text: String::decode(src)?,
            }),
            2 => Ok(Self::Goodbye),
            tag => Err(WireError::UnknownTag {
                context: "daemon message",
                tag,
            }),
        }
    }
}

impl Encode for DaemonRequest {
    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u64(self.source);
        self.msg.encode(dst);
    }
}

impl Decode for DaemonRequest {
    fn decode(src: &mut impl Buf) -> Result<Self, WireError> {
        Ok(Self {
            source: get_u64(src)?,
            msg: DaemonMsg::decode(src)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn stamp() -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2026-03-01T12:30:45+01:00").unwrap()
    }

    fn roundtrip<T: Encode + Decode + PartialEq + std::fmt::Debug>(value: T) {
        let mut buf = BytesMut::new();
        value.encode(&mut buf);
        let mut src = buf.freeze();
        let decoded = T::decode(&mut src).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(src.remaining(), 0, "decode left trailing bytes");
    }

    #[test]
    fn text_layout_is_length_prefixed_utf8() {
        let mut buf = BytesMut::new();
        "hi".to_string().encode(&mut buf);
        assert_eq!(&buf[..], &[0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn hello_carries_tag_zero() {
        let mut buf = BytesMut::new();
        ClientMsg::Hello {
            client_id: 1,
            available_channels: vec![],
        }
        .encode(&mut buf);
        assert_eq!(buf[0], 0);
        // 8-byte big-endian client id follows the tag.
        assert_eq!(&buf[1..9], &[0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn envelope_roundtrips() {
        roundtrip(ClientMsg::Hello {
            client_id: 42,
            available_channels: vec![
                ChannelId::new("TS", "#a"),
                ChannelId::new("TS", "#b"),
            ],
        });

        let mut channels = BTreeMap::new();
        channels.insert(
            ChannelId::new("TS", "#a"),
            ChannelData {
                users: vec!["alice".into(), "bob".into()],
                log: vec![
                    ChannelMessage::chat("hello", "alice", stamp()),
                    ChannelMessage::topic("new topic", "bob", stamp()),
                ],
                topic: "new topic".into(),
            },
        );
        roundtrip(ClientMsg::Subscriptions { channels });

        roundtrip(ClientMsg::NewMessage {
            target: ChannelId::new("TS", "#a"),
            message: ChannelMessage::chat("hi", "ME", stamp()),
        });

        roundtrip(ClientMsg::InitialTopic {
            target: ChannelId::new("TS", "#a"),
            topic: "welcome".into(),
        });

        roundtrip(DaemonRequest {
            source: 7,
            msg: DaemonMsg::Subscribe {
                channels: vec![ChannelId::new("TS", "#a")],
            },
        });

        roundtrip(DaemonRequest {
            source: 7,
            msg: DaemonMsg::SendMessage {
                target: ChannelId::new("TS", "#a"),
                text: "hi".into(),
            },
        });

        roundtrip(DaemonRequest {
            source: 7,
            msg: DaemonMsg::Goodbye,
        });
    }

    #[test]
    fn timestamp_survives_encoding_precision() {
        let ts = DateTime::parse_from_rfc3339("2026-03-01T12:30:45.123456789-05:00").unwrap();
        roundtrip(ChannelMessage::chat("x", "y", ts));
    }

    #[test]
    fn truncated_text_is_an_error() {
        let mut src = bytes::Bytes::from_static(&[0, 0, 0, 9, b'h', b'i']);
        assert!(matches!(
            String::decode(&mut src),
            Err(WireError::Truncated)
        ));
    }

    #[test]
    fn unknown_envelope_tag_is_an_error() {
        let mut src = bytes::Bytes::from_static(&[9]);
        assert!(matches!(
            ClientMsg::decode(&mut src),
            Err(WireError::UnknownTag { tag: 9, .. })
        ));
    }

    #[test]
    fn empty_buffer_is_truncated() {
        let mut src = bytes::Bytes::new();
        assert!(matches!(
            DaemonMsg::decode(&mut src),
            Err(WireError::Truncated)
        ));
    }
}
