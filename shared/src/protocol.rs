//! Fixed-format binary wire codec.
//!
//! Every message is a 6-byte big-endian header (sequence number, session
//! id, type tag) followed by a payload whose exact size is determined by
//! the tag. Payloads are not self-describing: [`body_len`] is the single
//! source of truth for how many bytes each tag occupies, and the decoder
//! validates both the tag and the remaining buffer length before reading
//! a single payload byte. Strings travel as fixed-width NUL-padded
//! buffers, truncated on overflow.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// Wire size of the message header: seq (4) + session id (1) + tag (1).
pub const HEADER_LEN: usize = 6;

/// Fixed width of the nickname field on the wire.
pub const NICK_MAX_LEN: usize = 16;

/// Fixed width of the map name field on the wire.
pub const MAP_NAME_MAX_LEN: usize = 32;

/// Largest possible encoded message (a `ConnectReply`).
pub const MAX_WIRE_LEN: usize = HEADER_LEN + 2 + MAP_NAME_MAX_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown message type tag {0}")]
    UnknownTag(u8),
    #[error("truncated buffer: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("invalid direction value {0}")]
    BadDirection(u8),
    #[error("batch datagram has {trailing} trailing bytes after {count} messages")]
    TrailingBytes { count: u8, trailing: usize },
}

/// Facing/movement direction of a player or bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
}

impl TryFrom<u8> for Direction {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Direction::Left),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Up),
            3 => Ok(Direction::Down),
            other => Err(CodecError::BadDirection(other)),
        }
    }
}

/// One protocol message: header plus tagged payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Monotonic per-session sequence number.
    pub seq: u32,
    /// Session id of the player this message belongs to.
    pub player: u8,
    pub body: MessageBody,
}

/// Payload variants, one per wire tag. The shape of every variant is
/// fully determined by its tag; an unknown tag never decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Client asks to step one cell in a direction.
    Walk { direction: Direction },
    /// Client fires the given weapon catalog index.
    Shoot { weapon: u8 },
    /// Connect handshake request carrying the nickname.
    ConnectRequest { nick: String },
    /// Handshake answer; `ok == 0` is a negative acknowledgment.
    ConnectReply { ok: u8, id: u8, map_name: String },
    /// Another player joined.
    ConnectNotify { nick: String },
    /// Another player left.
    DisconnectNotify { nick: String },
    /// Client announces it is leaving.
    ClientQuit,
    /// Server is shutting down.
    ServerShutdown,
    /// Authoritative position of the receiving player.
    PlayerPosition { x: u16, y: u16 },
    /// Position of some other player inside the viewport.
    EnemyPosition { x: u16, y: u16 },
    /// New vitals of the receiving player after taking damage.
    PlayerHit { hp: u16, armor: u16 },
    /// A wall cell was destroyed.
    MapExplode { x: u16, y: u16 },
    /// The receiving player picked up a bonus.
    OnBonus { kind: u8, index: u8 },
}

impl MessageBody {
    /// Wire tag for this payload variant.
    pub fn tag(&self) -> u8 {
        match self {
            MessageBody::Walk { .. } => 0,
            MessageBody::Shoot { .. } => 1,
            MessageBody::ConnectRequest { .. } => 2,
            MessageBody::ConnectReply { .. } => 3,
            MessageBody::ConnectNotify { .. } => 4,
            MessageBody::DisconnectNotify { .. } => 5,
            MessageBody::ClientQuit => 6,
            MessageBody::ServerShutdown => 7,
            MessageBody::PlayerPosition { .. } => 8,
            MessageBody::EnemyPosition { .. } => 9,
            MessageBody::PlayerHit { .. } => 10,
            MessageBody::MapExplode { .. } => 11,
            MessageBody::OnBonus { .. } => 12,
        }
    }
}

/// Exact payload size in bytes for a wire tag.
///
/// The receiver must know the size of every message type up front; this
/// table is what keeps batch framing and the decoder in agreement.
pub fn body_len(tag: u8) -> Result<usize, CodecError> {
    match tag {
        0 => Ok(1),                    // Walk
        1 => Ok(1),                    // Shoot
        2 => Ok(NICK_MAX_LEN),         // ConnectRequest
        3 => Ok(2 + MAP_NAME_MAX_LEN), // ConnectReply
        4 => Ok(NICK_MAX_LEN),         // ConnectNotify
        5 => Ok(NICK_MAX_LEN),         // DisconnectNotify
        6 => Ok(0),                    // ClientQuit
        7 => Ok(0),                    // ServerShutdown
        8 => Ok(4),                    // PlayerPosition
        9 => Ok(4),                    // EnemyPosition
        10 => Ok(4),                   // PlayerHit
        11 => Ok(4),                   // MapExplode
        12 => Ok(2),                   // OnBonus
        other => Err(CodecError::UnknownTag(other)),
    }
}

/// Writes `text` as a fixed-width NUL-padded field, truncating overflow.
fn put_name(buf: &mut impl BufMut, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let len = bytes.len().min(width);
    buf.put_slice(&bytes[..len]);
    for _ in len..width {
        buf.put_u8(0);
    }
}

/// Reads a fixed-width field, stopping at the first NUL.
fn get_name(buf: &mut impl Buf, width: usize) -> String {
    let mut raw = vec![0u8; width];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

impl Message {
    /// Total encoded size of this message on the wire.
    pub fn wire_len(&self) -> usize {
        // Tag came from a live variant, so the table lookup cannot fail.
        HEADER_LEN + body_len(self.body.tag()).unwrap_or(0)
    }

    /// Serializes the message in network byte order.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.seq);
        buf.put_u8(self.player);
        buf.put_u8(self.body.tag());

        match &self.body {
            MessageBody::Walk { direction } => buf.put_u8(*direction as u8),
            MessageBody::Shoot { weapon } => buf.put_u8(*weapon),
            MessageBody::ConnectRequest { nick } => put_name(buf, nick, NICK_MAX_LEN),
            MessageBody::ConnectReply { ok, id, map_name } => {
                buf.put_u8(*ok);
                buf.put_u8(*id);
                put_name(buf, map_name, MAP_NAME_MAX_LEN);
            }
            MessageBody::ConnectNotify { nick } => put_name(buf, nick, NICK_MAX_LEN),
            MessageBody::DisconnectNotify { nick } => put_name(buf, nick, NICK_MAX_LEN),
            MessageBody::ClientQuit | MessageBody::ServerShutdown => {}
            MessageBody::PlayerPosition { x, y }
            | MessageBody::EnemyPosition { x, y }
            | MessageBody::MapExplode { x, y } => {
                buf.put_u16(*x);
                buf.put_u16(*y);
            }
            MessageBody::PlayerHit { hp, armor } => {
                buf.put_u16(*hp);
                buf.put_u16(*armor);
            }
            MessageBody::OnBonus { kind, index } => {
                buf.put_u8(*kind);
                buf.put_u8(*index);
            }
        }
    }

    /// Deserializes one message, validating the tag and buffer length
    /// before touching the payload.
    pub fn decode(buf: &mut impl Buf) -> Result<Message, CodecError> {
        if buf.remaining() < HEADER_LEN {
            return Err(CodecError::Truncated {
                needed: HEADER_LEN,
                got: buf.remaining(),
            });
        }

        let seq = buf.get_u32();
        let player = buf.get_u8();
        let tag = buf.get_u8();

        let len = body_len(tag)?;
        if buf.remaining() < len {
            return Err(CodecError::Truncated {
                needed: len,
                got: buf.remaining(),
            });
        }

        let body = match tag {
            0 => MessageBody::Walk {
                direction: Direction::try_from(buf.get_u8())?,
            },
            1 => MessageBody::Shoot {
                weapon: buf.get_u8(),
            },
            2 => MessageBody::ConnectRequest {
                nick: get_name(buf, NICK_MAX_LEN),
            },
            3 => MessageBody::ConnectReply {
                ok: buf.get_u8(),
                id: buf.get_u8(),
                map_name: get_name(buf, MAP_NAME_MAX_LEN),
            },
            4 => MessageBody::ConnectNotify {
                nick: get_name(buf, NICK_MAX_LEN),
            },
            5 => MessageBody::DisconnectNotify {
                nick: get_name(buf, NICK_MAX_LEN),
            },
            6 => MessageBody::ClientQuit,
            7 => MessageBody::ServerShutdown,
            8 => MessageBody::PlayerPosition {
                x: buf.get_u16(),
                y: buf.get_u16(),
            },
            9 => MessageBody::EnemyPosition {
                x: buf.get_u16(),
                y: buf.get_u16(),
            },
            10 => MessageBody::PlayerHit {
                hp: buf.get_u16(),
                armor: buf.get_u16(),
            },
            11 => MessageBody::MapExplode {
                x: buf.get_u16(),
                y: buf.get_u16(),
            },
            12 => MessageBody::OnBonus {
                kind: buf.get_u8(),
                index: buf.get_u8(),
            },
            // body_len() already rejected anything else.
            other => return Err(CodecError::UnknownTag(other)),
        };

        Ok(Message { seq, player, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: Message) {
        let mut buf = Vec::with_capacity(message.wire_len());
        message.encode(&mut buf);
        assert_eq!(buf.len(), message.wire_len());

        let mut slice = buf.as_slice();
        let decoded = Message::decode(&mut slice).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(slice.len(), 0, "decoder must consume the exact length");
    }

    fn msg(body: MessageBody) -> Message {
        Message {
            seq: 7,
            player: 3,
            body,
        }
    }

    #[test]
    fn roundtrip_every_message_type() {
        roundtrip(msg(MessageBody::Walk {
            direction: Direction::Up,
        }));
        roundtrip(msg(MessageBody::Shoot { weapon: 1 }));
        roundtrip(msg(MessageBody::ConnectRequest {
            nick: "nick1".to_string(),
        }));
        roundtrip(msg(MessageBody::ConnectReply {
            ok: 1,
            id: 0,
            map_name: "arena".to_string(),
        }));
        roundtrip(msg(MessageBody::ConnectNotify {
            nick: "somebody".to_string(),
        }));
        roundtrip(msg(MessageBody::DisconnectNotify {
            nick: "somebody".to_string(),
        }));
        roundtrip(msg(MessageBody::ClientQuit));
        roundtrip(msg(MessageBody::ServerShutdown));
        roundtrip(msg(MessageBody::PlayerPosition { x: 10, y: 20 }));
        roundtrip(msg(MessageBody::EnemyPosition { x: 1, y: 1 }));
        roundtrip(msg(MessageBody::PlayerHit { hp: 70, armor: 20 }));
        roundtrip(msg(MessageBody::MapExplode { x: 5, y: 9 }));
        roundtrip(msg(MessageBody::OnBonus { kind: 0, index: 1 }));
    }

    #[test]
    fn roundtrip_boundary_field_values() {
        roundtrip(Message {
            seq: u32::MAX,
            player: u8::MAX,
            body: MessageBody::PlayerPosition {
                x: u16::MAX,
                y: u16::MAX,
            },
        });
        roundtrip(Message {
            seq: 0,
            player: 0,
            body: MessageBody::PlayerHit { hp: 0, armor: 0 },
        });
        // A nickname that exactly fills the field has no NUL terminator.
        roundtrip(msg(MessageBody::ConnectRequest {
            nick: "exactly16bytes!!".to_string(),
        }));
    }

    #[test]
    fn nickname_overflow_is_truncated() {
        let message = msg(MessageBody::ConnectRequest {
            nick: "this nickname is far too long to fit".to_string(),
        });
        let mut buf = Vec::new();
        message.encode(&mut buf);
        assert_eq!(buf.len(), HEADER_LEN + NICK_MAX_LEN);

        let decoded = Message::decode(&mut buf.as_slice()).unwrap();
        match decoded.body {
            MessageBody::ConnectRequest { nick } => {
                assert_eq!(nick, "this nickname is");
                assert_eq!(nick.len(), NICK_MAX_LEN);
            }
            other => panic!("wrong body: {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_is_a_decode_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&42u32.to_be_bytes());
        buf.push(0); // player
        buf.push(200); // tag outside the known range
        buf.extend_from_slice(&[0u8; 16]);

        assert_eq!(
            Message::decode(&mut buf.as_slice()),
            Err(CodecError::UnknownTag(200))
        );
    }

    #[test]
    fn truncated_header_is_a_decode_error() {
        let buf = [0u8; 3];
        assert_eq!(
            Message::decode(&mut &buf[..]),
            Err(CodecError::Truncated { needed: 6, got: 3 })
        );
    }

    #[test]
    fn truncated_payload_is_a_decode_error() {
        let message = msg(MessageBody::ConnectRequest {
            nick: "nick1".to_string(),
        });
        let mut buf = Vec::new();
        message.encode(&mut buf);
        buf.truncate(HEADER_LEN + 4);

        assert_eq!(
            Message::decode(&mut buf.as_slice()),
            Err(CodecError::Truncated { needed: 16, got: 4 })
        );
    }

    #[test]
    fn invalid_direction_is_a_decode_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.push(0);
        buf.push(0); // Walk tag
        buf.push(9); // not a direction

        assert_eq!(
            Message::decode(&mut buf.as_slice()),
            Err(CodecError::BadDirection(9))
        );
    }

    #[test]
    fn length_table_matches_encoder() {
        let bodies = [
            MessageBody::Walk {
                direction: Direction::Left,
            },
            MessageBody::Shoot { weapon: 0 },
            MessageBody::ConnectRequest {
                nick: String::new(),
            },
            MessageBody::ConnectReply {
                ok: 0,
                id: 0,
                map_name: String::new(),
            },
            MessageBody::ConnectNotify {
                nick: String::new(),
            },
            MessageBody::DisconnectNotify {
                nick: String::new(),
            },
            MessageBody::ClientQuit,
            MessageBody::ServerShutdown,
            MessageBody::PlayerPosition { x: 0, y: 0 },
            MessageBody::EnemyPosition { x: 0, y: 0 },
            MessageBody::PlayerHit { hp: 0, armor: 0 },
            MessageBody::MapExplode { x: 0, y: 0 },
            MessageBody::OnBonus { kind: 0, index: 0 },
        ];

        for body in bodies {
            let tag = body.tag();
            let message = Message {
                seq: 1,
                player: 1,
                body,
            };
            let mut buf = Vec::new();
            message.encode(&mut buf);
            assert_eq!(
                buf.len(),
                HEADER_LEN + body_len(tag).unwrap(),
                "length table disagrees with encoder for tag {}",
                tag
            );
        }
    }
}
