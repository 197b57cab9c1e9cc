// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Only the text transport over WebSocket is handled. An Engine.IO packet is a single type digit
//! followed by its data, a Socket.IO packet rides inside an Engine.IO `message` (`4`) packet and
//! adds its own type digit, an optional namespace, an optional ack id and the JSON data.

use alloc::format;
use alloc::string::String;
use serde::Deserialize;

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Empty,
    UnknownPacketType(u8),
    MalformedSocketPacket,
    MalformedHandshake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketType {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketType {
    fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'0' => Some(Self::Connect),
            b'1' => Some(Self::Disconnect),
            b'2' => Some(Self::Event),
            b'3' => Some(Self::Ack),
            b'4' => Some(Self::ConnectError),
            b'5' => Some(Self::BinaryEvent),
            b'6' => Some(Self::BinaryAck),
            _ => None,
        }
    }

    fn is_binary(&self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketPacket<'a> {
    pub kind: SocketPacketType,
    pub namespace: &'a str,
    pub ack_id: Option<u32>,
    pub data: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePacket<'a> {
    Open(&'a str),
    Close,
    Ping(&'a str),
    Pong(&'a str),
    Message(SocketPacket<'a>),
    Upgrade,
    Noop,
}

/// Session parameters the server sends in its `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake<'a> {
    #[serde(borrow)]
    pub sid: &'a str,
    pub ping_interval: u32,
    pub ping_timeout: u32,
    #[serde(default)]
    pub max_payload: u32,
}

pub fn parse_open(data: &str) -> Result<OpenHandshake<'_>, DecodeError> {
    serde_json::from_str(data).map_err(|_| DecodeError::MalformedHandshake)
}

pub fn decode(text: &str) -> Result<EnginePacket<'_>, DecodeError> {
    let (&type_digit, _) = text.as_bytes().split_first().ok_or(DecodeError::Empty)?;
    let data = text.get(1..).ok_or(DecodeError::UnknownPacketType(type_digit))?;
    match type_digit {
        b'0' => Ok(EnginePacket::Open(data)),
        b'1' => Ok(EnginePacket::Close),
        b'2' => Ok(EnginePacket::Ping(data)),
        b'3' => Ok(EnginePacket::Pong(data)),
        b'4' => decode_socket_packet(data).map(EnginePacket::Message),
        b'5' => Ok(EnginePacket::Upgrade),
        b'6' => Ok(EnginePacket::Noop),
        other => Err(DecodeError::UnknownPacketType(other)),
    }
}

fn decode_socket_packet(text: &str) -> Result<SocketPacket<'_>, DecodeError> {
    let (&type_digit, _) = text
        .as_bytes()
        .split_first()
        .ok_or(DecodeError::MalformedSocketPacket)?;
    let kind = SocketPacketType::from_digit(type_digit).ok_or(DecodeError::MalformedSocketPacket)?;
    let mut rest = text.get(1..).ok_or(DecodeError::MalformedSocketPacket)?;

    if kind.is_binary() {
        // attachment count, e.g. "51-[...]"
        let dash = rest.find('-').ok_or(DecodeError::MalformedSocketPacket)?;
        if dash == 0 || !rest[..dash].bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecodeError::MalformedSocketPacket);
        }
        rest = &rest[dash + 1..];
    }

    let mut namespace = DEFAULT_NAMESPACE;
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(comma) => {
                namespace = &rest[..comma];
                rest = &rest[comma + 1..];
            }
            None => {
                namespace = rest;
                rest = "";
            }
        }
    }

    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    let ack_id = if digits > 0 {
        let id = rest[..digits]
            .parse::<u32>()
            .map_err(|_| DecodeError::MalformedSocketPacket)?;
        rest = &rest[digits..];
        Some(id)
    } else {
        None
    };

    Ok(SocketPacket {
        kind,
        namespace,
        ack_id,
        data: rest,
    })
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace.is_empty() || namespace == DEFAULT_NAMESPACE {
        String::new()
    } else {
        format!("{},", namespace)
    }
}

/// Socket.IO `CONNECT` for the namespace, sent once Engine.IO is open.
pub fn encode_connect(namespace: &str) -> String {
    format!("40{}", namespace_prefix(namespace))
}

pub fn encode_disconnect(namespace: &str) -> String {
    format!("41{}", namespace_prefix(namespace))
}

pub fn encode_event(namespace: &str, json: &str) -> String {
    format!("42{}{}", namespace_prefix(namespace), json)
}

/// Reply to an Engine.IO ping, echoing any probe data.
pub fn encode_pong(data: &str) -> String {
    format!("3{}", data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_open_and_reads_the_handshake() {
        let text = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        let EnginePacket::Open(data) = decode(text).unwrap() else {
            panic!("expected open packet");
        };
        let handshake = parse_open(data).unwrap();
        assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(handshake.ping_interval, 25000);
        assert_eq!(handshake.ping_timeout, 20000);
    }

    #[test]
    fn decodes_ping_and_builds_pong() {
        assert_eq!(decode("2").unwrap(), EnginePacket::Ping(""));
        assert_eq!(decode("2probe").unwrap(), EnginePacket::Ping("probe"));
        assert_eq!(encode_pong("probe"), "3probe");
    }

    #[test]
    fn decodes_connect_ack_on_default_namespace() {
        let packet = decode(r#"40{"sid":"abc"}"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket {
                kind: SocketPacketType::Connect,
                namespace: "/",
                ack_id: None,
                data: r#"{"sid":"abc"}"#,
            })
        );
    }

    #[test]
    fn decodes_event_with_namespace_and_ack_id() {
        let packet = decode(r#"42/admin,13["hello",1]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket {
                kind: SocketPacketType::Event,
                namespace: "/admin",
                ack_id: Some(13),
                data: r#"["hello",1]"#,
            })
        );
    }

    #[test]
    fn decodes_binary_event_skipping_attachment_count() {
        let EnginePacket::Message(packet) = decode(r#"451-["img",{"_placeholder":true,"num":0}]"#).unwrap() else {
            panic!("expected message packet");
        };
        assert_eq!(packet.kind, SocketPacketType::BinaryEvent);
        assert!(packet.data.starts_with(r#"["img""#));
    }

    #[test]
    fn rejects_unknown_and_empty_packets() {
        assert_eq!(decode(""), Err(DecodeError::Empty));
        assert_eq!(decode("9"), Err(DecodeError::UnknownPacketType(b'9')));
        assert_eq!(decode("4"), Err(DecodeError::MalformedSocketPacket));
        assert_eq!(decode("47"), Err(DecodeError::MalformedSocketPacket));
    }

    #[test]
    fn rejects_multibyte_leading_characters() {
        assert_eq!(decode("é"), Err(DecodeError::UnknownPacketType(0xc3)));
        assert_eq!(decode("4é"), Err(DecodeError::MalformedSocketPacket));
    }

    #[test]
    fn encodes_namespace_prefixes() {
        assert_eq!(encode_connect("/"), "40");
        assert_eq!(encode_connect("/scales"), "40/scales,");
        assert_eq!(encode_disconnect("/"), "41");
        assert_eq!(encode_event("/", r#"["a",{}]"#), r#"42["a",{}]"#);
        assert_eq!(encode_event("/scales", "[]"), "42/scales,[]");
    }
}
