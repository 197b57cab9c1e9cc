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

//! Events published on the message bus.
//!
//! Every event is a JSON array whose first element is the event name and whose second element
//! is an object carrying the payload field and, when the device belongs to a room, the room
//! name: `["mensaje",{"Balanza":12.5,"room":"kitchen"}]`.

pub mod builder;

use crate::{EncodeError, engine_io};
use alloc::string::String;
use serde::ser::{Serialize, SerializeMap, SerializeTuple, Serializer};

pub const DEFAULT_EVENT_NAME: &str = "mensaje";
pub const DEFAULT_PAYLOAD_FIELD: &str = "Balanza";
pub const JOIN_EVENT_NAME: &str = "join";
pub const LEAVE_EVENT_NAME: &str = "leave";
pub const ROOM_FIELD: &str = "room";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadValue<'a> {
    Number(f32),
    Text(&'a str),
}

impl Serialize for PayloadValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PayloadValue::Number(n) => serializer.serialize_f32(*n),
            PayloadValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusEvent<'a> {
    pub name: &'a str,
    pub payload: Option<(&'a str, PayloadValue<'a>)>,
    pub room: Option<&'a str>,
}

struct EventBody<'e, 'a>(&'e BusEvent<'a>);

impl Serialize for EventBody<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.0.payload.is_some() as usize + self.0.room.is_some() as usize;
        let mut map = serializer.serialize_map(Some(entries))?;
        if let Some((field, value)) = &self.0.payload {
            map.serialize_entry(field, value)?;
        }
        if let Some(room) = self.0.room {
            map.serialize_entry(ROOM_FIELD, room)?;
        }
        map.end()
    }
}

impl Serialize for BusEvent<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut array = serializer.serialize_tuple(2)?;
        array.serialize_element(self.name)?;
        array.serialize_element(&EventBody(self))?;
        array.end()
    }
}

impl BusEvent<'_> {
    /// JSON array form of the event, as found after the Socket.IO packet prefix.
    pub fn to_json(&self) -> Result<String, EncodeError> {
        serde_json::to_string(self).map_err(|_| EncodeError::Serialization)
    }

    /// Complete Engine.IO text frame (`42...`) for the event on the given namespace.
    pub fn to_socket_io(&self, namespace: &str) -> Result<String, EncodeError> {
        let json = self.to_json()?;
        Ok(engine_io::encode_event(namespace, &json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_event_with_room() {
        let event = BusEvent {
            name: DEFAULT_EVENT_NAME,
            payload: Some((DEFAULT_PAYLOAD_FIELD, PayloadValue::Number(5.0))),
            room: Some("kitchen"),
        };
        assert_eq!(
            event.to_json().unwrap(),
            r#"["mensaje",{"Balanza":5.0,"room":"kitchen"}]"#
        );
    }

    #[test]
    fn weight_event_without_room_has_only_the_payload_field() {
        let event = BusEvent {
            name: DEFAULT_EVENT_NAME,
            payload: Some((DEFAULT_PAYLOAD_FIELD, PayloadValue::Number(12.5))),
            room: None,
        };
        assert_eq!(event.to_json().unwrap(), r#"["mensaje",{"Balanza":12.5}]"#);
    }

    #[test]
    fn text_payloads_are_quoted() {
        let event = BusEvent {
            name: "status",
            payload: Some(("state", PayloadValue::Text("calibrating"))),
            room: None,
        };
        assert_eq!(event.to_json().unwrap(), r#"["status",{"state":"calibrating"}]"#);
    }

    #[test]
    fn socket_io_frame_on_default_namespace() {
        let event = BusEvent {
            name: JOIN_EVENT_NAME,
            payload: None,
            room: Some("lab-2"),
        };
        assert_eq!(event.to_socket_io("/").unwrap(), r#"42["join",{"room":"lab-2"}]"#);
    }
}
