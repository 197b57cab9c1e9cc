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

use crate::CALIBRATING_SENTINEL;
use crate::bus::{
    BusEvent, DEFAULT_EVENT_NAME, DEFAULT_PAYLOAD_FIELD, JOIN_EVENT_NAME, LEAVE_EVENT_NAME,
    PayloadValue,
};

/// A builder for the events a scale publishes on the bus.
#[derive(Clone, Copy)]
pub struct BusMessagesBuilder<'a> {
    room: Option<&'a str>,
}

impl<'a> BusMessagesBuilder<'a> {
    /// Creates a new `BusMessagesBuilder` with no room.
    pub fn new() -> Self {
        Self { room: None }
    }

    /// Scopes every event built from here on to `room`.
    pub fn room(mut self, room: Option<&'a str>) -> Self {
        self.room = room;
        self
    }

    /// Builds the room join event, `None` if no room has been set.
    pub fn join(self) -> Option<BusEvent<'a>> {
        self.room.map(|room| BusEvent {
            name: JOIN_EVENT_NAME,
            payload: None,
            room: Some(room),
        })
    }

    /// Builds the room leave event, `None` if no room has been set.
    pub fn leave(self) -> Option<BusEvent<'a>> {
        self.room.map(|room| BusEvent {
            name: LEAVE_EVENT_NAME,
            payload: None,
            room: Some(room),
        })
    }

    /// Begins building a weight event.
    pub fn weight(self) -> WeightEventBuilder<'a> {
        WeightEventBuilder::new(self.room)
    }
}

impl Default for BusMessagesBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// A builder for the weight event.
pub struct WeightEventBuilder<'a> {
    room: Option<&'a str>,
    event_name: &'a str,
    field: &'a str,
    value: Option<PayloadValue<'a>>,
}

impl<'a> WeightEventBuilder<'a> {
    fn new(room: Option<&'a str>) -> Self {
        Self {
            room,
            event_name: DEFAULT_EVENT_NAME,
            field: DEFAULT_PAYLOAD_FIELD,
            value: None,
        }
    }

    pub fn event_name(mut self, event_name: &'a str) -> Self {
        self.event_name = event_name;
        self
    }

    pub fn field(mut self, field: &'a str) -> Self {
        self.field = field;
        self
    }

    pub fn grams(mut self, grams: f32) -> Self {
        self.value = Some(PayloadValue::Number(grams));
        self
    }

    /// Marks the event as the "calibrating now" sentinel.
    pub fn calibrating(mut self) -> Self {
        self.value = Some(PayloadValue::Number(CALIBRATING_SENTINEL));
        self
    }

    pub fn text(mut self, text: &'a str) -> Self {
        self.value = Some(PayloadValue::Text(text));
        self
    }

    /// Builds the weight event.
    ///
    /// # Panics
    ///
    /// Panics if no value has been set.
    pub fn build(self) -> BusEvent<'a> {
        BusEvent {
            name: self.event_name,
            payload: Some((self.field, self.value.expect("value must be set"))),
            room: self.room,
        }
    }
}
