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

//! Where readings go once the loop has them.
//!
//! Radio tasks never touch the loop's state. They report what happened on their link as
//! [`LinkEvent`]s, which the loop drains at the start of every cycle and hands to its sink.

pub mod message_bus;
pub mod notify;

use crate::hmi::status_screen::LinkKind;
use crate::reading::Reading;
use core::fmt::Write;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use log::{log_enabled, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessageKind {
    Event,
    Ack,
    Error,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    NetworkUp,
    NetworkDown,
    /// The bus session (Socket.IO namespace) is open
    SessionOpened,
    SessionClosed,
    ServerMessage(ServerMessageKind),
    SubscriberConnected,
    SubscriberDisconnected,
}

const LINK_EVENT_DEPTH: usize = 8;

pub type LinkEventChannel = Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>;
pub type LinkEventReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>;
pub type LinkEventSender<'a> = Sender<'a, CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub network: bool,
    pub session: bool,
}

impl ConnectionState {
    pub fn apply(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::NetworkUp => self.network = true,
            LinkEvent::NetworkDown => {
                self.network = false;
                self.session = false;
            }
            LinkEvent::SessionOpened | LinkEvent::SubscriberConnected => self.session = true,
            LinkEvent::SessionClosed | LinkEvent::SubscriberDisconnected => self.session = false,
            LinkEvent::ServerMessage(_) => {}
        }
    }
}

pub trait TransportSink {
    async fn handle_link_event(&mut self, event: LinkEvent);

    fn is_connected(&self) -> bool;

    /// Sampling is skipped altogether while nobody is listening.
    fn requires_subscriber(&self) -> bool {
        false
    }

    /// Re-zero before every reading.
    fn retare_each_interval(&self) -> bool {
        false
    }

    fn link_kind(&self) -> Option<LinkKind>;

    /// Sends the reading if connected. Failures are logged, never retried.
    async fn publish(&mut self, reading: Reading);

    /// Last words before deep sleep.
    async fn end_session(&mut self);
}

/// Sink for variants that only show the weight locally.
#[derive(Debug, Default)]
pub struct NullSink;

impl TransportSink for NullSink {
    async fn handle_link_event(&mut self, _event: LinkEvent) {}

    fn is_connected(&self) -> bool {
        true
    }

    fn link_kind(&self) -> Option<LinkKind> {
        None
    }

    async fn publish(&mut self, reading: Reading) {
        trace!("Discarding {:?}", reading);
    }

    async fn end_session(&mut self) {}
}

/// Logs `data` as rows of 16 hex bytes at trace level.
pub fn trace_hexdump(label: &str, data: &[u8]) {
    if !log_enabled!(log::Level::Trace) {
        return;
    }
    trace!("{} ({} bytes)", label, data.len());
    for (row, chunk) in data.chunks(16).enumerate() {
        trace!("{:04x}: {}", row * 16, hex_row(chunk).as_str());
    }
}

fn hex_row(chunk: &[u8]) -> heapless::String<48> {
    let mut line = heapless::String::new();
    for byte in chunk {
        let _ = write!(line, "{:02X} ", byte);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_follows_events() {
        let mut state = ConnectionState::default();
        state.apply(&LinkEvent::NetworkUp);
        state.apply(&LinkEvent::SessionOpened);
        assert_eq!(
            state,
            ConnectionState {
                network: true,
                session: true
            }
        );

        state.apply(&LinkEvent::ServerMessage(ServerMessageKind::Error));
        assert!(state.session);

        state.apply(&LinkEvent::NetworkDown);
        assert_eq!(state, ConnectionState::default());
    }

    #[test]
    fn hex_rows_are_space_separated() {
        assert_eq!(hex_row(&[0x42, 0x00, 0xff]).as_str(), "42 00 FF ");
        assert_eq!(hex_row(&[0xAB; 16]).len(), 48);
    }

    #[test]
    fn null_sink_is_always_ready() {
        let sink = NullSink;
        assert!(sink.is_connected());
        assert!(!sink.requires_subscriber());
        assert_eq!(sink.link_kind(), None);
    }
}
