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

use crate::config::{BusConfig, RoomName};
use crate::hmi::status_screen::LinkKind;
use crate::reading::Reading;
use crate::transport::{LinkEvent, TransportSink};
use log::{debug, info, trace, warn};
use scalelink_messages::bus::BusEvent;
use scalelink_messages::bus::builder::BusMessagesBuilder;
use scalelink_messages::engine_io;

/// Outbound half of the bus connection, one Engine.IO text packet per call.
pub trait FrameWriter {
    type Error: core::fmt::Debug;

    async fn write_text(&mut self, frame: &str) -> Result<(), Self::Error>;
}

fn messages(room: &Option<RoomName>) -> BusMessagesBuilder<'_> {
    BusMessagesBuilder::new().room(room.as_deref())
}

pub struct MessageBusSink<W> {
    writer: W,
    namespace: &'static str,
    event_name: &'static str,
    payload_field: &'static str,
    room: Option<RoomName>,
    connected: bool,
}

impl<W: FrameWriter> MessageBusSink<W> {
    pub fn new(writer: W, config: &BusConfig) -> Self {
        Self {
            writer,
            namespace: config.namespace,
            event_name: config.event_name,
            payload_field: config.payload_field,
            room: config.room.and_then(|room| RoomName::try_from(room).ok()),
            connected: false,
        }
    }

    async fn send_event(writer: &mut W, namespace: &str, event: &BusEvent<'_>) {
        match event.to_socket_io(namespace) {
            Ok(frame) => Self::send_frame(writer, &frame).await,
            Err(e) => warn!("Dropping {} event: {}", event.name, e),
        }
    }

    async fn send_frame(writer: &mut W, frame: &str) {
        trace!("-> {}", frame);
        if let Err(e) = writer.write_text(frame).await {
            warn!("Bus write failed: {:?}", e);
        }
    }
}

impl<W: FrameWriter> TransportSink for MessageBusSink<W> {
    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::SessionOpened => {
                info!("Socket.IO connected");
                self.connected = true;
                if let Some(join) = messages(&self.room).join() {
                    Self::send_event(&mut self.writer, self.namespace, &join).await;
                }
            }
            LinkEvent::SessionClosed | LinkEvent::NetworkDown => {
                if self.connected {
                    info!("Socket.IO disconnected");
                }
                self.connected = false;
            }
            LinkEvent::ServerMessage(kind) => debug!("Server sent {:?}", kind),
            _ => {}
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn link_kind(&self) -> Option<LinkKind> {
        Some(LinkKind::Bus)
    }

    async fn publish(&mut self, reading: Reading) {
        if !self.connected {
            trace!("Bus not connected, {:?} not sent", reading);
            return;
        }
        let weight = messages(&self.room)
            .weight()
            .event_name(self.event_name)
            .field(self.payload_field);
        let event = match reading {
            Reading::Grams(grams) => weight.grams(grams),
            Reading::Calibrating => weight.calibrating(),
        }
        .build();
        Self::send_event(&mut self.writer, self.namespace, &event).await;
    }

    async fn end_session(&mut self) {
        if !self.connected {
            return;
        }
        if let Some(leave) = messages(&self.room).leave() {
            Self::send_event(&mut self.writer, self.namespace, &leave).await;
        }
        let disconnect = engine_io::encode_disconnect(self.namespace);
        Self::send_frame(&mut self.writer, &disconnect).await;
        self.connected = false;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::ServerMessageKind;
    use embassy_futures::block_on;
    use std::string::{String, ToString};
    use std::vec::Vec;

    #[derive(Default)]
    pub(crate) struct RecordingWriter {
        pub frames: Vec<String>,
    }

    impl FrameWriter for &mut RecordingWriter {
        type Error = core::convert::Infallible;

        async fn write_text(&mut self, frame: &str) -> Result<(), Self::Error> {
            self.frames.push(frame.to_string());
            Ok(())
        }
    }

    fn bus_config(room: Option<&'static str>) -> BusConfig {
        BusConfig {
            room,
            ..BusConfig::default()
        }
    }

    #[test]
    fn disconnected_sink_writes_nothing() {
        let mut writer = RecordingWriter::default();
        let mut sink = MessageBusSink::new(&mut writer, &bus_config(Some("kitchen")));
        block_on(async {
            sink.publish(Reading::Grams(5.0)).await;
            sink.publish(Reading::Calibrating).await;
            sink.end_session().await;
        });
        assert!(writer.frames.is_empty());
    }

    #[test]
    fn joins_room_on_connect_then_one_frame_per_publish() {
        let mut writer = RecordingWriter::default();
        let mut sink = MessageBusSink::new(&mut writer, &bus_config(Some("kitchen")));
        block_on(async {
            sink.handle_link_event(LinkEvent::SessionOpened).await;
            sink.publish(Reading::Grams(5.0)).await;
            sink.publish(Reading::Grams(0.0)).await;
        });
        assert_eq!(
            writer.frames,
            [
                r#"42["join",{"room":"kitchen"}]"#,
                r#"42["mensaje",{"Balanza":5.0,"room":"kitchen"}]"#,
                r#"42["mensaje",{"Balanza":0.0,"room":"kitchen"}]"#,
            ]
        );
    }

    #[test]
    fn no_room_means_no_join_and_plain_payload() {
        let mut writer = RecordingWriter::default();
        let mut sink = MessageBusSink::new(&mut writer, &bus_config(None));
        block_on(async {
            sink.handle_link_event(LinkEvent::SessionOpened).await;
            sink.publish(Reading::Calibrating).await;
        });
        assert_eq!(writer.frames, [r#"42["mensaje",{"Balanza":-9999.0}]"#]);
    }

    #[test]
    fn end_session_leaves_then_disconnects_once() {
        let mut writer = RecordingWriter::default();
        let mut sink = MessageBusSink::new(&mut writer, &bus_config(Some("lab")));
        block_on(async {
            sink.handle_link_event(LinkEvent::SessionOpened).await;
            sink.end_session().await;
            sink.end_session().await;
        });
        assert_eq!(
            writer.frames,
            [r#"42["join",{"room":"lab"}]"#, r#"42["leave",{"room":"lab"}]"#, "41"]
        );
    }

    #[test]
    fn server_messages_do_not_change_connection() {
        let mut writer = RecordingWriter::default();
        let mut sink = MessageBusSink::new(&mut writer, &bus_config(None));
        block_on(async {
            sink.handle_link_event(LinkEvent::SessionOpened).await;
            sink.handle_link_event(LinkEvent::ServerMessage(ServerMessageKind::Error))
                .await;
            assert!(sink.is_connected());
            sink.handle_link_event(LinkEvent::NetworkDown).await;
            assert!(!sink.is_connected());
        });
    }
}
