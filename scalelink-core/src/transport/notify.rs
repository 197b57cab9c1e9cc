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

use crate::config::NotifyConfig;
use crate::hmi::status_screen::LinkKind;
use crate::reading::Reading;
use crate::transport::{LinkEvent, TransportSink};
use log::{info, trace, warn};
use scalelink_messages::notify::weight_payload;

/// Pushes a value to the subscribed central.
pub trait Notifier {
    type Error: core::fmt::Debug;

    async fn notify(&mut self, payload: &str) -> Result<(), Self::Error>;
}

pub struct NotifySink<N> {
    notifier: N,
    subscribed: bool,
    retare_each_interval: bool,
}

impl<N: Notifier> NotifySink<N> {
    pub fn new(notifier: N, config: &NotifyConfig) -> Self {
        if config.retare_each_interval {
            warn!("Scale re-tares before every notification, a resting load always reads zero");
        }
        Self {
            notifier,
            subscribed: false,
            retare_each_interval: config.retare_each_interval,
        }
    }
}

impl<N: Notifier> TransportSink for NotifySink<N> {
    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::SubscriberConnected => {
                info!("BLE central connected");
                self.subscribed = true;
            }
            LinkEvent::SubscriberDisconnected => {
                info!("BLE central disconnected");
                self.subscribed = false;
            }
            _ => {}
        }
    }

    fn is_connected(&self) -> bool {
        self.subscribed
    }

    fn requires_subscriber(&self) -> bool {
        true
    }

    fn retare_each_interval(&self) -> bool {
        self.retare_each_interval
    }

    fn link_kind(&self) -> Option<LinkKind> {
        Some(LinkKind::Ble)
    }

    async fn publish(&mut self, reading: Reading) {
        if !self.subscribed {
            return;
        }
        let payload = weight_payload(reading.wire_value());
        trace!("notify '{}'", payload.as_str());
        if let Err(e) = self.notifier.notify(&payload).await {
            warn!("BLE notify failed: {:?}", e);
        }
    }

    async fn end_session(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::string::{String, ToString};
    use std::vec::Vec;

    #[derive(Default)]
    struct RecordingNotifier {
        payloads: Vec<String>,
    }

    impl Notifier for &mut RecordingNotifier {
        type Error = core::convert::Infallible;

        async fn notify(&mut self, payload: &str) -> Result<(), Self::Error> {
            self.payloads.push(payload.to_string());
            Ok(())
        }
    }

    #[test]
    fn notifies_fixed_width_text_only_while_subscribed() {
        let mut notifier = RecordingNotifier::default();
        let config = NotifyConfig::default();
        let mut sink = NotifySink::new(&mut notifier, &config);
        block_on(async {
            sink.publish(Reading::Grams(1.0)).await;
            sink.handle_link_event(LinkEvent::SubscriberConnected).await;
            sink.publish(Reading::Grams(12.5)).await;
            sink.publish(Reading::Calibrating).await;
            sink.handle_link_event(LinkEvent::SubscriberDisconnected).await;
            sink.publish(Reading::Grams(3.0)).await;
        });
        assert_eq!(notifier.payloads, ["   12.50", "-9999.00"]);
    }

    #[test]
    fn reports_subscriber_requirement_and_retare_flag() {
        let mut notifier = RecordingNotifier::default();
        let sink = NotifySink::new(
            &mut notifier,
            &NotifyConfig {
                retare_each_interval: true,
                ..NotifyConfig::default()
            },
        );
        assert!(sink.requires_subscriber());
        assert!(sink.retare_each_interval());
        assert!(!sink.is_connected());
    }
}
