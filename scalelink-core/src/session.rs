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

//! The sampling loop.
//!
//! [`ScaleManager`] owns all of the scale's mutable state. It wakes on the sample ticker or on a
//! tare button press, drains whatever the radio tasks reported since the last cycle, takes one
//! reading and passes it through the zero band, the idle policy and the transport sink.

use crate::hmi::messaging::{HmiChannelSubscriber, HmiMessage, StatusSender};
use crate::hmi::status_screen::StatusSnapshot;
use crate::idle::{IdleDecision, IdleMonitor, RetainedCounter};
use crate::reading::Reading;
use crate::transport::{ConnectionState, LinkEventReceiver, TransportSink};
use crate::weight::WeighingSystem;
use embassy_futures::select::{Either, select};
use embassy_sync::pubsub::WaitResult;
use embassy_time::{Duration, Instant, Ticker};
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Nobody is listening, nothing was sampled
    Skipped,
    /// The sensor did not answer, nothing was sent
    SensorNotReady,
    Published(Reading),
    /// The reading was published and the scale should now deep sleep
    Suspend(Reading),
}

pub struct ScaleManager<'a, WS, S, RC> {
    weight_scale: WS,
    sink: S,
    idle_monitor: Option<IdleMonitor<RC>>,
    link_events: LinkEventReceiver<'a>,
    hmi_subscriber: HmiChannelSubscriber<'a>,
    status_sender: Option<StatusSender<'a>>,
    sample_interval: Duration,
    uses_wifi: bool,
    connection: ConnectionState,
    last_reading: Option<Reading>,
}

impl<'a, WS, S, RC> ScaleManager<'a, WS, S, RC>
where
    WS: WeighingSystem,
    S: TransportSink,
    RC: RetainedCounter,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        weight_scale: WS,
        sink: S,
        idle_monitor: Option<IdleMonitor<RC>>,
        link_events: LinkEventReceiver<'a>,
        hmi_subscriber: HmiChannelSubscriber<'a>,
        status_sender: Option<StatusSender<'a>>,
        sample_interval: Duration,
        uses_wifi: bool,
    ) -> Self {
        Self {
            weight_scale,
            sink,
            idle_monitor,
            link_events,
            hmi_subscriber,
            status_sender,
            sample_interval,
            uses_wifi,
            connection: ConnectionState::default(),
            last_reading: None,
        }
    }

    /// Samples until the idle policy asks for deep sleep, then powers the sensor down and returns.
    pub async fn run(&mut self) {
        let mut sample_ticker = Ticker::every(self.sample_interval);
        self.publish_status();
        loop {
            let press_or_tick = select(self.hmi_subscriber.next_message(), sample_ticker.next()).await;
            match press_or_tick {
                Either::First(WaitResult::Message(HmiMessage::TarePressed)) => {
                    self.calibrate().await;
                }
                Either::First(WaitResult::Lagged(missed)) => {
                    warn!("Missed {} button messages", missed);
                }
                Either::Second(_) => {
                    if let CycleOutcome::Suspend(_) = self.cycle(Instant::now()).await {
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.weight_scale.power_down().await {
            warn!("Sensor power down failed: {:?}", e);
        }
    }

    /// Tare button handling: the sentinel goes out first, then the scale is re-zeroed.
    ///
    /// A press is activity, so the idle count starts again from zero.
    pub async fn calibrate(&mut self) {
        info!("Calibrating");
        self.drain_link_events().await;
        self.last_reading = Some(Reading::Calibrating);
        if let Some(monitor) = self.idle_monitor.as_mut() {
            monitor.observe(&Reading::Calibrating, Instant::now());
        }
        self.sink.publish(Reading::Calibrating).await;
        self.publish_status();
        self.tare().await;
    }

    /// One sampling cycle at `now`.
    pub async fn cycle(&mut self, now: Instant) -> CycleOutcome {
        self.drain_link_events().await;

        if self.sink.requires_subscriber() && !self.sink.is_connected() {
            self.publish_status();
            return CycleOutcome::Skipped;
        }

        if self.sink.retare_each_interval() {
            self.tare().await;
        }

        let reading = match self.weight_scale.get_reading().await {
            Ok(grams) => Reading::Grams(grams).filtered(),
            Err(e) => {
                warn!("HX711 not found.");
                debug!("Sensor error: {:?}", e);
                self.publish_status();
                return CycleOutcome::SensorNotReady;
            }
        };
        self.last_reading = Some(reading);

        let decision = match self.idle_monitor.as_mut() {
            Some(monitor) => monitor.observe(&reading, now),
            None => IdleDecision::Active,
        };

        self.sink.publish(reading).await;
        self.publish_status();

        if decision == IdleDecision::Suspend {
            self.sink.end_session().await;
            return CycleOutcome::Suspend(reading);
        }
        CycleOutcome::Published(reading)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            wifi: self.uses_wifi.then_some(self.connection.network),
            link: self
                .sink
                .link_kind()
                .map(|kind| (kind, self.sink.is_connected())),
            reading: self.last_reading,
        }
    }

    pub fn idle_count(&self) -> Option<u32> {
        self.idle_monitor.as_ref().map(|monitor| monitor.count())
    }

    async fn drain_link_events(&mut self) {
        while let Ok(event) = self.link_events.try_receive() {
            debug!("Link event {:?}", event);
            self.connection.apply(&event);
            self.sink.handle_link_event(event).await;
        }
    }

    async fn tare(&mut self) {
        match self.weight_scale.tare().await {
            Ok(()) => info!("Tare complete"),
            Err(e) => warn!("Tare failed, keeping previous zero: {:?}", e),
        }
    }

    fn publish_status(&self) {
        if let Some(sender) = &self.status_sender {
            sender.send(self.snapshot());
        }
    }
}
