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

//! BLE peripheral exposing the weight as a notify characteristic.
//!
//! One central at a time. While it is connected every value the sampling loop queues is pushed
//! to it, the connection itself is what the loop treats as a subscriber.

use bt_hci::controller::ExternalController;
use embassy_futures::join::join;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Timer;
use esp_radio::ble::controller::BleConnector;
use log::{error, info, warn};
use scalelink_core::transport::notify::Notifier;
use scalelink_core::transport::{LinkEvent, LinkEventSender};
use scalelink_messages::notify::PAYLOAD_WIDTH;
use trouble_host::prelude::*;

const CONNECTIONS_MAX: usize = 1;
const L2CAP_CHANNELS_MAX: usize = 2;
const NOTIFY_DEPTH: usize = 2;
const HCI_SLOTS: usize = 20;

pub type WeightValue = [u8; PAYLOAD_WIDTH];
pub type NotifyChannel = Channel<CriticalSectionRawMutex, WeightValue, NOTIFY_DEPTH>;

#[gatt_server]
struct Server {
    scale: ScaleService,
}

#[gatt_service(uuid = "4fafc201-1fb5-459e-8fcc-c5c9c331914b")]
struct ScaleService {
    /// Weight in grams as right aligned ASCII, e.g. `"   12.50"`
    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26a8", read, notify)]
    weight: [u8; PAYLOAD_WIDTH],
}

#[derive(Debug)]
pub enum NotifyError {
    WrongLength(usize),
    QueueFull,
}

/// [`Notifier`] feeding the peripheral task.
pub struct ChannelNotifier {
    values: &'static NotifyChannel,
}

impl ChannelNotifier {
    pub fn new(values: &'static NotifyChannel) -> Self {
        Self { values }
    }
}

impl Notifier for ChannelNotifier {
    type Error = NotifyError;

    async fn notify(&mut self, payload: &str) -> Result<(), NotifyError> {
        let value: WeightValue = payload
            .as_bytes()
            .try_into()
            .map_err(|_| NotifyError::WrongLength(payload.len()))?;
        self.values.try_send(value).map_err(|_| NotifyError::QueueFull)
    }
}

#[embassy_executor::task]
pub async fn peripheral_task(
    connector: BleConnector<'static>,
    device_name: &'static str,
    link_events: LinkEventSender<'static>,
    values: &'static NotifyChannel,
) {
    let controller: ExternalController<_, HCI_SLOTS> = ExternalController::new(connector);
    let address = Address::random([0x5c, 0xa1, 0xe1, 0x1b, 0x0a, 0xc3]);
    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();
    let stack = trouble_host::new(controller, &mut resources).set_random_address(address);
    let Host {
        mut peripheral,
        runner,
        ..
    } = stack.build();

    let server = match Server::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: device_name,
        appearance: &appearance::weight_scale::GENERIC_WEIGHT_SCALE,
    })) {
        Ok(server) => server,
        Err(e) => {
            error!("[BLE] GATT server setup failed: {}", e);
            return;
        }
    };

    info!("[BLE] advertising as {}", device_name);
    join(host_task(runner), async {
        loop {
            match advertise(device_name, &mut peripheral, &server).await {
                Ok(conn) => {
                    values.clear();
                    link_events.send(LinkEvent::SubscriberConnected).await;
                    select(gatt_events(&conn), push_values(&server, &conn, values)).await;
                    link_events.send(LinkEvent::SubscriberDisconnected).await;
                }
                Err(e) => {
                    warn!("[BLE] advertising failed: {:?}", e);
                    Timer::after_secs(1).await;
                }
            }
        }
    })
    .await;
}

async fn host_task<C: Controller, P: PacketPool>(mut runner: Runner<'_, C, P>) {
    loop {
        if let Err(e) = runner.run().await {
            error!("[BLE] host stopped: {:?}", e);
            Timer::after_secs(1).await;
        }
    }
}

async fn advertise<'values, 'server, C: Controller>(
    name: &'values str,
    peripheral: &mut Peripheral<'values, C, DefaultPacketPool>,
    server: &'server Server<'values>,
) -> Result<GattConnection<'values, 'server, DefaultPacketPool>, BleHostError<C::Error>> {
    let mut advertiser_data = [0; 31];
    let len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::CompleteLocalName(name.as_bytes()),
        ],
        &mut advertiser_data[..],
    )?;
    let advertiser = peripheral
        .advertise(
            &Default::default(),
            Advertisement::ConnectableScannableUndirected {
                adv_data: &advertiser_data[..len],
                scan_data: &[],
            },
        )
        .await?;
    let conn = advertiser.accept().await?.with_attribute_server(server)?;
    Ok(conn)
}

/// Serves reads and subscriptions until the central goes away.
async fn gatt_events<P: PacketPool>(conn: &GattConnection<'_, '_, P>) {
    let reason = loop {
        match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => break reason,
            GattConnectionEvent::Gatt { event } => match event.accept() {
                Ok(reply) => reply.send().await,
                Err(e) => warn!("[BLE] cannot answer request: {:?}", e),
            },
            _ => {}
        }
    };
    info!("[BLE] central disconnected: {:?}", reason);
}

async fn push_values<P: PacketPool>(
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
    values: &NotifyChannel,
) {
    let weight = server.scale.weight;
    loop {
        let value = values.receive().await;
        if let Err(e) = weight.notify(conn, &value).await {
            warn!("[BLE] notify failed: {:?}", e);
            return;
        }
    }
}
