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

//! Station mode Wi-Fi with a list of access points tried in turn.

use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer, WithTimeout};
use esp_hal::rng::Rng;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice};
use log::{debug, info, warn};
use scalelink_core::config::AccessPoint;
use scalelink_core::transport::{LinkEvent, LinkEventSender};
use static_cell::StaticCell;

const ASSOCIATE_RETRY_DELAY: Duration = Duration::from_millis(100);
const DHCP_TIMEOUT: Duration = Duration::from_secs(20);
const LINK_POLL_INTERVAL: Duration = Duration::from_millis(500);

static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

pub fn network_stack(
    interfaces: esp_radio::wifi::Interfaces<'static>,
) -> (Stack<'static>, Runner<'static, WifiDevice<'static>>) {
    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::<4>::new()),
        seed,
    )
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Keeps the station associated and reports link changes to the sampling loop.
#[embassy_executor::task]
pub async fn connection_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    access_points: &'static [AccessPoint],
    link_events: LinkEventSender<'static>,
) {
    loop {
        if !associate(&mut controller, access_points).await {
            Timer::after(ASSOCIATE_RETRY_DELAY).await;
            continue;
        }

        if stack.wait_config_up().with_timeout(DHCP_TIMEOUT).await.is_err() {
            warn!("[WIFI] no DHCP lease, reconnecting");
            let _ = controller.disconnect_async().await;
            continue;
        }
        if let Some(config) = stack.config_v4() {
            info!("[WIFI] connected, IP address {}", config.address);
        }
        link_events.send(LinkEvent::NetworkUp).await;

        while stack.is_link_up() && matches!(controller.is_connected(), Ok(true)) {
            Timer::after(LINK_POLL_INTERVAL).await;
        }

        warn!("[WIFI] connection lost");
        link_events.send(LinkEvent::NetworkDown).await;
        let _ = controller.disconnect_async().await;
    }
}

/// One pass over the access points, true once one of them accepted us.
async fn associate(controller: &mut WifiController<'static>, access_points: &[AccessPoint]) -> bool {
    for access_point in access_points.iter().filter(|ap| !ap.ssid.is_empty()) {
        let client = ClientConfig::default()
            .with_ssid(access_point.ssid.into())
            .with_password(access_point.password.into());
        if let Err(e) = controller.set_config(&ModeConfig::Client(client)) {
            warn!("[WIFI] rejected config for {}: {:?}", access_point.ssid, e);
            continue;
        }

        if !controller.is_started().unwrap_or(false) {
            if let Err(e) = controller.start_async().await {
                warn!("[WIFI] start failed: {:?}", e);
                return false;
            }
        }

        match controller.connect_async().await {
            Ok(()) => {
                info!("[WIFI] associated with {}", access_point.ssid);
                return true;
            }
            Err(e) => {
                debug!("[WIFI] {} not reachable: {:?}", access_point.ssid, e);
                let _ = controller.disconnect_async().await;
                Timer::after(ASSOCIATE_RETRY_DELAY).await;
            }
        }
    }
    false
}
