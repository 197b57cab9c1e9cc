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

//! Picks the build variant and fills in what only the build environment knows.
//!
//! Credentials and the bus endpoint come from `SCALELINK_*` environment variables at compile
//! time so they never have to be committed.

use log::warn;
use scalelink_core::config::{AccessPoint, NetworkConfig, ScaleConfig, TransportKind, Variant};

#[cfg(not(any(
    feature = "bus-display",
    feature = "bus",
    feature = "bus-sleep",
    feature = "ble-notify",
    feature = "ble-notify-sleep",
    feature = "display-only"
)))]
compile_error!("select exactly one build variant feature");

#[cfg(feature = "bus-display")]
pub const VARIANT: Variant = Variant::BusDisplay;
#[cfg(feature = "bus")]
pub const VARIANT: Variant = Variant::Bus;
#[cfg(feature = "bus-sleep")]
pub const VARIANT: Variant = Variant::BusSleep;
#[cfg(feature = "ble-notify")]
pub const VARIANT: Variant = Variant::BleNotify;
#[cfg(feature = "ble-notify-sleep")]
pub const VARIANT: Variant = Variant::BleNotifySleep;
#[cfg(feature = "display-only")]
pub const VARIANT: Variant = Variant::DisplayOnly;

const BOOT_WAIT_SECONDS: u8 = 3;

const fn env_or_empty(value: Option<&'static str>) -> &'static str {
    match value {
        Some(value) => value,
        None => "",
    }
}

/// Tried in this order, entries without an SSID are skipped.
const ACCESS_POINTS: &[AccessPoint] = &[
    AccessPoint {
        ssid: env_or_empty(option_env!("SCALELINK_WIFI_SSID")),
        password: env_or_empty(option_env!("SCALELINK_WIFI_PASSWORD")),
    },
    AccessPoint {
        ssid: env_or_empty(option_env!("SCALELINK_WIFI_SSID_2")),
        password: env_or_empty(option_env!("SCALELINK_WIFI_PASSWORD_2")),
    },
];

pub const NETWORK: NetworkConfig = NetworkConfig {
    access_points: ACCESS_POINTS,
    boot_wait_seconds: BOOT_WAIT_SECONDS,
};

pub fn scale_config() -> ScaleConfig {
    let mut config = ScaleConfig::variant(VARIANT);
    if let TransportKind::MessageBus(bus) = &mut config.transport {
        if let Some(host) = option_env!("SCALELINK_BUS_HOST") {
            bus.host = host;
        }
        if let Some(port) = option_env!("SCALELINK_BUS_PORT") {
            match port.parse() {
                Ok(port) => bus.port = port,
                Err(_) => warn!("Ignoring SCALELINK_BUS_PORT={}, keeping {}", port, bus.port),
            }
        }
        bus.room = option_env!("SCALELINK_ROOM").filter(|room| !room.is_empty());
    }
    config
}
