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

//! Build-time configuration of one scale.
//!
//! Every supported board build is a [`Variant`], each of which maps onto a [`ScaleConfig`]
//! preset. The firmware picks the variant from its Cargo features and fills in credentials and
//! endpoints from the build environment.

use crate::hmi::debouncer::DEFAULT_DEBOUNCE;
use crate::idle::IdleThreshold;
use embassy_time::Duration;
use scalelink_messages::bus::{DEFAULT_EVENT_NAME, DEFAULT_PAYLOAD_FIELD};
use scalelink_messages::engine_io::DEFAULT_NAMESPACE;
use strum::{EnumIter, IntoStaticStr};

pub const ROOM_NAME_CAPACITY: usize = 32;

pub type RoomName = heapless::String<ROOM_NAME_CAPACITY>;

pub const DEFAULT_CALIBRATION_FACTOR: f32 = 396.717;
pub const DEFAULT_SAMPLES_PER_READING: u8 = 5;
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusConfig {
    pub host: &'static str,
    pub port: u16,
    pub path: &'static str,
    pub namespace: &'static str,
    pub event_name: &'static str,
    pub payload_field: &'static str,
    pub room: Option<&'static str>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.133",
            port: 8081,
            path: "/socket.io/?EIO=4&transport=websocket",
            namespace: DEFAULT_NAMESPACE,
            event_name: DEFAULT_EVENT_NAME,
            payload_field: DEFAULT_PAYLOAD_FIELD,
            room: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotifyConfig {
    pub device_name: &'static str,
    pub retare_each_interval: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            device_name: "Scalelink",
            retare_each_interval: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportKind {
    MessageBus(BusConfig),
    BleNotify(NotifyConfig),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPoint {
    pub ssid: &'static str,
    pub password: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Tried in order until one associates
    pub access_points: &'static [AccessPoint],
    pub boot_wait_seconds: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroSampleInterval,
    ZeroSamplesPerReading,
    InvalidCalibrationFactor,
    ZeroIdleThreshold,
    RoomNameTooLong,
    EmptyEndpoint,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::ZeroSampleInterval => write!(f, "sample interval must be non-zero"),
            ConfigError::ZeroSamplesPerReading => write!(f, "at least one sample per reading"),
            ConfigError::InvalidCalibrationFactor => {
                write!(f, "calibration factor must be finite and non-zero")
            }
            ConfigError::ZeroIdleThreshold => write!(f, "idle threshold must be non-zero"),
            ConfigError::RoomNameTooLong => {
                write!(f, "room name longer than {} bytes", ROOM_NAME_CAPACITY)
            }
            ConfigError::EmptyEndpoint => write!(f, "bus host and path must be set"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleConfig {
    pub transport: TransportKind,
    pub has_display: bool,
    /// `None` keeps the scale awake forever
    pub idle_threshold: Option<IdleThreshold>,
    pub sample_interval: Duration,
    /// Raw counts per gram
    pub calibration_factor: f32,
    pub samples_per_reading: u8,
    pub ready_timeout: Duration,
    pub debounce: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum Variant {
    BusDisplay,
    Bus,
    BusSleep,
    BleNotify,
    BleNotifySleep,
    DisplayOnly,
}

impl ScaleConfig {
    pub fn variant(variant: Variant) -> Self {
        let base = Self {
            transport: TransportKind::MessageBus(BusConfig::default()),
            has_display: false,
            idle_threshold: None,
            sample_interval: Duration::from_millis(1000),
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
            samples_per_reading: DEFAULT_SAMPLES_PER_READING,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
        };
        let ble = TransportKind::BleNotify(NotifyConfig {
            retare_each_interval: true,
            ..NotifyConfig::default()
        });

        match variant {
            Variant::BusDisplay => Self {
                has_display: true,
                ..base
            },
            Variant::Bus => base,
            Variant::BusSleep => Self {
                has_display: true,
                idle_threshold: Some(IdleThreshold::Cycles(10)),
                ..base
            },
            Variant::BleNotify => Self {
                transport: ble,
                sample_interval: Duration::from_millis(2000),
                ..base
            },
            Variant::BleNotifySleep => Self {
                transport: ble,
                idle_threshold: Some(IdleThreshold::Seconds(300)),
                sample_interval: Duration::from_millis(2000),
                ..base
            },
            Variant::DisplayOnly => Self {
                transport: TransportKind::None,
                has_display: true,
                idle_threshold: Some(IdleThreshold::Seconds(30)),
                ..base
            },
        }
    }

    pub fn uses_wifi(&self) -> bool {
        matches!(self.transport, TransportKind::MessageBus(_))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        if self.samples_per_reading == 0 {
            return Err(ConfigError::ZeroSamplesPerReading);
        }
        if !self.calibration_factor.is_finite() || self.calibration_factor == 0.0 {
            return Err(ConfigError::InvalidCalibrationFactor);
        }
        if self.idle_threshold.is_some_and(|threshold| threshold.is_zero()) {
            return Err(ConfigError::ZeroIdleThreshold);
        }
        if let TransportKind::MessageBus(bus) = &self.transport {
            if bus.host.is_empty() || bus.path.is_empty() {
                return Err(ConfigError::EmptyEndpoint);
            }
            if bus.room.is_some_and(|room| room.len() > ROOM_NAME_CAPACITY) {
                return Err(ConfigError::RoomNameTooLong);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_variant_is_valid() {
        for variant in Variant::iter() {
            let name: &'static str = variant.into();
            assert_eq!(ScaleConfig::variant(variant).validate(), Ok(()), "{}", name);
        }
    }

    #[test]
    fn presets_keep_the_sketch_thresholds() {
        assert_eq!(
            ScaleConfig::variant(Variant::BusSleep).idle_threshold,
            Some(IdleThreshold::Cycles(10))
        );
        assert_eq!(
            ScaleConfig::variant(Variant::BleNotifySleep).idle_threshold,
            Some(IdleThreshold::Seconds(300))
        );
        assert_eq!(
            ScaleConfig::variant(Variant::DisplayOnly).idle_threshold,
            Some(IdleThreshold::Seconds(30))
        );
        assert_eq!(ScaleConfig::variant(Variant::Bus).idle_threshold, None);
    }

    #[test]
    fn ble_presets_sample_slower_and_retare() {
        let config = ScaleConfig::variant(Variant::BleNotify);
        assert_eq!(config.sample_interval, Duration::from_millis(2000));
        assert!(!config.uses_wifi());
        assert!(matches!(
            config.transport,
            TransportKind::BleNotify(NotifyConfig {
                retare_each_interval: true,
                ..
            })
        ));
    }

    #[test]
    fn rejects_broken_configs() {
        let good = ScaleConfig::variant(Variant::BusSleep);

        let config = ScaleConfig {
            sample_interval: Duration::from_ticks(0),
            ..good
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSampleInterval));

        let config = ScaleConfig {
            calibration_factor: f32::NAN,
            ..good
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCalibrationFactor));

        let config = ScaleConfig {
            idle_threshold: Some(IdleThreshold::Cycles(0)),
            ..good
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroIdleThreshold));

        let config = ScaleConfig {
            samples_per_reading: 0,
            ..good
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSamplesPerReading));

        let config = ScaleConfig {
            transport: TransportKind::MessageBus(BusConfig {
                room: Some("a-room-name-that-is-far-too-long-to-fit"),
                ..BusConfig::default()
            }),
            ..good
        };
        assert_eq!(config.validate(), Err(ConfigError::RoomNameTooLong));
    }
}
