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

#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

extern crate alloc;

#[cfg(feature = "ble")]
mod ble;
mod board;
#[cfg(feature = "display")]
mod display;
mod power;
mod settings;
#[cfg(feature = "wifi")]
mod socket_io;
#[cfg(feature = "wifi")]
mod wifi;

use embassy_executor::Spawner;
use embassy_sync::channel::Channel;
use embassy_sync::pubsub::PubSubChannel;
use embassy_sync::watch::Watch;
use embassy_time::Timer;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Input;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};
use scalelink_core::hmi::debouncer::Debouncer;
use scalelink_core::hmi::inputs::button_input_handler;
use scalelink_core::hmi::messaging::{HmiChannel, HmiChannelPublisher, StatusWatch};
use scalelink_core::idle::IdleMonitor;
use scalelink_core::session::ScaleManager;
use scalelink_core::transport::LinkEventChannel;
use scalelink_core::weight::WeighingSystem;
use scalelink_core::weight::weight::WeightScale;

esp_bootloader_esp_idf::esp_app_desc!();

mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

static HMI_CHANNEL: HmiChannel = PubSubChannel::new();
static LINK_EVENTS: LinkEventChannel = Channel::new();
static STATUS: StatusWatch = Watch::new();

#[cfg(any(feature = "wifi", feature = "ble"))]
static RADIO: static_cell::StaticCell<esp_radio::Controller<'static>> =
    static_cell::StaticCell::new();
#[cfg(feature = "wifi")]
static OUTBOUND: socket_io::OutboundChannel = Channel::new();
#[cfg(feature = "ble")]
static NOTIFY_VALUES: ble::NotifyChannel = Channel::new();

#[embassy_executor::task]
async fn button_task(publisher: HmiChannelPublisher<'static>, button: Debouncer<Input<'static>>) {
    button_input_handler(publisher, button).await
}

#[cfg(feature = "display")]
#[embassy_executor::task]
async fn display_task(
    mut manager: scalelink_core::hmi::display::DisplayManager<display::OledDisplay>,
    receiver: scalelink_core::hmi::messaging::StatusReceiver<'static>,
) {
    manager.run(receiver).await
}

#[cfg(any(feature = "wifi", feature = "ble"))]
async fn radio() -> &'static esp_radio::Controller<'static> {
    match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(e) => {
            error!("Radio init failed: {:?}", e);
            power::halt().await
        }
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::_80MHz));

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let boot = power::BootKind::detect();
    let variant: &'static str = settings::VARIANT.into();
    info!(
        "{} {} ({}) as {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"),
        variant
    );

    let config = settings::scale_config();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        power::halt().await
    }

    for remaining in (1..=settings::NETWORK.boot_wait_seconds).rev() {
        info!("[SETUP] BOOT WAIT {}...", remaining);
        Timer::after_secs(1).await;
    }

    let load_cell = board::load_cell(peripherals.GPIO4, peripherals.GPIO16, config.ready_timeout);
    let mut weight_scale = match WeightScale::new(
        load_cell,
        config.calibration_factor,
        usize::from(config.samples_per_reading),
    )
    .await
    {
        Ok(weight_scale) => weight_scale,
        Err(e) => {
            error!("HX711 not found: {:?}", e);
            power::halt().await
        }
    };
    if let Err(e) = weight_scale.tare().await {
        warn!("Initial tare failed: {:?}", e);
    }

    let (Ok(publisher), Ok(subscriber)) = (HMI_CHANNEL.publisher(), HMI_CHANNEL.subscriber()) else {
        error!("Button channel unavailable");
        power::halt().await
    };
    #[cfg(not(feature = "sleep"))]
    let button_pin = peripherals.GPIO19;
    #[cfg(feature = "sleep")]
    let button_pin = peripherals.GPIO27;
    if let Err(e) = spawner.spawn(button_task(
        publisher,
        board::tare_button(button_pin, config.debounce),
    )) {
        error!("Failed to spawn button task: {:?}", e);
    }

    #[cfg(feature = "display")]
    let status_sender = {
        let oled = match display::OledDisplay::new(peripherals.I2C0, peripherals.GPIO21, peripherals.GPIO22) {
            Ok(oled) => oled,
            Err(e) => {
                error!("Display init failed: {:?}", e);
                power::halt().await
            }
        };
        let Some(receiver) = STATUS.dyn_receiver() else {
            error!("Status channel unavailable");
            power::halt().await
        };
        let manager = scalelink_core::hmi::display::DisplayManager::new(oled);
        if let Err(e) = spawner.spawn(display_task(manager, receiver)) {
            error!("Failed to spawn display task: {:?}", e);
            power::halt().await
        }
        Some(STATUS.dyn_sender())
    };
    #[cfg(not(feature = "display"))]
    let status_sender = None;

    #[cfg(feature = "wifi")]
    let sink = {
        use scalelink_core::config::TransportKind;
        use scalelink_core::transport::message_bus::MessageBusSink;

        let TransportKind::MessageBus(bus) = config.transport else {
            error!("Wi-Fi build without a bus configuration");
            power::halt().await
        };
        if settings::NETWORK.access_points.iter().all(|ap| ap.ssid.is_empty()) {
            warn!("[WIFI] no SSID configured, set SCALELINK_WIFI_SSID");
        }

        let (controller, interfaces) =
            match esp_radio::wifi::new(radio().await, peripherals.WIFI, Default::default()) {
                Ok(parts) => parts,
                Err(e) => {
                    error!("Wi-Fi init failed: {:?}", e);
                    power::halt().await
                }
            };
        let (stack, runner) = wifi::network_stack(interfaces);
        let spawned = spawner
            .spawn(wifi::net_task(runner))
            .and_then(|()| {
                spawner.spawn(wifi::connection_task(
                    controller,
                    stack,
                    settings::NETWORK.access_points,
                    LINK_EVENTS.sender(),
                ))
            })
            .and_then(|()| {
                spawner.spawn(socket_io::session_task(
                    stack,
                    bus,
                    LINK_EVENTS.sender(),
                    &OUTBOUND,
                ))
            });
        if let Err(e) = spawned {
            error!("Failed to spawn network tasks: {:?}", e);
        }
        MessageBusSink::new(socket_io::ChannelFrameWriter::new(&OUTBOUND), &bus)
    };

    #[cfg(feature = "ble")]
    let sink = {
        use scalelink_core::config::TransportKind;
        use scalelink_core::transport::notify::NotifySink;

        let TransportKind::BleNotify(notify) = config.transport else {
            error!("BLE build without a notify configuration");
            power::halt().await
        };
        let connector = match esp_radio::ble::controller::BleConnector::new(
            radio().await,
            peripherals.BT,
            Default::default(),
        ) {
            Ok(connector) => connector,
            Err(e) => {
                error!("BLE init failed: {:?}", e);
                power::halt().await
            }
        };
        if let Err(e) = spawner.spawn(ble::peripheral_task(
            connector,
            notify.device_name,
            LINK_EVENTS.sender(),
            &NOTIFY_VALUES,
        )) {
            error!("Failed to spawn BLE task: {:?}", e);
        }
        NotifySink::new(ble::ChannelNotifier::new(&NOTIFY_VALUES), &notify)
    };

    #[cfg(not(any(feature = "wifi", feature = "ble")))]
    let sink = scalelink_core::transport::NullSink;

    let idle_monitor = config.idle_threshold.map(|threshold| {
        IdleMonitor::new(threshold, power::RtcCounter, boot.resumes_idle_count())
    });

    let mut manager = ScaleManager::new(
        weight_scale,
        sink,
        idle_monitor,
        LINK_EVENTS.receiver(),
        subscriber,
        status_sender,
        config.sample_interval,
        config.uses_wifi(),
    );
    manager.run().await;

    #[cfg(feature = "wifi")]
    socket_io::flush(&OUTBOUND).await;

    #[cfg(feature = "sleep")]
    power::deep_sleep(peripherals.LPWR);

    #[cfg(not(feature = "sleep"))]
    power::halt().await
}
