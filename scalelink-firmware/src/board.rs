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

//! Pin assignment of the scale board.
//!
//! | Signal      | GPIO                                   |
//! |-------------|----------------------------------------|
//! | HX711 DOUT  | 16                                     |
//! | HX711 SCK   | 4                                      |
//! | Tare button | 19, or 27 on builds that deep sleep    |
//! | OLED SDA    | 21                                     |
//! | OLED SCL    | 22                                     |
//!
//! GPIO19 is not an RTC pin on the ESP32, so boards that wake from deep sleep on the button wire it
//! to GPIO27 instead.

use embassy_time::Duration;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::peripherals::{GPIO4, GPIO16};
use scalelink_core::hmi::debouncer::Debouncer;
use scalelink_core::weight::interface::hx711async::{Hx711Async, Hx711Gain};

#[cfg(not(feature = "sleep"))]
pub type ButtonPin = esp_hal::peripherals::GPIO19<'static>;
#[cfg(feature = "sleep")]
pub type ButtonPin = esp_hal::peripherals::GPIO27<'static>;

pub type LoadCell = Hx711Async<Output<'static>, Input<'static>>;

pub fn load_cell(sck: GPIO4<'static>, dout: GPIO16<'static>, ready_timeout: Duration) -> LoadCell {
    let clock = Output::new(sck, Level::Low, OutputConfig::default());
    let data = Input::new(dout, InputConfig::default());
    Hx711Async::new(clock, data, Hx711Gain::Gain128, ready_timeout)
}

/// The button pulls the line to ground, so it is read with the internal pull-up.
pub fn tare_button(pin: ButtonPin, debounce: Duration) -> Debouncer<Input<'static>> {
    let input = Input::new(pin, InputConfig::default().with_pull(Pull::Up));
    Debouncer::new(input, debounce)
}
