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

use crate::hmi::debouncer::Debouncer;
use crate::hmi::messaging::{HmiChannelPublisher, HmiMessage};
use embassy_time::Timer;
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use log::{debug, warn};

/// Forwards every debounced press of the tare button to the sampling loop.
pub async fn button_input_handler<I, E>(
    hmi_publisher: HmiChannelPublisher<'_>,
    mut debounced_btn: Debouncer<I>,
) -> !
where
    I: InputPin<Error = E> + Wait<Error = E>,
    E: core::fmt::Debug,
{
    loop {
        match debounced_btn.wait_for_press().await {
            Ok(()) => {
                debug!("Tare button pressed");
                hmi_publisher.publish_immediate(HmiMessage::TarePressed);
            }
            Err(e) => {
                warn!("Tare button read failed: {:?}", e);
                Timer::after(debounced_btn.window()).await;
            }
        }
    }
}
