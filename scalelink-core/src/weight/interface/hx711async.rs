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

use crate::weight::interface::AsyncStrainGaugeInterface;
use embassy_time::{Duration, Ticker, Timer, with_timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hx711Gain {
    Gain128,
    Gain64,
    Gain32ChannelB,
}

impl Hx711Gain {
    fn tick_count(&self) -> usize {
        match self {
            Hx711Gain::Gain128 => 25,
            Hx711Gain::Gain64 => 27,
            Hx711Gain::Gain32ChannelB => 26,
        }
    }
}

const POWER_MODE_CHANGE_DELAY: Duration = Duration::from_micros(60);
const CLK_HALF_PERIOD: Duration = Duration::from_micros(1);
const VALID_DATA_BITS: usize = 24;

#[derive(Debug, PartialEq, Eq)]
pub enum Error<OutPinE, InPinE> {
    OutPin(OutPinE),
    InPin(InPinE),
    /// DOUT did not go low within the ready timeout
    NotReady,
}

/// Turns the bits clocked out of the HX711 into a signed reading.
///
/// `raw` holds one bit per clock pulse, most significant first. The pulses after the 24 data bits
/// only select the gain for the next conversion and are dropped.
pub fn decode_raw(raw: u32, gain_clocks: usize) -> i32 {
    let data = (raw >> (gain_clocks - VALID_DATA_BITS)) & ((1 << VALID_DATA_BITS) - 1);
    // extend sign if bit 24 is 1
    if (data >> 23) & 0x1 == 0x1 {
        (data | 0xFF00_0000) as i32
    } else {
        data as i32
    }
}

pub struct Hx711Async<CLK, DATA> {
    clock_pin: CLK,
    data_pin: DATA,
    gain_clocks: usize,
    ready_timeout: Duration,
    powered_up: bool,
}

impl<CLK, DATA, ClkE, DataE> Hx711Async<CLK, DATA>
where
    CLK: embedded_hal::digital::OutputPin<Error = ClkE>,
    DATA: embedded_hal_async::digital::Wait<Error = DataE>
        + embedded_hal::digital::InputPin<Error = DataE>,
{
    pub fn new(clock_pin: CLK, data_pin: DATA, gain: Hx711Gain, ready_timeout: Duration) -> Self {
        Self {
            clock_pin,
            data_pin,
            gain_clocks: gain.tick_count(),
            ready_timeout,
            powered_up: false,
        }
    }
}

impl<CLK, DATA, ClkE, DataE> AsyncStrainGaugeInterface for Hx711Async<CLK, DATA>
where
    CLK: embedded_hal::digital::OutputPin<Error = ClkE>,
    DATA: embedded_hal_async::digital::Wait<Error = DataE>
        + embedded_hal::digital::InputPin<Error = DataE>,
{
    type Error = Error<ClkE, DataE>;

    async fn initialize(&mut self) -> Result<(), Self::Error> {
        self.power_up().await
    }

    async fn get_next_reading(&mut self) -> Result<i32, Self::Error> {
        let mut clock_ticker = Ticker::every(CLK_HALF_PERIOD);

        if !self.powered_up {
            self.power_up().await?;
        }

        // DOUT goes low when conversion is ready
        with_timeout(self.ready_timeout, self.data_pin.wait_for_low())
            .await
            .map_err(|_| Error::NotReady)?
            .map_err(Error::InPin)?;

        let mut raw: u32 = 0;
        clock_ticker.next().await;
        for _ in 0..self.gain_clocks {
            raw <<= 1;
            self.clock_pin.set_high().map_err(Error::OutPin)?;
            clock_ticker.next().await;
            self.clock_pin.set_low().map_err(Error::OutPin)?;
            if self.data_pin.is_high().map_err(Error::InPin)? {
                raw |= 0x1;
            }
            clock_ticker.next().await;
        }

        Ok(decode_raw(raw, self.gain_clocks))
    }

    async fn power_down(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        Timer::after(POWER_MODE_CHANGE_DELAY).await;
        self.powered_up = false;
        Ok(())
    }

    async fn power_up(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        Timer::after(POWER_MODE_CHANGE_DELAY).await;
        self.powered_up = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;

    struct RecordingClock {
        high: bool,
        pulses: usize,
    }

    impl embedded_hal::digital::ErrorType for RecordingClock {
        type Error = Infallible;
    }

    impl embedded_hal::digital::OutputPin for RecordingClock {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            if !self.high {
                self.pulses += 1;
            }
            self.high = true;
            Ok(())
        }
    }

    /// A DOUT line that never signals a finished conversion.
    struct DisconnectedData;

    impl embedded_hal::digital::ErrorType for DisconnectedData {
        type Error = Infallible;
    }

    impl embedded_hal::digital::InputPin for DisconnectedData {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(true)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(false)
        }
    }

    impl embedded_hal_async::digital::Wait for DisconnectedData {
        async fn wait_for_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        async fn wait_for_low(&mut self) -> Result<(), Infallible> {
            core::future::pending().await
        }

        async fn wait_for_rising_edge(&mut self) -> Result<(), Infallible> {
            core::future::pending().await
        }

        async fn wait_for_falling_edge(&mut self) -> Result<(), Infallible> {
            core::future::pending().await
        }

        async fn wait_for_any_edge(&mut self) -> Result<(), Infallible> {
            core::future::pending().await
        }
    }

    #[test]
    fn decode_positive_and_negative() {
        // 24 data bits followed by one gain bit
        assert_eq!(decode_raw(0x0000_0002, 25), 1);
        assert_eq!(decode_raw(0x00FF_FFFE, 25), 0x007F_FFFF);
        assert_eq!(decode_raw(0x01FF_FFFF, 25), -1);
        assert_eq!(decode_raw(0x0100_0000, 25), -0x0080_0000);
    }

    #[test]
    fn decode_drops_every_gain_pulse() {
        // 24 data bits 0x000010 followed by three gain bits
        assert_eq!(decode_raw(0x10 << 3 | 0b111, 27), 0x10);
        assert_eq!(decode_raw(0x10 << 2 | 0b11, 26), 0x10);
    }

    #[test]
    fn missing_sensor_times_out_as_not_ready() {
        let clock = RecordingClock {
            high: false,
            pulses: 0,
        };
        let mut hx711 = Hx711Async::new(
            clock,
            DisconnectedData,
            Hx711Gain::Gain128,
            Duration::from_millis(20),
        );
        let result = block_on(hx711.get_next_reading());
        assert_eq!(result, Err(Error::NotReady));
        assert_eq!(hx711.clock_pin.pulses, 0);
    }

    #[test]
    fn power_down_holds_clock_high() {
        let clock = RecordingClock {
            high: false,
            pulses: 0,
        };
        let mut hx711 = Hx711Async::new(
            clock,
            DisconnectedData,
            Hx711Gain::Gain64,
            Duration::from_millis(20),
        );
        block_on(hx711.initialize()).unwrap();
        assert!(!hx711.clock_pin.high);
        block_on(hx711.power_down()).unwrap();
        assert!(hx711.clock_pin.high);
        assert!(!hx711.powered_up);
    }
}
