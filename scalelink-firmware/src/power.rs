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

use embassy_time::Timer;
use esp_hal::rtc_cntl::{SleepSource, SocResetReason, reset_reason, wakeup_cause};
use esp_hal::system::Cpu;
use log::info;
use scalelink_core::idle::RetainedCounter;

#[esp_hal::ram(unstable(rtc_fast, persistent))]
static mut IDLE_COUNT: u32 = 0;

/// Idle count kept in RTC fast memory, which survives deep sleep and software resets.
pub struct RtcCounter;

impl RetainedCounter for RtcCounter {
    fn load(&self) -> u32 {
        // SAFETY: only the sampling loop touches the counter, from a single task
        unsafe { (&raw const IDLE_COUNT).read_volatile() }
    }

    fn store(&mut self, count: u32) {
        // SAFETY: see load
        unsafe { (&raw mut IDLE_COUNT).write_volatile(count) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootKind {
    /// RTC memory holds garbage
    PowerOn,
    ButtonWake,
    Reset,
}

impl BootKind {
    pub fn detect() -> Self {
        let reason = reset_reason(Cpu::ProCpu);
        let cause = wakeup_cause();
        info!("Reset reason {:?}, wakeup cause {:?}", reason, cause);
        match reason {
            None | Some(SocResetReason::ChipPowerOn) => BootKind::PowerOn,
            Some(SocResetReason::CoreDeepSleep) if matches!(cause, SleepSource::Ext0) => {
                BootKind::ButtonWake
            }
            Some(_) => BootKind::Reset,
        }
    }

    /// The idle count carries over only from resets nobody asked for. A button wake is
    /// activity and starts over.
    pub fn resumes_idle_count(&self) -> bool {
        *self == BootKind::Reset
    }
}

/// Parks the caller for good, used when the board cannot do anything useful.
pub async fn halt() -> ! {
    loop {
        Timer::after_secs(1).await;
    }
}

#[cfg(feature = "sleep")]
pub fn deep_sleep(lpwr: esp_hal::peripherals::LPWR<'static>) -> ! {
    use esp_hal::peripherals::GPIO27;
    use esp_hal::rtc_cntl::Rtc;
    use esp_hal::rtc_cntl::sleep::{Ext0WakeupSource, WakeupLevel};

    info!("Entering deep sleep, press the tare button to wake");
    let mut rtc = Rtc::new(lpwr);
    // SAFETY: the sampling loop has returned, nothing reads the button any more
    let button = unsafe { GPIO27::steal() };
    let wake_on_press = Ext0WakeupSource::new(button, WakeupLevel::Low);
    rtc.sleep_deep(&[&wake_on_press])
}
