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

//! Decides when an empty scale has been idle long enough to deep sleep.
//!
//! The monitor counts consecutive zero readings. The count is written through a
//! [`RetainedCounter`] every cycle so that on the device it survives in RTC memory across resets
//! that are not a wake by the button. Once suspended the monitor stays suspended, only a reboot
//! brings the device back.

use crate::reading::Reading;
use embassy_time::{Duration, Instant};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleThreshold {
    /// Consecutive zero sampling cycles
    Cycles(u32),
    /// Time since the first of a run of zero readings
    Seconds(u32),
}

impl IdleThreshold {
    pub fn is_zero(&self) -> bool {
        matches!(self, IdleThreshold::Cycles(0) | IdleThreshold::Seconds(0))
    }
}

/// Storage for the idle count that outlives the sampling loop.
pub trait RetainedCounter {
    fn load(&self) -> u32;

    fn store(&mut self, count: u32);
}

/// Counter that lives only as long as the loop, for boards without retained memory.
#[derive(Debug, Default)]
pub struct VolatileCounter(u32);

impl RetainedCounter for VolatileCounter {
    fn load(&self) -> u32 {
        self.0
    }

    fn store(&mut self, count: u32) {
        self.0 = count;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleDecision {
    Active,
    /// The threshold was reached on this reading
    Suspend,
    /// Already suspended on an earlier reading
    Suspended,
}

pub struct IdleMonitor<RC> {
    threshold: IdleThreshold,
    retained: RC,
    count: u32,
    zero_since: Option<Instant>,
    suspended: bool,
}

impl<RC: RetainedCounter> IdleMonitor<RC> {
    /// With `resume` set the count carries on from the retained value, otherwise it starts from
    /// zero. A wake by the button counts as activity so the firmware passes `false` for it.
    pub fn new(threshold: IdleThreshold, mut retained: RC, resume: bool) -> Self {
        let count = if resume { retained.load() } else { 0 };
        retained.store(count);
        debug!("Idle monitor starting at {} zero cycles", count);
        Self {
            threshold,
            retained,
            count,
            zero_since: None,
            suspended: false,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn observe(&mut self, reading: &Reading, now: Instant) -> IdleDecision {
        if self.suspended {
            return IdleDecision::Suspended;
        }

        if reading.is_zero() {
            self.count = self.count.saturating_add(1);
            self.zero_since.get_or_insert(now);
        } else {
            self.count = 0;
            self.zero_since = None;
        }
        self.retained.store(self.count);

        let due = match self.threshold {
            IdleThreshold::Cycles(cycles) => self.count >= cycles,
            IdleThreshold::Seconds(seconds) => self.zero_since.is_some_and(|since| {
                now.saturating_duration_since(since) >= Duration::from_secs(seconds as u64)
            }),
        };

        if due {
            info!("Scale idle ({:?}), suspending", self.threshold);
            self.suspended = true;
            IdleDecision::Suspend
        } else {
            IdleDecision::Active
        }
    }
}
