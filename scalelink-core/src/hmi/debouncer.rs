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

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;

/// Button debounce window used unless configured otherwise.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Debounce state machine fed with raw samples of the button.
///
/// A change is only reported once the raw level has held for the whole window, so any number of
/// bounces inside the window produce at most one edge.
pub struct DebounceFilter {
    window: Duration,
    stable: bool,
    candidate: bool,
    changed_at: Instant,
}

impl DebounceFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stable: false,
            candidate: false,
            changed_at: Instant::from_ticks(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True while a raw change is waiting out the window.
    pub fn is_settling(&self) -> bool {
        self.candidate != self.stable
    }

    pub fn is_pressed(&self) -> bool {
        self.stable
    }

    pub fn update(&mut self, pressed: bool, now: Instant) -> Option<ButtonEdge> {
        if pressed != self.candidate {
            self.candidate = pressed;
            self.changed_at = now;
            return None;
        }

        if self.is_settling() && now.saturating_duration_since(self.changed_at) >= self.window {
            self.stable = self.candidate;
            return Some(if self.stable {
                ButtonEdge::Pressed
            } else {
                ButtonEdge::Released
            });
        }
        None
    }
}

/// Debounced active-low push button.
pub struct Debouncer<I> {
    input: I,
    filter: DebounceFilter,
}

impl<I, E> Debouncer<I>
where
    I: InputPin<Error = E> + Wait<Error = E>,
{
    pub fn new(input: I, debounce: Duration) -> Self {
        Self {
            input,
            filter: DebounceFilter::new(debounce),
        }
    }

    pub fn window(&self) -> Duration {
        self.filter.window()
    }

    /// Resolves once per debounced press.
    pub async fn wait_for_press(&mut self) -> Result<(), E> {
        loop {
            let pressed = self.input.is_low()?;
            if let Some(ButtonEdge::Pressed) = self.filter.update(pressed, Instant::now()) {
                return Ok(());
            }

            if self.filter.is_settling() {
                let io_changed = select(
                    self.input.wait_for_any_edge(),
                    Timer::after(self.filter.window()),
                )
                .await;
                if let Either::First(result) = io_changed {
                    // edge detected, signal not yet stable for time required
                    result?;
                }
            } else {
                self.input.wait_for_any_edge().await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn clean_press_and_release() {
        let mut filter = DebounceFilter::new(DEFAULT_DEBOUNCE);
        assert_eq!(filter.update(true, at(100)), None);
        assert_eq!(filter.update(true, at(110)), None);
        assert_eq!(filter.update(true, at(120)), Some(ButtonEdge::Pressed));
        assert_eq!(filter.update(true, at(500)), None);
        assert!(filter.is_pressed());

        assert_eq!(filter.update(false, at(600)), None);
        assert_eq!(filter.update(false, at(620)), Some(ButtonEdge::Released));
    }

    #[test]
    fn bounces_inside_window_trigger_once() {
        let mut filter = DebounceFilter::new(DEFAULT_DEBOUNCE);
        let samples = [
            (true, 0),
            (false, 2),
            (true, 4),
            (false, 5),
            (true, 7),
            (true, 15),
            (true, 27),
            (true, 30),
            (true, 80),
        ];
        let presses = samples
            .iter()
            .filter_map(|&(pressed, ms)| filter.update(pressed, at(ms)))
            .filter(|edge| *edge == ButtonEdge::Pressed)
            .count();
        assert_eq!(presses, 1);
    }

    #[test]
    fn glitch_shorter_than_window_is_ignored() {
        let mut filter = DebounceFilter::new(DEFAULT_DEBOUNCE);
        assert_eq!(filter.update(true, at(0)), None);
        assert_eq!(filter.update(false, at(5)), None);
        assert!(!filter.is_settling());
        assert_eq!(filter.update(false, at(50)), None);
        assert!(!filter.is_pressed());
    }

    struct HeldButton;

    impl embedded_hal::digital::ErrorType for HeldButton {
        type Error = Infallible;
    }

    impl InputPin for HeldButton {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(false)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(true)
        }
    }

    impl Wait for HeldButton {
        async fn wait_for_high(&mut self) -> Result<(), Infallible> {
            core::future::pending().await
        }

        async fn wait_for_low(&mut self) -> Result<(), Infallible> {
            Ok(())
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
    fn held_button_reports_one_press_after_window() {
        let mut button = Debouncer::new(HeldButton, Duration::from_millis(5));
        let started = Instant::now();
        block_on(button.wait_for_press()).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(5));
        assert!(button.filter.is_pressed());
    }
}
