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

use crate::hmi::messaging::StatusReceiver;
use crate::hmi::status_screen::{StatusScreen, StatusSnapshot};
use embedded_graphics::Drawable;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use log::{debug, error};

/// A buffered panel, drawing only lands on the glass when flushed.
pub trait FlushableDisplay: DrawTarget<Color = BinaryColor> {
    type FlushError: core::fmt::Debug;

    fn flush(&mut self) -> Result<(), Self::FlushError>;
}

pub struct DisplayManager<D> {
    display: D,
}

impl<D> DisplayManager<D>
where
    D: FlushableDisplay,
    D::Error: core::fmt::Debug,
{
    pub fn new(display: D) -> Self {
        Self { display }
    }

    pub async fn run(&mut self, mut status_receiver: StatusReceiver<'_>) -> ! {
        loop {
            let snapshot = status_receiver.changed().await;
            self.show(&snapshot);
        }
    }

    pub fn show(&mut self, snapshot: &StatusSnapshot) {
        debug!("Display update: {:?}", snapshot);
        let _ = self
            .display
            .clear(BinaryColor::Off)
            .map_err(|e| error!("Display clear failed: {:?}", e));
        let _ = StatusScreen::full_screen(*snapshot)
            .draw(&mut self.display)
            .map_err(|e| error!("Display draw failed: {:?}", e));
        let _ = self
            .display
            .flush()
            .map_err(|e| error!("Display flush failed: {:?}", e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmi::messaging::StatusWatch;
    use crate::hmi::status_screen::{LinkKind, SCREEN_HEIGHT, SCREEN_WIDTH};
    use crate::hmi::status_screen::tests::CountingDisplay;
    use crate::reading::Reading;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embassy_futures::select::{Either, select};
    use embassy_time::{Duration, Timer};

    struct FlushCounter {
        panel: CountingDisplay,
        flushes: usize,
    }

    impl embedded_graphics::prelude::OriginDimensions for FlushCounter {
        fn size(&self) -> embedded_graphics::prelude::Size {
            embedded_graphics::prelude::Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
        }
    }

    impl DrawTarget for FlushCounter {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
        {
            self.panel.draw_iter(pixels)
        }

        fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
            self.panel.clear(color)
        }
    }

    impl FlushableDisplay for FlushCounter {
        type FlushError = Infallible;

        fn flush(&mut self) -> Result<(), Infallible> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn counter() -> FlushCounter {
        FlushCounter {
            panel: CountingDisplay::new(),
            flushes: 0,
        }
    }

    #[test]
    fn show_draws_and_flushes_once() {
        let mut manager = DisplayManager::new(counter());
        manager.show(&StatusSnapshot {
            wifi: Some(true),
            link: Some((LinkKind::Bus, false)),
            reading: Some(Reading::Grams(12.5)),
        });
        assert_eq!(manager.display.flushes, 1);
        assert!(manager.display.panel.lit > 0);
    }

    #[test]
    fn run_redraws_on_each_new_snapshot() {
        static STATUS: StatusWatch = StatusWatch::new();
        let mut manager = DisplayManager::new(counter());
        let receiver = STATUS.dyn_receiver().unwrap();
        STATUS.sender().send(StatusSnapshot {
            wifi: None,
            link: None,
            reading: None,
        });

        block_on(async {
            let outcome = select(manager.run(receiver), Timer::after(Duration::from_millis(20))).await;
            assert!(matches!(outcome, Either::Second(())));
        });
        assert_eq!(manager.display.flushes, 1);
    }
}
