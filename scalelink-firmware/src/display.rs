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

use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Size};
use esp_hal::Blocking;
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::peripherals::{GPIO21, GPIO22, I2C0};
use esp_hal::time::Rate;
use scalelink_core::hmi::display::FlushableDisplay;
use scalelink_core::hmi::status_screen::{SCREEN_HEIGHT, SCREEN_WIDTH};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

type Panel = Ssd1306<
    I2CInterface<I2c<'static, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

type PanelError = <Panel as DrawTarget>::Error;

#[derive(Debug)]
pub enum Error {
    Bus(ConfigError),
    Panel(PanelError),
}

/// The 128x64 SSD1306 OLED on I2C0 at address 0x3C.
pub struct OledDisplay {
    panel: Panel,
}

impl OledDisplay {
    pub fn new(i2c: I2C0<'static>, sda: GPIO21<'static>, scl: GPIO22<'static>) -> Result<Self, Error> {
        let i2c = I2c::new(i2c, I2cConfig::default().with_frequency(Rate::from_khz(400)))
            .map_err(Error::Bus)?
            .with_sda(sda)
            .with_scl(scl);
        let mut panel = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        panel.init().map_err(Error::Panel)?;
        Ok(Self { panel })
    }
}

impl OriginDimensions for OledDisplay {
    fn size(&self) -> Size {
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl DrawTarget for OledDisplay {
    type Color = BinaryColor;
    type Error = PanelError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.panel.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        DrawTarget::clear(&mut self.panel, color)
    }
}

impl FlushableDisplay for OledDisplay {
    type FlushError = PanelError;

    fn flush(&mut self) -> Result<(), Self::FlushError> {
        self.panel.flush()
    }
}
