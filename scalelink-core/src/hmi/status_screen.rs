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

use crate::reading::Reading;
use core::fmt::Write;
use embedded_graphics::Drawable;
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, Point, Size};
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use embedded_layout::View;
use heapless::String;

pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;

const STATUS_LINE_HEIGHT: i32 = 12;

pub type StatusLine = String<20>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Bus,
    Ble,
}

impl LinkKind {
    fn label(&self) -> &'static str {
        match self {
            LinkKind::Bus => "Bus",
            LinkKind::Ble => "BLE",
        }
    }
}

/// Everything the status screen shows, as published by the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    /// `None` when the variant has no Wi-Fi
    pub wifi: Option<bool>,
    pub link: Option<(LinkKind, bool)>,
    /// Last good reading, `None` until the first one arrives
    pub reading: Option<Reading>,
}

pub fn connectivity_line(label: &str, up: bool) -> StatusLine {
    let mut line = StatusLine::new();
    let _ = write!(line, "{}: {}", label, if up { "OK" } else { "--" });
    line
}

const OUT_OF_RANGE: &str = "Out of range";

pub fn reading_line(reading: Option<Reading>) -> StatusLine {
    let mut line = StatusLine::new();
    let written = match reading {
        Some(Reading::Grams(grams)) => write!(line, "{:.1} g", grams),
        Some(Reading::Calibrating) => write!(line, "Calibrating..."),
        None => write!(line, "-- g"),
    };
    if written.is_err() {
        line.clear();
        let _ = line.push_str(OUT_OF_RANGE);
    }
    line
}

pub struct StatusScreen {
    snapshot: StatusSnapshot,
    bounds: Rectangle,
}

impl StatusScreen {
    pub fn new(snapshot: StatusSnapshot, position: Point, size: Size) -> Self {
        Self {
            snapshot,
            bounds: Rectangle::new(position, size),
        }
    }

    pub fn full_screen(snapshot: StatusSnapshot) -> Self {
        Self::new(
            snapshot,
            Point::zero(),
            Size::new(SCREEN_WIDTH, SCREEN_HEIGHT),
        )
    }

    fn status_lines(&self) -> impl Iterator<Item = StatusLine> + '_ {
        let wifi = self
            .snapshot
            .wifi
            .map(|up| connectivity_line("WiFi", up));
        let link = self
            .snapshot
            .link
            .map(|(kind, up)| connectivity_line(kind.label(), up));
        wifi.into_iter().chain(link)
    }
}

impl View for StatusScreen {
    #[inline]
    fn translate_impl(&mut self, by: Point) {
        self.bounds.translate_mut(by);
    }

    #[inline]
    fn bounds(&self) -> Rectangle {
        self.bounds
    }
}

impl Drawable for StatusScreen {
    type Color = BinaryColor;
    type Output = ();

    fn draw<D: DrawTarget<Color = BinaryColor>>(&self, display: &mut D) -> Result<(), D::Error> {
        let status_char_style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();
        let left_text_style = TextStyleBuilder::new()
            .alignment(Alignment::Left)
            .baseline(Baseline::Top)
            .build();

        let origin = self.bounds.top_left;
        let mut lines_drawn = 0;
        for line in self.status_lines() {
            Text::with_text_style(
                line.as_str(),
                origin + Point::new(0, lines_drawn * STATUS_LINE_HEIGHT),
                status_char_style,
                left_text_style,
            )
            .draw(display)?;
            lines_drawn += 1;
        }

        // the value sits centred in whatever is left below the status lines
        let status_height = lines_drawn * STATUS_LINE_HEIGHT;
        let value_centre = origin
            + Point::new(
                self.bounds.size.width as i32 / 2,
                status_height + (self.bounds.size.height as i32 - status_height) / 2,
            );
        let value_font = match self.snapshot.reading {
            Some(Reading::Calibrating) => &FONT_9X15,
            _ => &FONT_10X20,
        };
        let value_char_style = MonoTextStyleBuilder::new()
            .font(value_font)
            .text_color(BinaryColor::On)
            .build();
        let centred_text_style = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();

        Text::with_text_style(
            reading_line(self.snapshot.reading).as_str(),
            value_centre,
            value_char_style,
            centred_text_style,
        )
        .draw(display)?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_graphics::Pixel;
    use embedded_graphics::prelude::OriginDimensions;

    /// 128x64 target that counts lit pixels and anything drawn off screen.
    pub(crate) struct CountingDisplay {
        pub lit: usize,
        pub out_of_bounds: usize,
    }

    impl CountingDisplay {
        pub(crate) fn new() -> Self {
            Self {
                lit: 0,
                out_of_bounds: 0,
            }
        }
    }

    impl OriginDimensions for CountingDisplay {
        fn size(&self) -> Size {
            Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
        }
    }

    impl DrawTarget for CountingDisplay {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                let inside = point.x >= 0
                    && point.y >= 0
                    && (point.x as u32) < SCREEN_WIDTH
                    && (point.y as u32) < SCREEN_HEIGHT;
                if !inside {
                    self.out_of_bounds += 1;
                } else if color == BinaryColor::On {
                    self.lit += 1;
                }
            }
            Ok(())
        }

        fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
            if color == BinaryColor::Off {
                self.lit = 0;
            }
            Ok(())
        }
    }

    #[test]
    fn connectivity_lines() {
        assert_eq!(connectivity_line("WiFi", true).as_str(), "WiFi: OK");
        assert_eq!(connectivity_line("WiFi", false).as_str(), "WiFi: --");
        assert_eq!(connectivity_line(LinkKind::Ble.label(), true).as_str(), "BLE: OK");
    }

    #[test]
    fn value_line() {
        assert_eq!(reading_line(Some(Reading::Grams(123.44))).as_str(), "123.4 g");
        assert_eq!(reading_line(Some(Reading::Grams(0.0))).as_str(), "0.0 g");
        assert_eq!(reading_line(Some(Reading::Calibrating)).as_str(), "Calibrating...");
        assert_eq!(reading_line(None).as_str(), "-- g");
    }

    #[test]
    fn oversized_value_is_not_truncated() {
        assert_eq!(
            reading_line(Some(Reading::Grams(f32::MAX))).as_str(),
            "Out of range"
        );
        assert_eq!(
            reading_line(Some(Reading::Grams(-1.0e17))).as_str(),
            "Out of range"
        );
    }

    #[test]
    fn only_configured_links_get_a_line() {
        let snapshot = StatusSnapshot {
            wifi: None,
            link: Some((LinkKind::Ble, false)),
            reading: None,
        };
        let screen = StatusScreen::full_screen(snapshot);
        let lines: std::vec::Vec<_> = screen.status_lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str(), "BLE: --");
    }

    #[test]
    fn draws_inside_the_panel() {
        let snapshot = StatusSnapshot {
            wifi: Some(true),
            link: Some((LinkKind::Bus, true)),
            reading: Some(Reading::Calibrating),
        };
        let mut display = CountingDisplay::new();
        StatusScreen::full_screen(snapshot).draw(&mut display).unwrap();
        assert!(display.lit > 0);
        assert_eq!(display.out_of_bounds, 0);
    }

    #[test]
    fn largest_weight_fits() {
        let snapshot = StatusSnapshot {
            wifi: Some(false),
            link: Some((LinkKind::Bus, false)),
            reading: Some(Reading::Grams(99999.9)),
        };
        let mut display = CountingDisplay::new();
        StatusScreen::full_screen(snapshot).draw(&mut display).unwrap();
        assert_eq!(display.out_of_bounds, 0);
    }
}
