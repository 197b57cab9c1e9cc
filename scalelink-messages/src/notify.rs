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

//! Text payload for the BLE notify characteristic.

use core::fmt::Write;
use heapless::String;

pub const PAYLOAD_WIDTH: usize = 8;
pub const PAYLOAD_DECIMALS: usize = 2;

const MIN_GRAMS: f32 = -9999.99;
const MAX_GRAMS: f32 = 99999.99;

/// Formats `grams` right aligned in eight characters with two decimals, e.g. `"   12.50"`.
///
/// Values outside the range that fits the width are clamped so the payload length never
/// changes.
pub fn weight_payload(grams: f32) -> String<16> {
    let grams = if grams.is_nan() {
        0.0
    } else {
        grams.clamp(MIN_GRAMS, MAX_GRAMS)
    };
    let mut payload = String::new();
    // 16 bytes always holds a clamped value
    let _ = write!(
        payload,
        "{:>width$.prec$}",
        grams,
        width = PAYLOAD_WIDTH,
        prec = PAYLOAD_DECIMALS
    );
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CALIBRATING_SENTINEL;

    #[test]
    fn pads_to_eight_characters() {
        assert_eq!(weight_payload(12.5).as_str(), "   12.50");
        assert_eq!(weight_payload(0.0).as_str(), "    0.00");
        assert_eq!(weight_payload(-3.456).as_str(), "   -3.46");
    }

    #[test]
    fn sentinel_fits_the_width() {
        assert_eq!(weight_payload(CALIBRATING_SENTINEL).as_str(), "-9999.00");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(weight_payload(250_000.0).as_str(), "99999.99");
        assert_eq!(weight_payload(-20_000.0).as_str(), "-9999.99");
        assert_eq!(weight_payload(f32::NAN).len(), PAYLOAD_WIDTH);
    }
}
