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

/// Readings strictly inside `(-ZERO_BAND_GRAMS, ZERO_BAND_GRAMS)` are treated as an empty scale.
pub const ZERO_BAND_GRAMS: f32 = 1.0;

/// Clamps near-zero noise to exactly zero. The band is open, `±1.0` pass through unchanged.
pub fn zero_band(grams: f32) -> f32 {
    if grams > -ZERO_BAND_GRAMS && grams < ZERO_BAND_GRAMS {
        0.0
    } else {
        grams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_band_is_zero() {
        for grams in [0.0, 0.4, -0.2, 0.999, -0.999] {
            assert_eq!(zero_band(grams), 0.0);
        }
    }

    #[test]
    fn band_is_open() {
        assert_eq!(zero_band(1.0), 1.0);
        assert_eq!(zero_band(-1.0), -1.0);
    }

    #[test]
    fn outside_band_unchanged() {
        assert_eq!(zero_band(5.0), 5.0);
        assert_eq!(zero_band(-12.5), -12.5);
        assert_eq!(zero_band(1.001), 1.001);
    }
}
