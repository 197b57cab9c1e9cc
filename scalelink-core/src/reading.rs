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

use crate::weight::filter::zero_band;
use scalelink_messages::CALIBRATING_SENTINEL;

/// What one sampling cycle produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Grams(f32),
    /// The scale is being re-zeroed, sent as [`CALIBRATING_SENTINEL`]
    Calibrating,
}

impl Reading {
    /// Applies the zero band to a weight, the sentinel passes through untouched.
    pub fn filtered(self) -> Self {
        match self {
            Reading::Grams(grams) => Reading::Grams(zero_band(grams)),
            Reading::Calibrating => Reading::Calibrating,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Reading::Grams(grams) if *grams == 0.0)
    }

    /// The number put on the wire for this reading.
    pub fn wire_value(&self) -> f32 {
        match self {
            Reading::Grams(grams) => *grams,
            Reading::Calibrating => CALIBRATING_SENTINEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_not_filtered() {
        assert_eq!(Reading::Calibrating.filtered(), Reading::Calibrating);
        assert_eq!(Reading::Calibrating.wire_value(), -9999.0);
        assert!(!Reading::Calibrating.is_zero());
    }

    #[test]
    fn noise_filters_to_zero() {
        let reading = Reading::Grams(0.4).filtered();
        assert!(reading.is_zero());
        assert_eq!(reading.wire_value(), 0.0);
        assert!(!Reading::Grams(7.2).filtered().is_zero());
    }
}
