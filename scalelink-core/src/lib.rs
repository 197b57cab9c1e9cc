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

#![cfg_attr(not(test), no_std)]

//! The part of the scale firmware that does not care which board it runs on: the HX711 driver
//! and averaging scale, the zero band, the tare button debouncer, the idle policy that decides
//! when to deep sleep, the transport sinks and the loop that ties them together.

pub mod config;
pub mod hmi;
pub mod idle;
pub mod reading;
pub mod session;
pub mod transport;
pub mod weight;
