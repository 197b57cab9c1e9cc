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

#![no_std]

//! Wire formats shared between the scale firmware and whatever sits on the other end of the
//! link: the Socket.IO event the backend listens for, the Engine.IO packets that carry it, and
//! the short text payload pushed over the BLE notify characteristic.

extern crate alloc;

pub mod bus;
pub mod engine_io;
pub mod notify;

/// Value sent in place of a weight while the scale is being re-zeroed.
pub const CALIBRATING_SENTINEL: f32 = -9999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The JSON serializer rejected the payload
    Serialization,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EncodeError::Serialization => write!(f, "payload could not be serialized"),
        }
    }
}
