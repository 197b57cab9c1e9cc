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

use crate::hmi::status_screen::StatusSnapshot;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};
use embassy_sync::watch::{DynReceiver, DynSender, Watch};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum HmiMessage {
    TarePressed,
}

const CHANNEL_DEPTH: usize = 4;
const CHANNEL_SUBS: usize = 1;
const CHANNEL_PUBS: usize = 1;

pub type HmiChannel =
    PubSubChannel<CriticalSectionRawMutex, HmiMessage, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type HmiChannelSubscriber<'a> =
    Subscriber<'a, CriticalSectionRawMutex, HmiMessage, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type HmiChannelPublisher<'a> =
    Publisher<'a, CriticalSectionRawMutex, HmiMessage, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;

const STATUS_RECEIVERS: usize = 1;

/// Latest status for the display, older snapshots are simply overwritten.
pub type StatusWatch = Watch<CriticalSectionRawMutex, StatusSnapshot, STATUS_RECEIVERS>;
pub type StatusReceiver<'a> = DynReceiver<'a, StatusSnapshot>;
pub type StatusSender<'a> = DynSender<'a, StatusSnapshot>;
