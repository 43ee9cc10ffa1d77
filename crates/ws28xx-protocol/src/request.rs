//! Driver-to-console request frames.
//!
//! Every poll cycle answers the console with one small frame: a 9-byte
//! request/acknowledge, the 12-byte SendTime, or a full SetConfig body.
//! The console only listens for a short window after transmitting, so these
//! are built ahead of the `SetFrame` write.

#![deny(static_mut_refs)]

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::history::{HistoryAddress, HistoryIndex};
use crate::ids::{DeviceId, BROADCAST_ID};

/// Action byte of a request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// `0x00` — request the archive record at the carried address.
    GetHistory,
    /// `0x01` — ask the console to request the host time.
    AskForTime,
    /// `0x02` — announce a SetConfig body on the next exchange.
    SetConfig,
    /// `0x03` — request the console's configuration.
    GetConfig,
    /// `0x05` — request a current-weather frame.
    GetCurrent,
}

impl Action {
    /// The wire action nibble.
    pub fn raw(self) -> u8 {
        match self {
            Action::GetHistory => 0x00,
            Action::AskForTime => 0x01,
            Action::SetConfig => 0x02,
            Action::GetConfig => 0x03,
            Action::GetCurrent => 0x05,
        }
    }
}

/// A built request payload, ready to seal and write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    buf: [u8; 12],
    len: usize,
}

impl RequestFrame {
    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Build the 9-byte request frame answering a console transmission.
///
/// `comm_interval` gates the console's next RF listen window; `index` is
/// the archive slot a `GetHistory` asks for.
pub fn build_request(
    device_id: DeviceId,
    action: Action,
    config_checksum: u16,
    index: HistoryIndex,
    comm_interval: u8,
) -> RequestFrame {
    let mut buf = [0u8; 12];
    let address = HistoryAddress::from_index(index);
    buf[0..2].copy_from_slice(&device_id.0.to_be_bytes());
    buf[2] = action.raw() & 0x0f;
    buf[3..5].copy_from_slice(&config_checksum.to_be_bytes());
    buf[5] = comm_interval >> 4;
    buf[6] = (((address.0 >> 16) & 0x0f) as u8) | (comm_interval << 4);
    buf[7] = (address.0 >> 8) as u8;
    buf[8] = address.0 as u8;
    RequestFrame { buf, len: 9 }
}

/// Build the first-config request sent while pairing: addressed to the
/// broadcast id, carrying the transceiver's own id in the checksum slot so
/// the console can adopt it.
pub fn build_first_config(transceiver_id: DeviceId, comm_interval: u8) -> RequestFrame {
    build_request(
        DeviceId(BROADCAST_ID),
        Action::GetConfig,
        transceiver_id.0,
        HistoryIndex::UNKNOWN,
        comm_interval,
    )
}

/// Build the 12-byte SendTime frame carrying the host clock.
///
/// Seconds, minutes and hours are BCD; the day-of-week nibble shares a byte
/// with the BCD day, month and two-digit year.
pub fn build_send_time(
    device_id: DeviceId,
    config_checksum: u16,
    now: NaiveDateTime,
) -> RequestFrame {
    let mut buf = [0u8; 12];
    buf[0..2].copy_from_slice(&device_id.0.to_be_bytes());
    buf[2] = 0xc0;
    buf[3..5].copy_from_slice(&config_checksum.to_be_bytes());

    let bcd = |v: u32| ((v / 10) << 4 | (v % 10)) as u8;
    buf[5] = bcd(now.second().min(59));
    buf[6] = bcd(now.minute());
    buf[7] = bcd(now.hour());

    let day = now.day();
    let month = now.month();
    let year = (now.year() - 2000).clamp(0, 99) as u32;
    let weekday = now.weekday().num_days_from_monday();
    buf[8] = (weekday % 10) as u8 | (((day % 10) as u8) << 4);
    buf[9] = (day / 10) as u8 | (((month % 10) as u8) << 4);
    buf[10] = (month / 10) as u8 | (((year % 10) as u8) << 4);
    buf[11] = (year / 10) as u8;
    RequestFrame { buf, len: 12 }
}
