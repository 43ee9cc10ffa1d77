//! History frame decoding and the archive ring addressing.

#![deny(static_mut_refs)]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::frame::{CodecError, FrameHeader};
use crate::nibble::Nib;
use crate::values::{self, Reading, WindDirection};

/// Wire length of a history frame.
pub const HISTORY_FRAME_LEN: usize = 0x1e;

/// Number of slots in the console's circular archive.
pub const HISTORY_RING_SIZE: u16 = 1797;

/// Byte address of the first archive slot in console memory.
const RING_BASE_ADDR: u32 = 0x1a0;
/// Bytes per archived record.
const RECORD_SIZE: u32 = 18;

/// 12-bit ring pointer into the console's archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoryIndex(pub u16);

impl HistoryIndex {
    /// Marker for "no index known yet".
    pub const UNKNOWN: HistoryIndex = HistoryIndex(0xffff);

    /// True for a real ring slot.
    pub fn is_valid(self) -> bool {
        self.0 < HISTORY_RING_SIZE
    }

    /// The slot following this one, wrapping at the ring size.
    pub fn next(self) -> HistoryIndex {
        HistoryIndex((self.0 + 1) % HISTORY_RING_SIZE)
    }

    /// Records between `self` and `latest` inclusive of neither end,
    /// honouring ring wraparound.
    pub fn outstanding_until(self, latest: HistoryIndex) -> u16 {
        if !self.is_valid() || !latest.is_valid() {
            return 0;
        }
        if latest.0 >= self.0 {
            latest.0 - self.0
        } else {
            latest.0 + HISTORY_RING_SIZE - self.0
        }
    }
}

/// Byte address of an archive slot in console memory, as carried on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryAddress(pub u32);

impl HistoryAddress {
    /// Sentinel address used when no slot is being requested.
    pub const NONE: HistoryAddress = HistoryAddress(0xffffff);

    /// Address of a ring slot.
    pub fn from_index(index: HistoryIndex) -> HistoryAddress {
        if index.is_valid() {
            HistoryAddress(RECORD_SIZE * u32::from(index.0) + RING_BASE_ADDR)
        } else {
            HistoryAddress::NONE
        }
    }

    /// Ring slot of an address, if it denotes one.
    pub fn index(self) -> HistoryIndex {
        if self.0 < RING_BASE_ADDR || self.0 == 0xffffff {
            return HistoryIndex::UNKNOWN;
        }
        let idx = (self.0 - RING_BASE_ADDR) / RECORD_SIZE;
        if idx < u32::from(HISTORY_RING_SIZE) {
            HistoryIndex(idx as u16)
        } else {
            HistoryIndex::UNKNOWN
        }
    }
}

/// One archived sample, immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Console timestamp of the sample.
    pub time: NaiveDateTime,
    /// Indoor temperature, °C.
    pub temp_indoor: Reading,
    /// Outdoor temperature, °C.
    pub temp_outdoor: Reading,
    /// Indoor relative humidity, %.
    pub humidity_indoor: Reading,
    /// Outdoor relative humidity, %.
    pub humidity_outdoor: Reading,
    /// Relative pressure, hPa.
    pub pressure: Reading,
    /// Raw rain counter, mm.
    pub rain_counter: Reading,
    /// Wind direction at sample time.
    pub wind_direction: WindDirection,
    /// Wind speed, m/s.
    pub wind_speed: Reading,
    /// Gust speed, m/s.
    pub gust: Reading,
}

/// A decoded history frame: the record plus the two ring pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryFrame {
    /// Frame header.
    pub header: FrameHeader,
    /// Slot most recently written by the console.
    pub latest_index: HistoryIndex,
    /// Slot this record came from.
    pub this_index: HistoryIndex,
    /// The archived sample.
    pub record: HistoryRecord,
}

fn address_at(payload: &[u8], byte: usize) -> HistoryAddress {
    HistoryAddress(
        (u32::from(payload[byte] & 0x0f) << 16)
            | (u32::from(payload[byte + 1]) << 8)
            | u32::from(payload[byte + 2]),
    )
}

/// Decode a history frame payload (response type `0x80`).
pub fn decode_history(payload: &[u8]) -> Result<HistoryFrame, CodecError> {
    let header = FrameHeader::parse(payload)?;

    let latest = address_at(payload, 6);
    let this = address_at(payload, 9);

    let mut wind_direction = WindDirection::from_nibble(payload[14] >> 4);
    let wind_speed = values::windspeed_3_1(payload, 14, Nib::Lo);
    if wind_speed.is_absent() {
        wind_direction = WindDirection::INVALID;
    }

    let time = values::datetime_10(payload, 25, Nib::Hi).ok_or(CodecError::Nibble(25))?;

    Ok(HistoryFrame {
        header,
        latest_index: latest.index(),
        this_index: this.index(),
        record: HistoryRecord {
            time,
            gust: values::windspeed_3_1(payload, 12, Nib::Lo),
            wind_direction,
            wind_speed,
            rain_counter: values::rain_3_1(payload, 16, Nib::Hi),
            humidity_outdoor: values::humidity_2_0(payload, 17, Nib::Lo),
            humidity_indoor: values::humidity_2_0(payload, 18, Nib::Lo),
            pressure: values::pressure_hpa_5_1(payload, 19, Nib::Lo),
            temp_outdoor: values::temperature_3_1(payload, 22, Nib::Hi),
            temp_indoor: values::temperature_3_1(payload, 23, Nib::Lo),
        },
    })
}
