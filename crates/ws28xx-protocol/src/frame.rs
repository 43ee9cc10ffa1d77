//! Frame headers, response types, and the transport checksum.
//!
//! Every frame exchanged with the dongle rides in a 273-byte buffer. The
//! payload is followed by a 16-bit big-endian checksum over all payload
//! bytes; [`seal_frame`] appends it on the way out and [`open_frame`]
//! verifies and strips it on the way in. Frames that fail the check are
//! discarded before any field is interpreted.

#![deny(static_mut_refs)]

use thiserror::Error;

use crate::ids::DeviceId;
use crate::values::BatteryFlags;

/// Largest buffer the dongle exchanges in one `SetFrame`/`GetFrame`.
pub const MAX_FRAME_SIZE: usize = 273;

/// Codec failures. None of these are retryable; the offending frame is
/// dropped and the service loop continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer length does not match any known frame.
    #[error("bad frame length {actual}, expected {expected}")]
    Length {
        /// Expected length in bytes.
        expected: usize,
        /// Received length in bytes.
        actual: usize,
    },

    /// The trailing checksum does not match the payload sum.
    #[error("checksum mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    Checksum {
        /// Checksum carried in the frame.
        stored: u16,
        /// Checksum recomputed from the payload.
        computed: u16,
    },

    /// First post-header byte is not a known response type.
    #[error("unknown response type {0:#04x}")]
    ResponseType(u8),

    /// A value field could not be interpreted.
    #[error("nibble field out of range at byte {0}")]
    Nibble(usize),

    /// The frame carries a different console's device id.
    #[error("unexpected device id {got}, paired to {want}")]
    DeviceId {
        /// Id carried by the frame.
        got: DeviceId,
        /// Id this driver is paired to.
        want: DeviceId,
    },
}

/// Response type from the console, the first post-header byte of every
/// received frame. The `0xa0` class carries its request in the low nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// `0x20` — config or time write accepted.
    Ack,
    /// `0x40` — GetConfig body follows.
    Config,
    /// `0x60` — current weather.
    Current,
    /// `0x80` — history record.
    History,
    /// `0xa1` — console requests first-time configuration (pairing).
    RequestFirstConfig,
    /// `0xa2` — console requests a SetConfig body.
    RequestSetConfig,
    /// `0xa3` — console requests the host time.
    RequestSetTime,
}

impl ResponseType {
    /// Decode the raw response byte.
    pub fn from_raw(raw: u8) -> Result<Self, CodecError> {
        match raw & 0xe0 {
            0x20 => Ok(ResponseType::Ack),
            0x40 => Ok(ResponseType::Config),
            0x60 => Ok(ResponseType::Current),
            0x80 => Ok(ResponseType::History),
            0xa0 => match raw & 0x0f {
                0x1 => Ok(ResponseType::RequestFirstConfig),
                0x2 => Ok(ResponseType::RequestSetConfig),
                0x3 => Ok(ResponseType::RequestSetTime),
                _ => Err(CodecError::ResponseType(raw)),
            },
            _ => Err(CodecError::ResponseType(raw)),
        }
    }

    /// Payload length this response type arrives with, where fixed.
    pub fn expected_len(self) -> Option<usize> {
        match self {
            ResponseType::Ack => Some(6),
            ResponseType::Config => Some(crate::config::CONFIG_FRAME_LEN),
            ResponseType::Current => Some(crate::current::CURRENT_FRAME_LEN),
            ResponseType::History => Some(crate::history::HISTORY_FRAME_LEN),
            ResponseType::RequestFirstConfig
            | ResponseType::RequestSetConfig
            | ResponseType::RequestSetTime => Some(6),
        }
    }
}

/// Parsed header common to every console-to-driver frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    /// Console device id (bytes 0..2, big-endian).
    pub device_id: DeviceId,
    /// Response type from byte 2.
    pub response: ResponseType,
    /// Battery-low flags from the low nibble of byte 2.
    pub battery: BatteryFlags,
    /// Link quality 0..=100 in steps of 5, from byte 3.
    pub quality: u8,
    /// Config checksum echo from bytes 4..6 where the frame carries one.
    pub config_checksum: u16,
}

impl FrameHeader {
    /// Parse the header and validate the payload length against the
    /// response type.
    pub fn parse(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < 6 {
            return Err(CodecError::Length {
                expected: 6,
                actual: payload.len(),
            });
        }
        let response = ResponseType::from_raw(payload[2])?;
        if let Some(expected) = response.expected_len() {
            if payload.len() != expected {
                return Err(CodecError::Length {
                    expected,
                    actual: payload.len(),
                });
            }
        }
        Ok(FrameHeader {
            device_id: DeviceId(u16::from_be_bytes([payload[0], payload[1]])),
            response,
            battery: BatteryFlags(payload[2] & 0x0f),
            quality: payload[3] & 0x7f,
            config_checksum: u16::from_be_bytes([payload[4], payload[5]]),
        })
    }
}

/// Sum of all payload bytes modulo 0x10000.
pub fn payload_checksum(payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Append the transport checksum, producing the buffer handed to
/// `SetFrame`. Returns the sealed length (`payload + 2`).
pub fn seal_frame(payload: &[u8], out: &mut [u8; MAX_FRAME_SIZE]) -> usize {
    debug_assert!(payload.len() + 2 <= MAX_FRAME_SIZE);
    out[..payload.len()].copy_from_slice(payload);
    let cs = payload_checksum(payload);
    out[payload.len()..payload.len() + 2].copy_from_slice(&cs.to_be_bytes());
    payload.len() + 2
}

/// Verify and strip the transport checksum from a received buffer.
pub fn open_frame(buf: &[u8]) -> Result<&[u8], CodecError> {
    if buf.len() < 2 || buf.len() > MAX_FRAME_SIZE {
        return Err(CodecError::Length {
            expected: MAX_FRAME_SIZE,
            actual: buf.len(),
        });
    }
    let (payload, trailer) = buf.split_at(buf.len() - 2);
    let stored = u16::from_be_bytes([trailer[0], trailer[1]]);
    let computed = payload_checksum(payload);
    if stored != computed {
        return Err(CodecError::Checksum { stored, computed });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_decode() {
        assert_eq!(ResponseType::from_raw(0x64), Ok(ResponseType::Current));
        assert_eq!(ResponseType::from_raw(0x80), Ok(ResponseType::History));
        assert_eq!(ResponseType::from_raw(0x20), Ok(ResponseType::Ack));
        assert_eq!(ResponseType::from_raw(0x40), Ok(ResponseType::Config));
        assert_eq!(
            ResponseType::from_raw(0xa2),
            Ok(ResponseType::RequestSetConfig)
        );
        assert_eq!(
            ResponseType::from_raw(0xa3),
            Ok(ResponseType::RequestSetTime)
        );
        assert!(matches!(
            ResponseType::from_raw(0x00),
            Err(CodecError::ResponseType(0x00))
        ));
    }

    #[test]
    fn test_header_parse() {
        let payload = [0x01, 0x2e, 0xa2, 0x5f, 0x05, 0x1b];
        let hdr = FrameHeader::parse(&payload).expect("valid header");
        assert_eq!(hdr.device_id, DeviceId(0x012e));
        assert_eq!(hdr.response, ResponseType::RequestSetConfig);
        assert_eq!(hdr.quality, 0x5f);
        assert_eq!(hdr.config_checksum, 0x051b);
        assert_eq!(hdr.battery, BatteryFlags(0x02));
    }

    #[test]
    fn test_header_rejects_wrong_length() {
        // An ack must be exactly six bytes.
        let payload = [0x01, 0x2e, 0x20, 0x5f, 0x05, 0x1b, 0x00];
        assert!(matches!(
            FrameHeader::parse(&payload),
            Err(CodecError::Length { expected: 6, .. })
        ));
    }

    #[test]
    fn test_seal_open_round_trip() {
        let payload = [0x01u8, 0x2e, 0x20, 0x64, 0x04, 0xcb];
        let mut out = [0u8; MAX_FRAME_SIZE];
        let n = seal_frame(&payload, &mut out);
        assert_eq!(n, payload.len() + 2);
        let opened = open_frame(&out[..n]).expect("checksum holds");
        assert_eq!(opened, &payload);
    }

    #[test]
    fn test_open_detects_corruption() {
        let payload = [0x01u8, 0x2e, 0x20, 0x64, 0x04, 0xcb];
        let mut out = [0u8; MAX_FRAME_SIZE];
        let n = seal_frame(&payload, &mut out);
        out[3] ^= 0x10;
        assert!(matches!(
            open_frame(&out[..n]),
            Err(CodecError::Checksum { .. })
        ));
    }
}
