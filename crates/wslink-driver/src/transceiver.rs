//! Transceiver controller: one-shot dongle initialization.
//!
//! Reads the EEPROM identity block, tunes the AX5051 to the region
//! frequency corrected by the factory calibration, writes the fixed
//! register table and arms the receiver. Idempotent; runs once per driver
//! lifetime.

use tracing::{debug, info};
use wslink_errors::DriverError;
use wslink_hid_common::{Transport, UsbControl};
use wslink_ws28xx_protocol::ids::{
    reg, Region, DeviceId, AX5051_INIT_TABLE, EEPROM_FREQ_CORRECTION_ADDR, EEPROM_IDENT_ADDR,
    EXECUTE_ARM_RECEIVER, PREAMBLE_PATTERN,
};

/// Immutable transceiver identity, read once at init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiverInfo {
    /// 14-digit serial number.
    pub serial: String,
    /// Device id burned into the dongle EEPROM.
    pub device_id: DeviceId,
    /// Signed frequency correction from factory calibration, Hz.
    pub frequency_correction: i32,
    /// Tuned RF frequency after correction, Hz.
    pub frequency_hz: u32,
}

/// Sign-extend the 24-bit EEPROM correction field.
fn correction_from_bytes(bytes: &[u8]) -> i32 {
    let raw = (u32::from(bytes[1]) << 16) | (u32::from(bytes[2]) << 8) | u32::from(bytes[3]);
    if raw & 0x80_0000 != 0 {
        (raw | 0xff00_0000) as i32
    } else {
        raw as i32
    }
}

/// AX5051 frequency word for a tuned frequency: `freq / 16 MHz * 2^24`,
/// forced odd as the chip requires.
pub fn frequency_words(frequency_hz: u32) -> u32 {
    let mut words = (f64::from(frequency_hz) / 16_000_000.0 * 16_777_216.0).round() as u32;
    if words % 2 == 0 {
        words += 1;
    }
    words
}

/// Run the init sequence and return the dongle identity.
pub fn initialize<C: UsbControl>(
    transport: &mut Transport<C>,
    region: Region,
) -> Result<TransceiverInfo, DriverError> {
    let map_err = |e: wslink_hid_common::TransportError| DriverError::Transport(e.to_string());

    let ident = transport
        .read_config_flash(EEPROM_IDENT_ADDR, 7)
        .map_err(map_err)?;
    if ident.len() < 7 {
        return Err(DriverError::Transport(format!(
            "short EEPROM identity block ({} bytes)",
            ident.len()
        )));
    }
    let device_id = DeviceId((u16::from(ident[5]) << 8) | u16::from(ident[6]));
    let serial: String = ident.iter().map(|b| format!("{b:02}")).collect();
    info!(%device_id, %serial, "transceiver identity");

    let correction_bytes = transport
        .read_config_flash(EEPROM_FREQ_CORRECTION_ADDR, 4)
        .map_err(map_err)?;
    if correction_bytes.len() < 4 {
        return Err(DriverError::Transport(format!(
            "short EEPROM correction block ({} bytes)",
            correction_bytes.len()
        )));
    }
    let correction = correction_from_bytes(&correction_bytes);
    let frequency_hz = region
        .base_frequency_hz()
        .saturating_add_signed(correction);
    let words = frequency_words(frequency_hz);
    info!(frequency_hz, correction, words, "tuned frequency");

    for (addr, value) in AX5051_INIT_TABLE {
        let value = match addr {
            reg::FREQ3 => (words >> 24) as u8,
            reg::FREQ2 => (words >> 16) as u8,
            reg::FREQ1 => (words >> 8) as u8,
            reg::FREQ0 => words as u8,
            _ => value,
        };
        transport.write_register(addr, value).map_err(map_err)?;
    }
    debug!("register table written");

    transport.execute(EXECUTE_ARM_RECEIVER).map_err(map_err)?;
    transport
        .set_preamble_pattern(PREAMBLE_PATTERN)
        .map_err(map_err)?;
    transport.set_state(0x1e).map_err(map_err)?;
    transport.set_rx().map_err(map_err)?;

    Ok(TransceiverInfo {
        serial,
        device_id,
        frequency_correction: correction,
        frequency_hz,
    })
}
