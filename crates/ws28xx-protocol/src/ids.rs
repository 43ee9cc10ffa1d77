//! USB identifiers, dongle message ids, and the AX5051 initialization table.

#![deny(static_mut_refs)]

/// USB vendor id of the transceiver dongle.
pub const VENDOR_ID: u16 = 0x6666;
/// USB product id of the transceiver dongle.
pub const PRODUCT_ID: u16 = 0x5555;

/// Device id a console uses before it has been paired.
pub const BROADCAST_ID: u16 = 0xf0f0;

/// 16-bit console-assigned identifier carried in every frame.
///
/// Zero means "not yet paired"; the driver never emits a frame with a zero
/// id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DeviceId(pub u16);

impl DeviceId {
    /// The unset id.
    pub const UNSET: DeviceId = DeviceId(0);

    /// True once a real id has been assigned.
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Dongle control-message ids (first byte of every control transfer).
pub mod msg {
    /// Switch the RF section to receive.
    pub const SET_RX: u8 = 0xd0;
    /// Switch the RF section to transmit.
    pub const SET_TX: u8 = 0xd1;
    /// Write a frame buffer to the dongle.
    pub const SET_FRAME: u8 = 0xd5;
    /// Read a frame buffer from the dongle.
    pub const GET_FRAME: u8 = 0xd6;
    /// Set the dongle state byte.
    pub const SET_STATE: u8 = 0xd7;
    /// Program the RF preamble pattern.
    pub const SET_PREAMBLE_PATTERN: u8 = 0xd8;
    /// Execute a dongle command (0x05 arms the receiver).
    pub const EXECUTE: u8 = 0xd9;
    /// EEPROM read, response direction.
    pub const READ_CONFIG_FLASH_IN: u8 = 0xdc;
    /// EEPROM read, request direction.
    pub const READ_CONFIG_FLASH_OUT: u8 = 0xdd;
    /// Poll the dongle state.
    pub const GET_STATE: u8 = 0xde;
    /// Write an AX5051 register.
    pub const WRITE_REG: u8 = 0xf0;
}

/// Dongle state byte returned by `GET_STATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DongleState {
    /// Between preamble programming and first sync (0x14).
    Initialising,
    /// Receiver armed, no frame pending (0x15).
    Idle,
    /// A frame is ready to be read (0x16).
    DataAvailable,
    /// Any other value the dongle reports.
    Other(u8),
}

impl DongleState {
    /// Decode the raw state byte.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x14 => DongleState::Initialising,
            0x15 => DongleState::Idle,
            0x16 => DongleState::DataAvailable,
            other => DongleState::Other(other),
        }
    }
}

/// EEPROM address holding the serial number and device id.
pub const EEPROM_IDENT_ADDR: u16 = 0x1f9;
/// EEPROM address holding the 32-bit frequency correction.
pub const EEPROM_FREQ_CORRECTION_ADDR: u16 = 0x1f5;

/// Receiver-arm command for `EXECUTE`.
pub const EXECUTE_ARM_RECEIVER: u8 = 0x05;
/// RF preamble pattern used by the WS-28xx family.
pub const PREAMBLE_PATTERN: u8 = 0xaa;

/// AX5051 register addresses written during transceiver init.
#[allow(missing_docs)]
pub mod reg {
    pub const IFMODE: u8 = 0x08;
    pub const MODULATION: u8 = 0x10;
    pub const ENCODING: u8 = 0x11;
    pub const FRAMING: u8 = 0x12;
    pub const CRCINIT3: u8 = 0x14;
    pub const CRCINIT2: u8 = 0x15;
    pub const CRCINIT1: u8 = 0x16;
    pub const CRCINIT0: u8 = 0x17;
    pub const FREQ3: u8 = 0x20;
    pub const FREQ2: u8 = 0x21;
    pub const FREQ1: u8 = 0x22;
    pub const FREQ0: u8 = 0x23;
    pub const FSKDEV2: u8 = 0x25;
    pub const FSKDEV1: u8 = 0x26;
    pub const FSKDEV0: u8 = 0x27;
    pub const IFFREQHI: u8 = 0x28;
    pub const IFFREQLO: u8 = 0x29;
    pub const PLLLOOP: u8 = 0x2c;
    pub const PLLRANGING: u8 = 0x2d;
    pub const PLLRNGCLK: u8 = 0x2e;
    pub const TXPWR: u8 = 0x30;
    pub const TXRATEHI: u8 = 0x31;
    pub const TXRATEMID: u8 = 0x32;
    pub const TXRATELO: u8 = 0x33;
    pub const MODMISC: u8 = 0x34;
    pub const ADCMISC: u8 = 0x38;
    pub const AGCTARGET: u8 = 0x39;
    pub const AGCATTACK: u8 = 0x3a;
    pub const AGCDECAY: u8 = 0x3b;
    pub const CICDEC: u8 = 0x3f;
    pub const DATARATEHI: u8 = 0x40;
    pub const DATARATELO: u8 = 0x41;
    pub const TMGGAINHI: u8 = 0x42;
    pub const TMGGAINLO: u8 = 0x43;
    pub const PHASEGAIN: u8 = 0x44;
    pub const FREQGAIN: u8 = 0x45;
    pub const FREQGAIN2: u8 = 0x46;
    pub const AMPLGAIN: u8 = 0x47;
    pub const SPAREOUT: u8 = 0x60;
    pub const TESTOBS: u8 = 0x68;
    pub const APEOVER: u8 = 0x70;
    pub const TMMUX: u8 = 0x71;
    pub const PLLVCOI: u8 = 0x72;
    pub const PLLCPEN: u8 = 0x73;
    pub const AGCMANUAL: u8 = 0x78;
    pub const ADCDCLEVEL: u8 = 0x79;
    pub const RFMISC: u8 = 0x7a;
    pub const TXDRIVER: u8 = 0x7b;
    pub const REF: u8 = 0x7c;
    pub const RXMISC: u8 = 0x7d;
}

/// Fixed AX5051 initialization table: FSK modulation, HDLC-style framing,
/// IF/AFC, RX and TX data rates, and driver settings.
///
/// The four FREQ registers hold placeholder values for the US band; the
/// transceiver controller overwrites them with the tuned frequency before
/// writing the table.
pub const AX5051_INIT_TABLE: [(u8, u8); 50] = [
    (reg::IFMODE, 0x00),
    (reg::MODULATION, 0x41),
    (reg::ENCODING, 0x07),
    (reg::FRAMING, 0x84),
    (reg::CRCINIT3, 0xff),
    (reg::CRCINIT2, 0xff),
    (reg::CRCINIT1, 0xff),
    (reg::CRCINIT0, 0xff),
    (reg::FREQ3, 0x38),
    (reg::FREQ2, 0x90),
    (reg::FREQ1, 0x00),
    (reg::FREQ0, 0x01),
    (reg::PLLLOOP, 0x1d),
    (reg::PLLRANGING, 0x08),
    (reg::PLLRNGCLK, 0x03),
    (reg::MODMISC, 0x03),
    (reg::SPAREOUT, 0x00),
    (reg::TESTOBS, 0x00),
    (reg::APEOVER, 0x00),
    (reg::TMMUX, 0x00),
    (reg::PLLVCOI, 0x01),
    (reg::PLLCPEN, 0x01),
    (reg::RFMISC, 0xb0),
    (reg::REF, 0x23),
    (reg::IFFREQHI, 0x20),
    (reg::IFFREQLO, 0x00),
    (reg::ADCMISC, 0x01),
    (reg::AGCTARGET, 0x0e),
    (reg::AGCATTACK, 0x11),
    (reg::AGCDECAY, 0x0e),
    (reg::CICDEC, 0x3f),
    (reg::DATARATEHI, 0x19),
    (reg::DATARATELO, 0x66),
    (reg::TMGGAINHI, 0x01),
    (reg::TMGGAINLO, 0x96),
    (reg::PHASEGAIN, 0x03),
    (reg::FREQGAIN, 0x04),
    (reg::FREQGAIN2, 0x0a),
    (reg::AMPLGAIN, 0x06),
    (reg::AGCMANUAL, 0x00),
    (reg::ADCDCLEVEL, 0x10),
    (reg::RXMISC, 0x35),
    (reg::FSKDEV2, 0x00),
    (reg::FSKDEV1, 0x31),
    (reg::FSKDEV0, 0x27),
    (reg::TXPWR, 0x03),
    (reg::TXRATEHI, 0x00),
    (reg::TXRATEMID, 0x51),
    (reg::TXRATELO, 0xec),
    (reg::TXDRIVER, 0x88),
];

/// Base RF frequency in Hz for a region, before EEPROM correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Region {
    /// 905.0 MHz band.
    Us,
    /// 868.3 MHz band.
    Eu,
}

impl Region {
    /// Nominal frequency for this region in Hz.
    pub fn base_frequency_hz(self) -> u32 {
        match self {
            Region::Us => 905_000_000,
            Region::Eu => 868_300_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dongle_state_decode() {
        assert_eq!(DongleState::from_raw(0x14), DongleState::Initialising);
        assert_eq!(DongleState::from_raw(0x15), DongleState::Idle);
        assert_eq!(DongleState::from_raw(0x16), DongleState::DataAvailable);
        assert_eq!(DongleState::from_raw(0x0b), DongleState::Other(0x0b));
    }

    #[test]
    fn test_register_table_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for (addr, _) in AX5051_INIT_TABLE {
            assert!(seen.insert(addr), "register {addr:#04x} listed twice");
        }
    }

    #[test]
    fn test_device_id() {
        assert!(!DeviceId::UNSET.is_set());
        assert!(DeviceId(0x012e).is_set());
        assert_eq!(DeviceId(0x012e).to_string(), "0x012e");
    }
}
