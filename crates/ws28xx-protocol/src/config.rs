//! Console configuration image: decoding the GetConfig response and
//! building the SetConfig request.
//!
//! The two directions use different wire layouts. The console reports its
//! settings in a flat forward layout; the SetConfig body instead packs the
//! alarm-threshold block at image bytes 7..38 byte-reversed. Both layouts
//! are driven by the same field helpers so the reversal stays in one place.
//!
//! Checksum: 7 plus the sum of image bytes 0..38, stored big-endian at
//! image bytes 42..43. The `ResetMinMaxFlags` bytes 39..41 are excluded
//! from the sum; they are write-only and read back as zero.

#![deny(static_mut_refs)]

use serde::{Deserialize, Serialize};

use crate::frame::{CodecError, FrameHeader};
use crate::ids::DeviceId;
use crate::nibble::{reverse_bytes, write_bcd, write_hex, Nib};
use crate::values::{self, TEMPERATURE_OFFSET};

/// Wire length of a config frame in either direction.
pub const CONFIG_FRAME_LEN: usize = 0x30;
/// Length of the config image carried after the 4-byte frame header.
pub const SET_CONFIG_IMAGE_LEN: usize = 44;

/// First byte of the reversed block in the SetConfig image.
const REVERSED_BLOCK_START: usize = 7;
/// Length of the reversed block.
const REVERSED_BLOCK_LEN: usize = 32;

/// Wind speed display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindUnit {
    /// Metres per second.
    #[default]
    Ms,
    /// Knots.
    Knots,
    /// Beaufort.
    Beaufort,
    /// Kilometres per hour.
    Kmh,
    /// Miles per hour.
    Mph,
}

impl WindUnit {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => WindUnit::Knots,
            2 => WindUnit::Beaufort,
            3 => WindUnit::Kmh,
            4 => WindUnit::Mph,
            _ => WindUnit::Ms,
        }
    }
    fn raw(self) -> u8 {
        match self {
            WindUnit::Ms => 0,
            WindUnit::Knots => 1,
            WindUnit::Beaufort => 2,
            WindUnit::Kmh => 3,
            WindUnit::Mph => 4,
        }
    }
}

/// Rain display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RainUnit {
    /// Millimetres.
    #[default]
    Mm,
    /// Inches.
    Inch,
}

/// Pressure display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PressureUnit {
    /// Inches of mercury.
    #[default]
    InHg,
    /// Hectopascal.
    Hpa,
}

/// Temperature display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    /// Degrees Fahrenheit.
    #[default]
    Fahrenheit,
    /// Degrees Celsius.
    Celsius,
}

/// Clock display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockMode {
    /// 24-hour display.
    #[default]
    H24,
    /// 12-hour display.
    AmPm,
}

/// Archive recording interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum HistoryInterval {
    Min1,
    Min5,
    Min10,
    Min15,
    Min20,
    Min30,
    Min60,
    H2,
    H4,
    H6,
    H8,
    H12,
    H24,
}

impl HistoryInterval {
    /// All intervals in wire order.
    pub const ALL: [HistoryInterval; 13] = [
        HistoryInterval::Min1,
        HistoryInterval::Min5,
        HistoryInterval::Min10,
        HistoryInterval::Min15,
        HistoryInterval::Min20,
        HistoryInterval::Min30,
        HistoryInterval::Min60,
        HistoryInterval::H2,
        HistoryInterval::H4,
        HistoryInterval::H6,
        HistoryInterval::H8,
        HistoryInterval::H12,
        HistoryInterval::H24,
    ];

    /// Decode the wire nibble.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// The wire nibble.
    pub fn raw(self) -> u8 {
        Self::ALL
            .iter()
            .position(|&i| i == self)
            .unwrap_or_default() as u8
    }

    /// Interval length in minutes.
    pub fn minutes(self) -> u32 {
        match self {
            HistoryInterval::Min1 => 1,
            HistoryInterval::Min5 => 5,
            HistoryInterval::Min10 => 10,
            HistoryInterval::Min15 => 15,
            HistoryInterval::Min20 => 20,
            HistoryInterval::Min30 => 30,
            HistoryInterval::Min60 => 60,
            HistoryInterval::H2 => 120,
            HistoryInterval::H4 => 240,
            HistoryInterval::H6 => 360,
            HistoryInterval::H8 => 480,
            HistoryInterval::H12 => 720,
            HistoryInterval::H24 => 1440,
        }
    }

    /// The interval with exactly this many minutes, if the console supports
    /// it.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.minutes() == minutes)
    }
}

impl Default for HistoryInterval {
    fn default() -> Self {
        HistoryInterval::H2
    }
}

/// A config field that failed its range check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRangeError {
    /// Field name.
    pub field: &'static str,
    /// Offending value.
    pub value: f64,
    /// Allowed minimum.
    pub min: f64,
    /// Allowed maximum.
    pub max: f64,
}

impl std::fmt::Display for ConfigRangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {} outside {}..={}",
            self.field, self.value, self.min, self.max
        )
    }
}

impl std::error::Error for ConfigRangeError {}

/// Mutable image of the console settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Wind speed display unit.
    pub wind_unit: WindUnit,
    /// Rain display unit.
    pub rain_unit: RainUnit,
    /// Pressure display unit.
    pub pressure_unit: PressureUnit,
    /// Temperature display unit.
    pub temperature_unit: TemperatureUnit,
    /// Clock display mode.
    pub clock_mode: ClockMode,
    /// Weather forecast sensitivity, 0..=15.
    pub weather_threshold: u8,
    /// Storm warning sensitivity, 0..=15.
    pub storm_threshold: u8,
    /// LCD contrast, 1..=8.
    pub lcd_contrast: u8,
    /// Low-battery warning mask.
    pub low_battery_mask: u8,
    /// Wind-direction alarm bitmask.
    pub wind_dir_alarm_flags: u16,
    /// Remaining alarm bitmask.
    pub other_alarm_flags: u16,
    /// Indoor temperature alarm low, °C.
    pub temp_indoor_min: f64,
    /// Indoor temperature alarm high, °C.
    pub temp_indoor_max: f64,
    /// Outdoor temperature alarm low, °C.
    pub temp_outdoor_min: f64,
    /// Outdoor temperature alarm high, °C.
    pub temp_outdoor_max: f64,
    /// Indoor humidity alarm low, %.
    pub humidity_indoor_min: u8,
    /// Indoor humidity alarm high, %.
    pub humidity_indoor_max: u8,
    /// Outdoor humidity alarm low, %.
    pub humidity_outdoor_min: u8,
    /// Outdoor humidity alarm high, %.
    pub humidity_outdoor_max: u8,
    /// 24-hour rain alarm threshold, mm.
    pub rain_24h_max: f64,
    /// Gust alarm threshold, m/s.
    pub gust_max: f64,
    /// Pressure alarm low, hPa.
    pub pressure_hpa_min: f64,
    /// Pressure alarm high, hPa.
    pub pressure_hpa_max: f64,
    /// Pressure alarm low, inHg.
    pub pressure_inhg_min: f64,
    /// Pressure alarm high, inHg.
    pub pressure_inhg_max: f64,
    /// Archive recording interval.
    pub history_interval: HistoryInterval,
    /// Min/max reset flags; write-only, always zero on read.
    pub reset_minmax_flags: u32,
    /// Checksum as stored on the wire.
    pub checksum: u16,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            wind_unit: WindUnit::Ms,
            rain_unit: RainUnit::Mm,
            pressure_unit: PressureUnit::Hpa,
            temperature_unit: TemperatureUnit::Celsius,
            clock_mode: ClockMode::H24,
            weather_threshold: 3,
            storm_threshold: 5,
            lcd_contrast: 4,
            low_battery_mask: 0,
            wind_dir_alarm_flags: 0,
            other_alarm_flags: 0,
            temp_indoor_min: 0.0,
            temp_indoor_max: 40.0,
            temp_outdoor_min: -20.0,
            temp_outdoor_max: 50.0,
            humidity_indoor_min: 20,
            humidity_indoor_max: 90,
            humidity_outdoor_min: 20,
            humidity_outdoor_max: 90,
            rain_24h_max: 50.0,
            gust_max: 100.0,
            pressure_hpa_min: 960.0,
            pressure_hpa_max: 1040.0,
            pressure_inhg_min: 28.36,
            pressure_inhg_max: 30.72,
            history_interval: HistoryInterval::default(),
            reset_minmax_flags: 0,
            checksum: 0,
        }
    }
}

fn check(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ConfigRangeError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigRangeError {
            field,
            value,
            min,
            max,
        })
    }
}

impl StationConfig {
    /// Range-check every caller-settable field before a write is queued.
    pub fn validate(&self) -> Result<(), ConfigRangeError> {
        check("lcd_contrast", f64::from(self.lcd_contrast), 1.0, 8.0)?;
        check("temp_indoor_min", self.temp_indoor_min, -40.0, 59.9)?;
        check("temp_indoor_max", self.temp_indoor_max, -40.0, 59.9)?;
        check("temp_outdoor_min", self.temp_outdoor_min, -40.0, 59.9)?;
        check("temp_outdoor_max", self.temp_outdoor_max, -40.0, 59.9)?;
        check(
            "humidity_indoor_min",
            f64::from(self.humidity_indoor_min),
            1.0,
            99.0,
        )?;
        check(
            "humidity_indoor_max",
            f64::from(self.humidity_indoor_max),
            1.0,
            99.0,
        )?;
        check(
            "humidity_outdoor_min",
            f64::from(self.humidity_outdoor_min),
            1.0,
            99.0,
        )?;
        check(
            "humidity_outdoor_max",
            f64::from(self.humidity_outdoor_max),
            1.0,
            99.0,
        )?;
        check("rain_24h_max", self.rain_24h_max, 0.0, 9999.9)?;
        check("gust_max", self.gust_max, 0.0, 180.0)?;
        check("pressure_hpa_min", self.pressure_hpa_min, 920.0, 1080.0)?;
        check("pressure_hpa_max", self.pressure_hpa_max, 920.0, 1080.0)?;
        check("pressure_inhg_min", self.pressure_inhg_min, 27.1, 31.9)?;
        check("pressure_inhg_max", self.pressure_inhg_max, 27.1, 31.9)?;
        Ok(())
    }

    /// The formats byte shared by both layouts.
    fn formats_byte(&self) -> u8 {
        (self.wind_unit.raw() << 4)
            | (u8::from(self.rain_unit == RainUnit::Inch) << 3)
            | (u8::from(self.pressure_unit == PressureUnit::Hpa) << 2)
            | (u8::from(self.temperature_unit == TemperatureUnit::Celsius) << 1)
            | u8::from(self.clock_mode == ClockMode::AmPm)
    }

    fn apply_formats_byte(&mut self, b: u8) {
        self.clock_mode = if b & 0x01 != 0 {
            ClockMode::AmPm
        } else {
            ClockMode::H24
        };
        self.temperature_unit = if b & 0x02 != 0 {
            TemperatureUnit::Celsius
        } else {
            TemperatureUnit::Fahrenheit
        };
        self.pressure_unit = if b & 0x04 != 0 {
            PressureUnit::Hpa
        } else {
            PressureUnit::InHg
        };
        self.rain_unit = if b & 0x08 != 0 {
            RainUnit::Inch
        } else {
            RainUnit::Mm
        };
        self.wind_unit = WindUnit::from_raw(b >> 4);
    }
}

/// Checksum over a config image: 7 plus the sum of bytes 0..38.
pub fn config_checksum(image: &[u8]) -> u16 {
    image[..39]
        .iter()
        .fold(7u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

fn read_reading(r: values::Reading, byte: usize) -> Result<f64, CodecError> {
    r.value().ok_or(CodecError::Nibble(byte))
}

fn read_humidity(image: &[u8], byte: usize) -> Result<u8, CodecError> {
    values::humidity_2_0(image, byte, Nib::Hi)
        .value()
        .map(|v| v as u8)
        .ok_or(CodecError::Nibble(byte))
}

/// Decode a GetConfig response payload (response type `0x40`).
pub fn decode_config(payload: &[u8]) -> Result<(FrameHeader, StationConfig), CodecError> {
    let header = FrameHeader::parse(payload)?;
    let image = &payload[4..];

    let stored = u16::from_be_bytes([image[42], image[43]]);
    let computed = config_checksum(image);
    if stored != computed {
        return Err(CodecError::Checksum { stored, computed });
    }

    let mut cfg = StationConfig::default();
    cfg.apply_formats_byte(image[0]);
    cfg.weather_threshold = image[1] & 0x0f;
    cfg.storm_threshold = image[1] >> 4;
    cfg.lcd_contrast = image[2] & 0x0f;
    cfg.low_battery_mask = image[2] >> 4;
    cfg.wind_dir_alarm_flags = u16::from_be_bytes([image[3], image[4]]);
    cfg.other_alarm_flags = u16::from_be_bytes([image[5], image[6]]);
    cfg.temp_indoor_max = read_reading(values::temperature_5_3(image, 7, Nib::Hi), 7)?;
    cfg.temp_indoor_min = read_reading(values::temperature_5_3(image, 9, Nib::Lo), 9)?;
    cfg.temp_outdoor_max = read_reading(values::temperature_5_3(image, 12, Nib::Hi), 12)?;
    cfg.temp_outdoor_min = read_reading(values::temperature_5_3(image, 14, Nib::Lo), 14)?;
    cfg.humidity_indoor_max = read_humidity(image, 17)?;
    cfg.humidity_indoor_min = read_humidity(image, 18)?;
    cfg.humidity_outdoor_max = read_humidity(image, 19)?;
    cfg.humidity_outdoor_min = read_humidity(image, 20)?;
    cfg.rain_24h_max = read_reading(values::rain_7_3(image, 21, Nib::Lo), 21)?;
    cfg.history_interval =
        HistoryInterval::from_raw(image[25] & 0x0f).ok_or(CodecError::Nibble(25))?;
    cfg.gust_max = read_reading(values::windspeed_5_2(image, 26, Nib::Hi), 26)?;
    let (hpa_min, inhg_min) = values::pressure_shared(image, 29, Nib::Hi);
    let (hpa_max, inhg_max) = values::pressure_shared(image, 34, Nib::Hi);
    cfg.pressure_hpa_min = read_reading(hpa_min, 29)?;
    cfg.pressure_inhg_min = read_reading(inhg_min, 29)?;
    cfg.pressure_hpa_max = read_reading(hpa_max, 34)?;
    cfg.pressure_inhg_max = read_reading(inhg_max, 34)?;
    // Write-only on the console; reads back as zero.
    cfg.reset_minmax_flags = 0;
    cfg.checksum = stored;

    Ok((header, cfg))
}

fn scaled(value: f64, scale: f64) -> u64 {
    (value * scale).round().max(0.0) as u64
}

/// Build the 44-byte SetConfig image for a config.
pub fn encode_set_config_image(cfg: &StationConfig) -> [u8; SET_CONFIG_IMAGE_LEN] {
    let mut image = [0u8; SET_CONFIG_IMAGE_LEN];
    image[0] = cfg.formats_byte();
    image[1] = (cfg.weather_threshold & 0x0f) | (cfg.storm_threshold << 4);
    image[2] = (cfg.lcd_contrast & 0x0f) | (cfg.low_battery_mask << 4);
    image[3] = cfg.other_alarm_flags as u8;
    image[4] = (cfg.other_alarm_flags >> 8) as u8;
    image[5] = cfg.wind_dir_alarm_flags as u8;
    image[6] = (cfg.wind_dir_alarm_flags >> 8) as u8;

    // Alarm-threshold block; the console expects these byte-reversed.
    write_bcd(&mut image, 7, Nib::Hi, 5, scaled(cfg.pressure_inhg_max, 100.0));
    write_bcd(&mut image, 9, Nib::Lo, 5, scaled(cfg.pressure_hpa_max, 10.0));
    write_bcd(&mut image, 12, Nib::Hi, 5, scaled(cfg.pressure_inhg_min, 100.0));
    write_bcd(&mut image, 14, Nib::Lo, 5, scaled(cfg.pressure_hpa_min, 10.0));
    write_hex(&mut image, 17, Nib::Hi, 4, scaled(cfg.gust_max, 100.0) & 0xffff);
    image[20] = cfg.history_interval.raw();
    write_bcd(&mut image, 21, Nib::Lo, 7, scaled(cfg.rain_24h_max, 1000.0));
    write_bcd(&mut image, 25, Nib::Hi, 2, u64::from(cfg.humidity_outdoor_max));
    write_bcd(&mut image, 26, Nib::Hi, 2, u64::from(cfg.humidity_outdoor_min));
    write_bcd(&mut image, 27, Nib::Hi, 2, u64::from(cfg.humidity_indoor_max));
    write_bcd(&mut image, 28, Nib::Hi, 2, u64::from(cfg.humidity_indoor_min));
    write_bcd(
        &mut image,
        29,
        Nib::Hi,
        5,
        scaled(cfg.temp_outdoor_max + TEMPERATURE_OFFSET, 1000.0),
    );
    write_bcd(
        &mut image,
        31,
        Nib::Lo,
        5,
        scaled(cfg.temp_outdoor_min + TEMPERATURE_OFFSET, 1000.0),
    );
    write_bcd(
        &mut image,
        34,
        Nib::Hi,
        5,
        scaled(cfg.temp_indoor_max + TEMPERATURE_OFFSET, 1000.0),
    );
    write_bcd(
        &mut image,
        36,
        Nib::Lo,
        5,
        scaled(cfg.temp_indoor_min + TEMPERATURE_OFFSET, 1000.0),
    );
    reverse_bytes(&mut image, REVERSED_BLOCK_START, REVERSED_BLOCK_LEN);

    // Excluded from the checksum.
    image[39] = (cfg.reset_minmax_flags >> 16) as u8;
    image[40] = (cfg.reset_minmax_flags >> 8) as u8;
    image[41] = cfg.reset_minmax_flags as u8;

    let cs = config_checksum(&image);
    image[42..44].copy_from_slice(&cs.to_be_bytes());
    image
}

/// Build a complete SetConfig frame payload for the paired console.
pub fn encode_set_config(device_id: DeviceId, cfg: &StationConfig) -> [u8; CONFIG_FRAME_LEN] {
    let mut payload = [0u8; CONFIG_FRAME_LEN];
    payload[0..2].copy_from_slice(&device_id.0.to_be_bytes());
    payload[2] = 0x40;
    payload[3] = 0x64;
    payload[4..].copy_from_slice(&encode_set_config_image(cfg));
    payload
}

/// Decode a SetConfig image back into a config. Exact inverse of
/// [`encode_set_config_image`] except that `reset_minmax_flags` reads back
/// as zero, mirroring the console.
pub fn decode_set_config_image(image_in: &[u8]) -> Result<StationConfig, CodecError> {
    if image_in.len() != SET_CONFIG_IMAGE_LEN {
        return Err(CodecError::Length {
            expected: SET_CONFIG_IMAGE_LEN,
            actual: image_in.len(),
        });
    }
    let stored = u16::from_be_bytes([image_in[42], image_in[43]]);
    let computed = config_checksum(image_in);
    if stored != computed {
        return Err(CodecError::Checksum { stored, computed });
    }

    let mut image = [0u8; SET_CONFIG_IMAGE_LEN];
    image.copy_from_slice(image_in);
    reverse_bytes(&mut image, REVERSED_BLOCK_START, REVERSED_BLOCK_LEN);

    let mut cfg = StationConfig::default();
    cfg.apply_formats_byte(image[0]);
    cfg.weather_threshold = image[1] & 0x0f;
    cfg.storm_threshold = image[1] >> 4;
    cfg.lcd_contrast = image[2] & 0x0f;
    cfg.low_battery_mask = image[2] >> 4;
    cfg.other_alarm_flags = u16::from_le_bytes([image[3], image[4]]);
    cfg.wind_dir_alarm_flags = u16::from_le_bytes([image[5], image[6]]);
    cfg.pressure_inhg_max = read_reading(values::pressure_inhg_5_2(&image, 7, Nib::Hi), 7)?;
    cfg.pressure_hpa_max = read_reading(values::pressure_hpa_5_1(&image, 9, Nib::Lo), 9)?;
    cfg.pressure_inhg_min = read_reading(values::pressure_inhg_5_2(&image, 12, Nib::Hi), 12)?;
    cfg.pressure_hpa_min = read_reading(values::pressure_hpa_5_1(&image, 14, Nib::Lo), 14)?;
    cfg.gust_max = f64::from(u16::from_be_bytes([image[17], image[18]])) / 100.0;
    cfg.history_interval =
        HistoryInterval::from_raw(image[20] & 0x0f).ok_or(CodecError::Nibble(20))?;
    cfg.rain_24h_max = read_reading(values::rain_7_3(&image, 21, Nib::Lo), 21)?;
    cfg.humidity_outdoor_max = read_humidity(&image, 25)?;
    cfg.humidity_outdoor_min = read_humidity(&image, 26)?;
    cfg.humidity_indoor_max = read_humidity(&image, 27)?;
    cfg.humidity_indoor_min = read_humidity(&image, 28)?;
    cfg.temp_outdoor_max = read_reading(values::temperature_5_3(&image, 29, Nib::Hi), 29)?;
    cfg.temp_outdoor_min = read_reading(values::temperature_5_3(&image, 31, Nib::Lo), 31)?;
    cfg.temp_indoor_max = read_reading(values::temperature_5_3(&image, 34, Nib::Hi), 34)?;
    cfg.temp_indoor_min = read_reading(values::temperature_5_3(&image, 36, Nib::Lo), 36)?;
    cfg.reset_minmax_flags = 0;
    cfg.checksum = stored;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_interval_minutes() {
        assert_eq!(HistoryInterval::Min1.minutes(), 1);
        assert_eq!(HistoryInterval::H24.minutes(), 1440);
        assert_eq!(HistoryInterval::from_minutes(120), Some(HistoryInterval::H2));
        assert_eq!(HistoryInterval::from_minutes(7), None);
        for interval in HistoryInterval::ALL {
            assert_eq!(HistoryInterval::from_raw(interval.raw()), Some(interval));
        }
        assert_eq!(HistoryInterval::from_raw(0x0d), None);
    }

    #[test]
    fn test_validate_ranges() {
        let mut cfg = StationConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.lcd_contrast = 9;
        let err = cfg.validate().expect_err("contrast out of range");
        assert_eq!(err.field, "lcd_contrast");

        cfg.lcd_contrast = 4;
        cfg.humidity_outdoor_min = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_formats_byte_round_trip() {
        let cfg = StationConfig {
            wind_unit: WindUnit::Kmh,
            rain_unit: RainUnit::Inch,
            pressure_unit: PressureUnit::Hpa,
            temperature_unit: TemperatureUnit::Celsius,
            clock_mode: ClockMode::AmPm,
            ..StationConfig::default()
        };
        let b = cfg.formats_byte();
        assert_eq!(b, 0x3f);
        let mut other = StationConfig::default();
        other.apply_formats_byte(b);
        assert_eq!(other.wind_unit, WindUnit::Kmh);
        assert_eq!(other.rain_unit, RainUnit::Inch);
        assert_eq!(other.clock_mode, ClockMode::AmPm);
    }

    #[test]
    fn test_checksum_excludes_reset_flags() {
        let cfg = StationConfig {
            reset_minmax_flags: 0x00ff40,
            ..StationConfig::default()
        };
        let with_flags = encode_set_config_image(&cfg);
        let without = encode_set_config_image(&StationConfig::default());
        assert_eq!(with_flags[42..44], without[42..44]);
    }

    #[test]
    fn test_set_config_round_trip_basic() {
        let cfg = StationConfig {
            temp_outdoor_min: 2.0,
            temp_outdoor_max: 42.0,
            ..StationConfig::default()
        };
        let image = encode_set_config_image(&cfg);
        let decoded = decode_set_config_image(&image).expect("image decodes");
        assert_eq!(decoded.temp_outdoor_min, 2.0);
        assert_eq!(decoded.temp_outdoor_max, 42.0);
        assert_eq!(decoded.history_interval, cfg.history_interval);
    }
}
