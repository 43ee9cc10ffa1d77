//! Typed decoders for the nibble-packed value kinds shared by every frame.
//!
//! Each physical quantity has a fixed digit count and decimal scale on the
//! wire. Sensor absence and range overflow are in-band: BCD digits 10..=14
//! mean "no reading", 15 means overflow. The ring-buffer (history) variants
//! of wind and rain use hex digits with dedicated `0xffe`/`0xfff` sentinels
//! instead.

#![deny(static_mut_refs)]

use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::nibble::{bcd_value, hex_value, read_digits, Nib, NibbleReader};

/// Offset added to every temperature before packing, so the wire value is
/// non-negative.
pub const TEMPERATURE_OFFSET: f64 = 40.0;

/// One decoded sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    /// A valid measurement.
    Value(f64),
    /// Sensor absent or not reporting.
    Absent,
    /// Measurement out of the displayable range.
    Overflow,
}

impl Reading {
    /// The measurement, if valid.
    pub fn value(self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True when no sensor was reporting.
    pub fn is_absent(self) -> bool {
        matches!(self, Reading::Absent)
    }

    /// True when the measurement overflowed its range.
    pub fn is_overflow(self) -> bool {
        matches!(self, Reading::Overflow)
    }

    fn from_digits(err: bool, ofl: bool, value: f64) -> Reading {
        if err {
            Reading::Absent
        } else if ofl {
            Reading::Overflow
        } else {
            Reading::Value(value)
        }
    }
}

/// A min/max pair with the timestamps at which the extremes were observed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MinMax {
    /// Lowest observed value.
    pub min: Extreme,
    /// Highest observed value.
    pub max: Extreme,
}

/// One extreme of a [`MinMax`] pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    /// The extreme value.
    pub value: Reading,
    /// When it was observed; `None` when the value is a sentinel or the
    /// console reported a bogus date.
    pub time: Option<NaiveDateTime>,
}

impl Default for Extreme {
    fn default() -> Self {
        Extreme {
            value: Reading::Absent,
            time: None,
        }
    }
}

impl Extreme {
    /// Build an extreme, dropping the timestamp for sentinel values.
    pub fn new(value: Reading, time: Option<NaiveDateTime>) -> Self {
        let time = if value.value().is_some() { time } else { None };
        Extreme { value, time }
    }
}

/// One of the 16 compass points, or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindDirection(pub u8);

impl WindDirection {
    /// The invalid direction the console reports when wind data is missing.
    pub const INVALID: WindDirection = WindDirection(16);

    /// Direction from a raw nibble; anything above 15 is invalid.
    pub fn from_nibble(n: u8) -> Self {
        if n <= 15 {
            WindDirection(n)
        } else {
            WindDirection::INVALID
        }
    }

    /// Compass-point name, `-` when invalid.
    pub fn compass(self) -> &'static str {
        const NAMES: [&str; 16] = [
            "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
            "NW", "NNW",
        ];
        NAMES.get(self.0 as usize).copied().unwrap_or("-")
    }

    /// Direction in degrees, `None` when invalid.
    pub fn degrees(self) -> Option<f64> {
        (self.0 < 16).then(|| f64::from(self.0) * 360.0 / 16.0)
    }
}

/// Battery-low flags from the frame header: console, thermo-hygro, rain,
/// wind, and solar sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatteryFlags(pub u8);

impl BatteryFlags {
    /// Console display battery low.
    pub fn console(self) -> bool {
        self.0 & 0x08 != 0
    }
    /// Thermo-hygro sensor battery low.
    pub fn thermo_hygro(self) -> bool {
        self.0 & 0x01 != 0
    }
    /// Rain sensor battery low.
    pub fn rain(self) -> bool {
        self.0 & 0x02 != 0
    }
    /// Wind sensor battery low.
    pub fn wind(self) -> bool {
        self.0 & 0x04 != 0
    }
}

/// Temperature, five BCD digits scaled by 1000, minus the 40 °C offset.
///
/// The offset is subtracted before the division so values land exactly on
/// the 0.001 °C grid.
pub fn temperature_5_3(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<5>(buf, byte, half);
    let raw = bcd_value(&digits) as f64 - TEMPERATURE_OFFSET * 1000.0;
    Reading::from_digits(err, ofl, raw / 1000.0)
}

/// Ring-buffer temperature, three BCD digits scaled by 10, minus the offset.
pub fn temperature_3_1(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<3>(buf, byte, half);
    let raw = bcd_value(&digits) as f64 - TEMPERATURE_OFFSET * 10.0;
    Reading::from_digits(err, ofl, raw / 10.0)
}

/// Relative humidity, two BCD digits.
pub fn humidity_2_0(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<2>(buf, byte, half);
    Reading::from_digits(err, ofl, bcd_value(&digits) as f64)
}

/// Rain total, seven BCD digits with three decimals (mm).
pub fn rain_7_3(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<7>(buf, byte, half);
    Reading::from_digits(err, ofl, bcd_value(&digits) as f64 / 1000.0)
}

/// Rain counter, six BCD digits with two decimals (mm).
pub fn rain_6_2(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<6>(buf, byte, half);
    Reading::from_digits(err, ofl, bcd_value(&digits) as f64 / 100.0)
}

/// Ring-buffer rain counter, three hex digits with one decimal;
/// `0xffe` = absent, `0xfff` = overflow.
pub fn rain_3_1(buf: &[u8], byte: usize, half: Nib) -> Reading {
    hex_3_1(buf, byte, half)
}

/// Ring-buffer wind speed, three hex digits with one decimal (m/s);
/// `0xffe` = absent, `0xfff` = overflow.
pub fn windspeed_3_1(buf: &[u8], byte: usize, half: Nib) -> Reading {
    hex_3_1(buf, byte, half)
}

fn hex_3_1(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, _, _) = read_digits::<3>(buf, byte, half);
    match hex_value(&digits) {
        0xffe => Reading::Absent,
        0xfff => Reading::Overflow,
        raw => Reading::Value(raw as f64 / 10.0),
    }
}

/// Current-weather wind speed: five hex nibbles with two decimals (m/s).
///
/// The console stores the most significant digit in the trailing nibble
/// position; the remaining four follow wire order.
pub fn windspeed_5_2(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<5>(buf, byte, half);
    if err || ofl {
        return Reading::from_digits(err, ofl, 0.0);
    }
    let v = hex_value(&[digits[4], digits[0], digits[1], digits[2], digits[3]]);
    Reading::Value(v as f64 / 100.0)
}

/// Relative pressure in hPa, five BCD digits with one decimal.
pub fn pressure_hpa_5_1(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<5>(buf, byte, half);
    Reading::from_digits(err, ofl, bcd_value(&digits) as f64 / 10.0)
}

/// Relative pressure in inHg, five BCD digits with two decimals.
pub fn pressure_inhg_5_2(buf: &[u8], byte: usize, half: Nib) -> Reading {
    let (digits, err, ofl) = read_digits::<5>(buf, byte, half);
    Reading::from_digits(err, ofl, bcd_value(&digits) as f64 / 100.0)
}

/// The shared 5-byte pressure group: inHg at `(byte, half)` and hPa two
/// bytes further on the flipped half. Returns `(hpa, inhg)`.
pub fn pressure_shared(buf: &[u8], byte: usize, half: Nib) -> (Reading, Reading) {
    (
        pressure_hpa_5_1(buf, byte + 2, half.flipped()),
        pressure_inhg_5_2(buf, byte, half),
    )
}

/// Two-digit BCD integer.
pub fn int_2(buf: &[u8], byte: usize, half: Nib) -> u8 {
    let (digits, _, _) = read_digits::<2>(buf, byte, half);
    bcd_value(&digits) as u8
}

/// Console timestamp: ten BCD nibbles YYMMDDHHmm with the year offset 2000.
///
/// Returns `None` when any digit carries a sentinel or the fields do not
/// form a real calendar date (some firmware revisions store garbage in
/// unused slots).
pub fn datetime_10(buf: &[u8], byte: usize, half: Nib) -> Option<NaiveDateTime> {
    let (_, err, ofl) = read_digits::<10>(buf, byte, half);
    if err || ofl {
        return None;
    }
    let mut rd = NibbleReader::new(buf, byte, half);
    let mut field = || {
        let hi = rd.next();
        let lo = rd.next();
        u32::from(hi) * 10 + u32::from(lo)
    };
    let year = field() + 2000;
    let month = field();
    let day = field();
    let hour = field();
    let minute = field();
    NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, minute, 0)
}

/// The wind-direction pair packed into one byte: current direction in the
/// low nibble, the previous one in the high nibble.
pub fn wind_direction_pair(buf: &[u8], byte: usize) -> (WindDirection, WindDirection) {
    (
        WindDirection::from_nibble(buf[byte] & 0x0f),
        WindDirection::from_nibble(buf[byte] >> 4),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_5_3() {
        // 63.500 - 40.0 = 23.5, lo-aligned as in the current-weather frame.
        let buf = [0x06, 0x35, 0x00];
        let t = temperature_5_3(&buf, 0, Nib::Lo);
        assert_eq!(t, Reading::Value(23.5));
    }

    #[test]
    fn test_temperature_sentinels() {
        assert_eq!(temperature_5_3(&[0xff, 0xff, 0xff], 0, Nib::Hi), Reading::Overflow);
        assert_eq!(temperature_5_3(&[0xaa, 0xaa, 0xaa], 0, Nib::Hi), Reading::Absent);
    }

    #[test]
    fn test_temperature_3_1() {
        // History record layout: 53.7 - 40.0 = 13.7 hi-aligned.
        let buf = [0x53, 0x76];
        assert_eq!(temperature_3_1(&buf, 0, Nib::Hi), Reading::Value(13.7));
        // 63.5 - 40.0 = 23.5 lo-aligned.
        assert_eq!(temperature_3_1(&buf, 0, Nib::Lo), Reading::Value(-2.4));
    }

    #[test]
    fn test_humidity() {
        assert_eq!(humidity_2_0(&[0x86], 0, Nib::Hi), Reading::Value(86.0));
        assert_eq!(humidity_2_0(&[0x8f], 0, Nib::Hi), Reading::Overflow);
        assert_eq!(humidity_2_0(&[0x8a], 0, Nib::Hi), Reading::Absent);
    }

    #[test]
    fn test_pressure_hpa() {
        // 1019.2 hPa lo-aligned, as in the history record.
        let buf = [0x01, 0x01, 0x92];
        assert_eq!(pressure_hpa_5_1(&buf, 0, Nib::Lo), Reading::Value(1019.2));
    }

    #[test]
    fn test_rain_6_2() {
        // 0.51 mm hi-aligned.
        let buf = [0x00, 0x00, 0x51];
        assert_eq!(rain_6_2(&buf, 0, Nib::Hi), Reading::Value(0.51));
    }

    #[test]
    fn test_hex_3_1_sentinels() {
        assert_eq!(windspeed_3_1(&[0xff, 0xe0], 0, Nib::Hi), Reading::Absent);
        assert_eq!(windspeed_3_1(&[0xff, 0xf0], 0, Nib::Hi), Reading::Overflow);
        // 0x00c = 12 -> 1.2 m/s.
        assert_eq!(windspeed_3_1(&[0x00, 0xc0], 0, Nib::Hi), Reading::Value(1.2));
        // Lo-aligned, as stored in the history record.
        assert_eq!(windspeed_3_1(&[0x00, 0x0c], 0, Nib::Lo), Reading::Value(1.2));
    }

    #[test]
    fn test_datetime() {
        // 2013-06-24 09:10, hi-aligned.
        let buf = [0x13, 0x06, 0x24, 0x09, 0x10];
        let dt = datetime_10(&buf, 0, Nib::Hi).expect("valid date");
        assert_eq!(dt.to_string(), "2013-06-24 09:10:00");

        // Month zero is not a date.
        let buf = [0x13, 0x00, 0x24, 0x09, 0x10];
        assert!(datetime_10(&buf, 0, Nib::Hi).is_none());
    }

    #[test]
    fn test_wind_direction() {
        let (cur, prev) = wind_direction_pair(&[0x7b], 0);
        assert_eq!(cur, WindDirection(11));
        assert_eq!(cur.compass(), "WSW");
        assert_eq!(prev, WindDirection(7));
        assert_eq!(prev.compass(), "SSE");
        assert_eq!(WindDirection::INVALID.compass(), "-");
        assert_eq!(WindDirection(4).degrees(), Some(90.0));
    }

    #[test]
    fn test_battery_flags() {
        let b = BatteryFlags(0x09);
        assert!(b.console());
        assert!(b.thermo_hygro());
        assert!(!b.rain());
        assert!(!b.wind());
    }
}
