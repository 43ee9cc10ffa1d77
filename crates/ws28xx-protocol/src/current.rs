//! Current-weather frame decoding.
//!
//! The 215-byte frame packs every quantity the console displays, most with
//! min/max values and the timestamps at which the extremes occurred. Field
//! placement follows the console's layout; offsets below are byte positions
//! in the frame payload.

#![deny(static_mut_refs)]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::frame::{CodecError, FrameHeader};
use crate::nibble::Nib;
use crate::values::{self, Extreme, MinMax, Reading, WindDirection};

/// Wire length of a current-weather frame.
pub const CURRENT_FRAME_LEN: usize = 0xd7;

/// Sky state shown by the console's forecast icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherState {
    /// Rainy.
    Bad,
    /// Cloudy.
    Neutral,
    /// Sunny.
    Good,
    /// Not reported.
    Unknown,
}

impl WeatherState {
    fn from_nibble(n: u8) -> Self {
        match n {
            0 => WeatherState::Bad,
            1 => WeatherState::Neutral,
            2 => WeatherState::Good,
            _ => WeatherState::Unknown,
        }
    }

    /// Display label matching the console manual.
    pub fn label(self) -> &'static str {
        match self {
            WeatherState::Bad => "rainy",
            WeatherState::Neutral => "cloudy",
            WeatherState::Good => "sunny",
            WeatherState::Unknown => "unknown",
        }
    }
}

/// Pressure trend shown by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherTendency {
    /// Stable.
    Neutral,
    /// Rising.
    Up,
    /// Falling.
    Down,
    /// Not reported.
    Unknown,
}

impl WeatherTendency {
    fn from_nibble(n: u8) -> Self {
        match n {
            0 => WeatherTendency::Neutral,
            1 => WeatherTendency::Up,
            2 => WeatherTendency::Down,
            _ => WeatherTendency::Unknown,
        }
    }

    /// Display label matching the console manual.
    pub fn label(self) -> &'static str {
        match self {
            WeatherTendency::Neutral => "stable",
            WeatherTendency::Up => "rising",
            WeatherTendency::Down => "falling",
            WeatherTendency::Unknown => "unknown",
        }
    }
}

/// A rain counter with its maximum and the time of the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainCounter {
    /// Current counter value, mm.
    pub total: Reading,
    /// Highest value since reset, mm.
    pub max: Reading,
    /// When the maximum occurred.
    pub max_time: Option<NaiveDateTime>,
    /// Whether this counter is reliable across firmware revisions.
    pub tentative: bool,
}

/// Decoded snapshot of everything the console reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Ringing-alarm bitmask from bytes 6..8.
    pub alarm_ringing_flags: u16,
    /// Forecast icon state.
    pub weather_state: WeatherState,
    /// Pressure trend.
    pub weather_tendency: WeatherTendency,

    /// Indoor temperature, °C.
    pub temp_indoor: Reading,
    /// Indoor temperature extremes.
    pub temp_indoor_minmax: MinMax,
    /// Outdoor temperature, °C.
    pub temp_outdoor: Reading,
    /// Outdoor temperature extremes.
    pub temp_outdoor_minmax: MinMax,
    /// Windchill, °C.
    pub windchill: Reading,
    /// Windchill extremes.
    pub windchill_minmax: MinMax,
    /// Dewpoint, °C.
    pub dewpoint: Reading,
    /// Dewpoint extremes.
    pub dewpoint_minmax: MinMax,

    /// Indoor humidity, %.
    pub humidity_indoor: Reading,
    /// Indoor humidity extremes.
    pub humidity_indoor_minmax: MinMax,
    /// Outdoor humidity, %.
    pub humidity_outdoor: Reading,
    /// Outdoor humidity extremes.
    pub humidity_outdoor_minmax: MinMax,

    /// Rain over the last month.
    pub rain_last_month: RainCounter,
    /// Rain over the last week.
    pub rain_last_week: RainCounter,
    /// Rain over the last 24 hours.
    pub rain_24h: RainCounter,
    /// Rain over the last hour.
    pub rain_1h: RainCounter,
    /// Total rain since the last counter reset, mm.
    pub rain_total: Reading,
    /// When the rain counter was last reset.
    pub last_rain_reset: Option<NaiveDateTime>,

    /// Wind speed, m/s.
    pub wind_speed: Reading,
    /// Current wind direction.
    pub wind_direction: WindDirection,
    /// The five previous wind directions, most recent first.
    pub wind_direction_history: [WindDirection; 5],

    /// Gust speed, m/s.
    pub gust: Reading,
    /// Highest gust and when it occurred.
    pub gust_max: Extreme,
    /// Current gust direction.
    pub gust_direction: WindDirection,
    /// The five previous gust directions, most recent first.
    pub gust_direction_history: [WindDirection; 5],

    /// Relative pressure, hPa.
    pub pressure_hpa: Reading,
    /// Relative pressure, inHg.
    pub pressure_inhg: Reading,
    /// Pressure extremes, hPa.
    pub pressure_hpa_minmax: MinMax,
    /// Pressure extremes, inHg.
    pub pressure_inhg_minmax: MinMax,
}

/// Temperature-style block: max/min timestamps then max, min and current
/// values, at the fixed relative offsets the console uses.
fn temperature_block(payload: &[u8], base: usize) -> (Reading, MinMax) {
    let max_time = values::datetime_10(payload, base, Nib::Lo);
    let min_time = values::datetime_10(payload, base + 5, Nib::Lo);
    let max = values::temperature_5_3(payload, base + 10, Nib::Lo);
    let min = values::temperature_5_3(payload, base + 13, Nib::Hi);
    let current = values::temperature_5_3(payload, base + 15, Nib::Lo);
    (
        current,
        MinMax {
            min: Extreme::new(min, min_time),
            max: Extreme::new(max, max_time),
        },
    )
}

/// Humidity block: max/min timestamps then max, min and current BCD pairs.
fn humidity_block(payload: &[u8], base: usize) -> (Reading, MinMax) {
    let max_time = values::datetime_10(payload, base, Nib::Hi);
    let min_time = values::datetime_10(payload, base + 5, Nib::Hi);
    let max = values::humidity_2_0(payload, base + 10, Nib::Hi);
    let min = values::humidity_2_0(payload, base + 11, Nib::Hi);
    let current = values::humidity_2_0(payload, base + 12, Nib::Hi);
    (
        current,
        MinMax {
            min: Extreme::new(min, min_time),
            max: Extreme::new(max, max_time),
        },
    )
}

/// Rain block: max timestamp, max value, current value.
fn rain_block(payload: &[u8], base: usize, tentative: bool) -> RainCounter {
    let max_time = values::datetime_10(payload, base, Nib::Hi);
    let max = values::rain_6_2(payload, base + 5, Nib::Hi);
    let total = values::rain_6_2(payload, base + 8, Nib::Hi);
    RainCounter {
        total,
        max,
        max_time: if max.value().is_some() { max_time } else { None },
        tentative,
    }
}

fn direction_history(payload: &[u8], newest_byte: usize) -> (WindDirection, [WindDirection; 5]) {
    // The five historical directions occupy the nibbles preceding the
    // current one, newest first.
    let (current, d1) = values::wind_direction_pair(payload, newest_byte);
    let (d2, d3) = values::wind_direction_pair(payload, newest_byte - 1);
    let (d4, d5) = values::wind_direction_pair(payload, newest_byte - 2);
    (current, [d1, d2, d3, d4, d5])
}

/// Decode a current-weather frame payload (response type `0x60`).
pub fn decode_current(payload: &[u8]) -> Result<(FrameHeader, CurrentWeather), CodecError> {
    let header = FrameHeader::parse(payload)?;

    let (temp_indoor, temp_indoor_minmax) = temperature_block(payload, 9);
    let (temp_outdoor, temp_outdoor_minmax) = temperature_block(payload, 27);
    let (windchill, windchill_minmax) = temperature_block(payload, 45);
    let (dewpoint, dewpoint_minmax) = temperature_block(payload, 63);
    let (humidity_indoor, humidity_indoor_minmax) = humidity_block(payload, 81);
    let (humidity_outdoor, humidity_outdoor_minmax) = humidity_block(payload, 94);

    // The two fields flagged unreliable across firmware revisions.
    let rain_last_month = rain_block(payload, 107, true);
    let rain_last_week = rain_block(payload, 118, true);
    let rain_24h = rain_block(payload, 129, false);
    let rain_1h = rain_block(payload, 140, false);

    let (wind_direction, wind_direction_history) = direction_history(payload, 162);
    let (gust_direction, gust_direction_history) = direction_history(payload, 177);

    let gust_max_value = values::windspeed_5_2(payload, 184, Nib::Hi);
    let gust_max_time = values::datetime_10(payload, 179, Nib::Hi);

    // One shared timestamp for the pressure extremes; the slot that should
    // hold the minimum's time repeats the value pair instead (console
    // firmware quirk).
    let pressure_time = values::datetime_10(payload, 190, Nib::Hi);
    let (pressure_max_hpa, pressure_max_inhg) = values::pressure_shared(payload, 200, Nib::Hi);
    let (pressure_min_hpa, pressure_min_inhg) = values::pressure_shared(payload, 205, Nib::Hi);
    let (pressure_hpa, pressure_inhg) = values::pressure_shared(payload, 210, Nib::Hi);

    Ok((
        header,
        CurrentWeather {
            alarm_ringing_flags: u16::from_be_bytes([payload[6], payload[7]]),
            weather_tendency: WeatherTendency::from_nibble(payload[8] >> 4),
            weather_state: WeatherState::from_nibble(payload[8] & 0x0f),
            temp_indoor,
            temp_indoor_minmax,
            temp_outdoor,
            temp_outdoor_minmax,
            windchill,
            windchill_minmax,
            dewpoint,
            dewpoint_minmax,
            humidity_indoor,
            humidity_indoor_minmax,
            humidity_outdoor,
            humidity_outdoor_minmax,
            rain_last_month,
            rain_last_week,
            rain_24h,
            rain_1h,
            rain_total: values::rain_7_3(payload, 156, Nib::Lo),
            last_rain_reset: values::datetime_10(payload, 151, Nib::Lo),
            wind_speed: values::windspeed_5_2(payload, 172, Nib::Hi),
            wind_direction,
            wind_direction_history,
            gust: values::windspeed_5_2(payload, 187, Nib::Hi),
            gust_max: Extreme::new(gust_max_value, gust_max_time),
            gust_direction,
            gust_direction_history,
            pressure_hpa,
            pressure_inhg,
            pressure_hpa_minmax: MinMax {
                min: Extreme::new(pressure_min_hpa, pressure_time),
                max: Extreme::new(pressure_max_hpa, pressure_time),
            },
            pressure_inhg_minmax: MinMax {
                min: Extreme::new(pressure_min_inhg, pressure_time),
                max: Extreme::new(pressure_max_inhg, pressure_time),
            },
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_and_tendency_labels() {
        assert_eq!(WeatherState::from_nibble(2).label(), "sunny");
        assert_eq!(WeatherState::from_nibble(9), WeatherState::Unknown);
        assert_eq!(WeatherTendency::from_nibble(1).label(), "rising");
        assert_eq!(WeatherTendency::from_nibble(7), WeatherTendency::Unknown);
    }

    #[test]
    fn test_rejects_short_frame() {
        let mut payload = vec![0u8; 100];
        payload[0] = 0x01;
        payload[1] = 0x2e;
        payload[2] = 0x60;
        assert!(matches!(
            decode_current(&payload),
            Err(CodecError::Length {
                expected: CURRENT_FRAME_LEN,
                actual: 100
            })
        ));
    }
}
