//! Observation records emitted to the host.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use wslink_ws28xx_protocol::current::CurrentWeather;
use wslink_ws28xx_protocol::history::HistoryRecord;
use wslink_ws28xx_protocol::values::{BatteryFlags, Reading};

/// One decoded console snapshot with link metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Host time at which the frame was decoded.
    pub received_at: DateTime<Local>,
    /// The decoded console snapshot.
    pub weather: CurrentWeather,
    /// Link quality 0..=100 in steps of 5.
    pub quality: u8,
    /// Battery-low flags.
    pub battery: BatteryFlags,
    /// Rain since the previous observation, wraparound-safe; `None` on the
    /// first observation or after a counter reset.
    pub rain_delta: Option<f64>,
}

impl Observation {
    /// Rain differential between two cumulative counter values. A counter
    /// that moved backwards is a reset, not negative rain.
    pub fn rain_delta(new_total: Reading, old_total: Option<f64>) -> Option<f64> {
        let new = new_total.value()?;
        let old = old_total?;
        (new >= old).then_some(new - old)
    }

    /// Flatten to the name→value map consumed by the host weather service.
    /// Absent sensors are omitted; everything is metric.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "dateTime".to_string(),
            json!(self.received_at.timestamp()),
        );
        let mut put = |name: &str, reading: Reading| {
            if let Some(v) = reading.value() {
                map.insert(name.to_string(), json!(v));
            }
        };
        let w = &self.weather;
        put("temp_indoor", w.temp_indoor);
        put("temp_outdoor", w.temp_outdoor);
        put("humidity_indoor", w.humidity_indoor);
        put("humidity_outdoor", w.humidity_outdoor);
        put("dewpoint", w.dewpoint);
        put("windchill", w.windchill);
        put("wind_speed", w.wind_speed);
        put("gust", w.gust);
        put("pressure_hpa", w.pressure_hpa);
        put("pressure_inhg", w.pressure_inhg);
        put("rain_total", w.rain_total);
        put("rain_24h", w.rain_24h.total);
        put("rain_1h", w.rain_1h.total);
        put("rain_week", w.rain_last_week.total);
        put("rain_month", w.rain_last_month.total);
        if let Some(deg) = w.wind_direction.degrees() {
            map.insert("wind_dir".to_string(), json!(deg));
        }
        if let Some(deg) = w.gust_direction.degrees() {
            map.insert("gust_dir".to_string(), json!(deg));
        }
        if let Some(delta) = self.rain_delta {
            map.insert("rain".to_string(), json!(delta));
        }
        map.insert("quality".to_string(), json!(self.quality));
        map.insert("battery_flags".to_string(), json!(self.battery.0));
        map
    }
}

/// Flatten a history record for the host, tagged with its ring slot.
pub fn history_record_map(record: &HistoryRecord, index: u16) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(
        "dateTime".to_string(),
        json!(record.time.and_utc().timestamp()),
    );
    map.insert("index".to_string(), json!(index));
    let mut put = |name: &str, reading: Reading| {
        if let Some(v) = reading.value() {
            map.insert(name.to_string(), json!(v));
        }
    };
    put("temp_indoor", record.temp_indoor);
    put("temp_outdoor", record.temp_outdoor);
    put("humidity_indoor", record.humidity_indoor);
    put("humidity_outdoor", record.humidity_outdoor);
    put("pressure_hpa", record.pressure);
    put("rain_counter", record.rain_counter);
    put("wind_speed", record.wind_speed);
    put("gust", record.gust);
    if let Some(deg) = record.wind_direction.degrees() {
        map.insert("wind_dir".to_string(), json!(deg));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rain_delta() {
        assert_eq!(
            Observation::rain_delta(Reading::Value(10.5), Some(10.0)),
            Some(0.5)
        );
        // Counter wrapped or was reset.
        assert_eq!(Observation::rain_delta(Reading::Value(1.0), Some(10.0)), None);
        assert_eq!(Observation::rain_delta(Reading::Absent, Some(10.0)), None);
        assert_eq!(Observation::rain_delta(Reading::Value(1.0), None), None);
    }
}
