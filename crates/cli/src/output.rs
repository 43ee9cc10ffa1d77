//! Output formatting: human-readable tables or JSON.

use colored::Colorize;
use serde_json::json;

use wslink_driver::records::history_record_map;
use wslink_driver::{Observation, WeatherStationDriver};
use wslink_ws28xx_protocol::history::HistoryRecord;
use wslink_ws28xx_protocol::values::Reading;
use wslink_ws28xx_protocol::StationConfig;

use crate::error::CliError;

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to format JSON: {e}"),
    }
}

/// Print an error to stderr (human) or stdout (JSON envelope).
pub fn print_error(error: &CliError, json: bool) {
    if json {
        print_json(&json!({
            "success": false,
            "error": { "kind": error.kind(), "message": error.to_string() },
        }));
    } else {
        eprintln!("{} {error}", "error:".red().bold());
    }
}

/// Transceiver identity and pairing state.
pub fn print_transceiver(driver: &WeatherStationDriver, json: bool) {
    let serial = driver.get_transceiver_serial().unwrap_or_default();
    let id = driver.get_transceiver_id();
    let paired = driver.transceiver_is_paired();
    if json {
        print_json(&json!({
            "success": true,
            "serial": serial,
            "device_id": id.0,
            "paired": paired,
        }));
    } else {
        println!("{}", "Transceiver".bold());
        println!("  serial:    {serial}");
        println!("  device id: {id}");
        println!("  paired:    {}", if paired { "yes" } else { "no" });
    }
}

fn fmt_reading(reading: Reading, unit: &str) -> String {
    match reading {
        Reading::Value(v) => format!("{v:.1} {unit}"),
        Reading::Absent => "-".to_string(),
        Reading::Overflow => "overflow".to_string(),
    }
}

/// One observation.
pub fn print_observation(obs: &Observation, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "observation": serde_json::Value::Object(obs.to_record()),
        }));
        return;
    }
    let w = &obs.weather;
    println!("{}", "Current weather".bold());
    println!("  time:             {}", obs.received_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  indoor:           {} / {}", fmt_reading(w.temp_indoor, "°C"), fmt_reading(w.humidity_indoor, "%"));
    println!("  outdoor:          {} / {}", fmt_reading(w.temp_outdoor, "°C"), fmt_reading(w.humidity_outdoor, "%"));
    println!("  dewpoint:         {}", fmt_reading(w.dewpoint, "°C"));
    println!("  windchill:        {}", fmt_reading(w.windchill, "°C"));
    println!(
        "  wind:             {} from {}",
        fmt_reading(w.wind_speed, "m/s"),
        w.wind_direction.compass()
    );
    println!(
        "  gust:             {} from {}",
        fmt_reading(w.gust, "m/s"),
        w.gust_direction.compass()
    );
    println!("  pressure:         {}", fmt_reading(w.pressure_hpa, "hPa"));
    println!("  rain 1h/24h:      {} / {}", fmt_reading(w.rain_1h.total, "mm"), fmt_reading(w.rain_24h.total, "mm"));
    println!("  rain total:       {}", fmt_reading(w.rain_total, "mm"));
    println!(
        "  forecast:         {} ({})",
        w.weather_state.label(),
        w.weather_tendency.label()
    );
    println!("  link quality:     {}%", obs.quality);
}

/// The console configuration.
pub fn print_config(cfg: &StationConfig, json: bool) {
    if json {
        match serde_json::to_value(cfg) {
            Ok(value) => print_json(&json!({ "success": true, "config": value })),
            Err(e) => eprintln!("failed to format config: {e}"),
        }
        return;
    }
    println!("{}", "Console configuration".bold());
    println!("  history interval:  {} min", cfg.history_interval.minutes());
    println!("  units:             {:?} / {:?} / {:?} / {:?}", cfg.temperature_unit, cfg.pressure_unit, cfg.rain_unit, cfg.wind_unit);
    println!("  clock:             {:?}", cfg.clock_mode);
    println!("  lcd contrast:      {}", cfg.lcd_contrast);
    println!("  thresholds:        weather {} / storm {}", cfg.weather_threshold, cfg.storm_threshold);
    println!("  temp alarms in:    {:.1}..{:.1} °C", cfg.temp_indoor_min, cfg.temp_indoor_max);
    println!("  temp alarms out:   {:.1}..{:.1} °C", cfg.temp_outdoor_min, cfg.temp_outdoor_max);
    println!("  humidity in:       {}..{} %", cfg.humidity_indoor_min, cfg.humidity_indoor_max);
    println!("  humidity out:      {}..{} %", cfg.humidity_outdoor_min, cfg.humidity_outdoor_max);
    println!("  pressure:          {:.1}..{:.1} hPa", cfg.pressure_hpa_min, cfg.pressure_hpa_max);
    println!("  rain 24h alarm:    {:.1} mm", cfg.rain_24h_max);
    println!("  gust alarm:        {:.1} m/s", cfg.gust_max);
    println!("  checksum:          {:#06x}", cfg.checksum);
}

/// Archive records, oldest first.
pub fn print_history(records: &[HistoryRecord], json: bool) {
    if json {
        let rows: Vec<_> = records
            .iter()
            .enumerate()
            .map(|(i, r)| serde_json::Value::Object(history_record_map(r, i as u16)))
            .collect();
        print_json(&json!({ "success": true, "records": rows }));
        return;
    }
    if records.is_empty() {
        println!("{}", "no archive records".yellow());
        return;
    }
    println!(
        "{}",
        format!(
            "{:<17} {:>8} {:>8} {:>7} {:>7} {:>9} {:>7} {:>7}",
            "time", "t-in °C", "t-out °C", "rh-in", "rh-out", "press hPa", "wind", "gust"
        )
        .bold()
    );
    for r in records {
        println!(
            "{:<17} {:>8} {:>8} {:>7} {:>7} {:>9} {:>7} {:>7}",
            r.time.format("%Y-%m-%d %H:%M"),
            fmt_num(r.temp_indoor),
            fmt_num(r.temp_outdoor),
            fmt_num(r.humidity_indoor),
            fmt_num(r.humidity_outdoor),
            fmt_num(r.pressure),
            fmt_num(r.wind_speed),
            fmt_num(r.gust),
        );
    }
}

fn fmt_num(reading: Reading) -> String {
    match reading {
        Reading::Value(v) => format!("{v:.1}"),
        Reading::Absent => "-".to_string(),
        Reading::Overflow => "ofl".to_string(),
    }
}
