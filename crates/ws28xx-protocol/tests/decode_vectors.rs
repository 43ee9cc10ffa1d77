//! Frame decoding against captured and reconstructed wire samples.
//!
//! The history vector is a verbatim console capture; the current-weather
//! and config vectors are reconstructed around the documented field
//! offsets, with every asserted field placed by hand.

use chrono::NaiveDate;
use wslink_ws28xx_protocol::config::{decode_config, decode_set_config_image, encode_set_config_image};
use wslink_ws28xx_protocol::current::decode_current;
use wslink_ws28xx_protocol::history::decode_history;
use wslink_ws28xx_protocol::{
    CodecError, DeviceId, HistoryIndex, HistoryInterval, Reading, ResponseType, StationConfig,
    WindDirection, CONFIG_FRAME_LEN, CURRENT_FRAME_LEN,
};

/// Captured history frame: device 0x012e, quality 0x5f, config checksum
/// 0x051b, both ring pointers at slot 1729.
const HISTORY_SAMPLE: [u8; 30] = [
    0x01, 0x2e, 0x80, 0x5f, 0x05, 0x1b, 0x00, 0x7b, 0x32, 0x00, 0x7b, 0x32, 0x00, 0x0c, 0x70,
    0x0a, 0x00, 0x08, 0x65, 0x91, 0x01, 0x92, 0x53, 0x76, 0x35, 0x13, 0x06, 0x24, 0x09, 0x10,
];

#[test]
fn test_history_sample_decodes() {
    let frame = decode_history(&HISTORY_SAMPLE).expect("sample decodes");

    assert_eq!(frame.header.device_id, DeviceId(0x012e));
    assert_eq!(frame.header.response, ResponseType::History);
    assert_eq!(frame.header.quality, 0x5f);
    assert_eq!(frame.header.config_checksum, 0x051b);

    assert_eq!(frame.latest_index, HistoryIndex(1729));
    assert_eq!(frame.this_index, HistoryIndex(1729));

    let rec = &frame.record;
    assert_eq!(
        rec.time,
        NaiveDate::from_ymd_opt(2013, 6, 24)
            .and_then(|d| d.and_hms_opt(9, 10, 0))
            .expect("valid date")
    );
    assert_eq!(rec.temp_indoor, Reading::Value(23.5));
    assert_eq!(rec.temp_outdoor, Reading::Value(13.7));
    assert_eq!(rec.humidity_indoor, Reading::Value(59.0));
    assert_eq!(rec.humidity_outdoor, Reading::Value(86.0));
    assert_eq!(rec.pressure, Reading::Value(1019.2));
    assert_eq!(rec.wind_speed, Reading::Value(1.0));
    assert_eq!(rec.gust, Reading::Value(1.2));
    assert_eq!(rec.wind_direction, WindDirection(7));
    assert_eq!(rec.wind_direction.compass(), "SSE");
    assert_eq!(rec.rain_counter, Reading::Value(0.0));
}

#[test]
fn test_history_rejects_wrong_length() {
    assert!(matches!(
        decode_history(&HISTORY_SAMPLE[..28]),
        Err(CodecError::Length { .. })
    ));
}

/// Reconstruct a current-weather frame with the documented header and the
/// asserted fields placed at their wire offsets.
fn current_sample() -> [u8; CURRENT_FRAME_LEN] {
    let mut buf = [0u8; CURRENT_FRAME_LEN];
    buf[..6].copy_from_slice(&[0x01, 0x2e, 0x60, 0x5f, 0x05, 0x1b]);
    // Alarm flags zero at 6..8; tendency/state zero at 8.

    // Indoor temperature 23.5 °C: lo-aligned BCD 63500 at byte 24.
    buf[24] |= 0x06;
    buf[25] = 0x35;
    // Outdoor temperature 13.7 °C: lo-aligned BCD 53700 at byte 42.
    buf[42] |= 0x05;
    buf[43] = 0x37;
    // Indoor humidity 59 %.
    buf[93] = 0x59;
    // Rain 24h 0.51 mm: hi-aligned BCD 000051 at byte 137.
    buf[139] = 0x51;
    // Wind direction WSW in the low nibble of byte 162.
    buf[162] = 0x0b;
    // Relative pressure 30.10 inHg / 1019.2 hPa in the shared group at 210.
    buf[210] = 0x03;
    buf[211] = 0x01;
    buf[212] = 0x01;
    buf[213] = 0x01;
    buf[214] = 0x92;
    buf
}

#[test]
fn test_current_sample_decodes() {
    let buf = current_sample();
    let (header, cw) = decode_current(&buf).expect("sample decodes");

    assert_eq!(header.device_id, DeviceId(0x012e));
    assert_eq!(header.response, ResponseType::Current);
    assert_eq!(header.config_checksum, 0x051b);

    assert_eq!(cw.temp_indoor, Reading::Value(23.5));
    assert_eq!(cw.humidity_indoor, Reading::Value(59.0));
    assert_eq!(cw.temp_outdoor, Reading::Value(13.7));
    assert_eq!(cw.rain_24h.total, Reading::Value(0.51));
    assert!(!cw.rain_24h.tentative);
    assert!(cw.rain_last_week.tentative);
    assert_eq!(cw.pressure_hpa, Reading::Value(1019.2));
    assert_eq!(cw.pressure_inhg, Reading::Value(30.10));
    assert_eq!(cw.wind_direction, WindDirection(11));
    assert_eq!(cw.wind_direction.compass(), "WSW");
    assert_eq!(cw.alarm_ringing_flags, 0x0000);
}

/// Reconstruct a GetConfig frame whose image sums to the documented
/// checksum 0x051b, with a 1-minute history interval.
fn config_sample() -> [u8; CONFIG_FRAME_LEN] {
    let mut buf = [0u8; CONFIG_FRAME_LEN];
    buf[..4].copy_from_slice(&[0x01, 0x2e, 0x40, 0x64]);
    let image = &mut buf[4..];
    image[1] = 0xff; // thresholds
    image[2] = 0x19; // contrast / low-battery mask
    image[3] = 0xff; // alarm bitmasks
    image[4] = 0xff;
    image[5] = 0xff;
    image[6] = 0xff;
    // image[25] = 0: one-minute history interval.
    // Sum of image[0..39] is 1300; checksum = 1300 + 7 = 0x051b.
    image[42] = 0x05;
    image[43] = 0x1b;
    buf
}

#[test]
fn test_config_sample_checksum_and_interval() {
    let buf = config_sample();
    assert_eq!(&buf[CONFIG_FRAME_LEN - 4..], &[0x00, 0x00, 0x05, 0x1b]);

    let (_, cfg) = decode_config(&buf).expect("sample decodes");
    assert_eq!(cfg.checksum, 0x051b);
    assert_eq!(cfg.history_interval, HistoryInterval::Min1);
    assert_eq!(cfg.wind_dir_alarm_flags, 0xffff);
    assert_eq!(cfg.reset_minmax_flags, 0);
}

#[test]
fn test_config_bad_checksum_rejected() {
    let mut buf = config_sample();
    buf[10] ^= 0x01;
    assert!(matches!(
        decode_config(&buf),
        Err(CodecError::Checksum { .. })
    ));
}

/// The alarm-threshold block is byte-reversed on the wire; these literal
/// bytes come from the console's own SetConfig encoding of the same
/// thresholds.
#[test]
fn test_set_config_reversed_block_literal() {
    let cfg = StationConfig {
        temp_indoor_min: 1.0,
        temp_indoor_max: 41.0,
        temp_outdoor_min: 2.0,
        temp_outdoor_max: 42.0,
        humidity_indoor_min: 41,
        humidity_indoor_max: 71,
        humidity_outdoor_min: 42,
        humidity_outdoor_max: 72,
        ..StationConfig::default()
    };
    let image = encode_set_config_image(&cfg);
    assert_eq!(&image[15..20], &[0x00, 0x82, 0x41, 0x71, 0x42]);

    let decoded = decode_set_config_image(&image).expect("image decodes");
    assert_eq!(decoded.temp_outdoor_min, 2.0);
    assert_eq!(decoded.temp_outdoor_max, 42.0);
    assert_eq!(decoded.temp_indoor_min, 1.0);
    assert_eq!(decoded.temp_indoor_max, 41.0);
    assert_eq!(decoded.humidity_indoor_min, 41);
    assert_eq!(decoded.humidity_outdoor_max, 72);
}
