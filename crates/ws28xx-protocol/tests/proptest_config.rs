//! Property-based tests for the config codec.
//!
//! Uses proptest with 500 cases to verify the encode/decode round trip over
//! the whole representable config space, independent of specific values.

use proptest::prelude::*;
use wslink_ws28xx_protocol::config::{decode_set_config_image, encode_set_config_image};
use wslink_ws28xx_protocol::{
    ClockMode, HistoryInterval, PressureUnit, RainUnit, StationConfig, TemperatureUnit, WindUnit,
};

/// Configs whose numeric fields sit on the wire's representable grid:
/// temperatures in 0.1 °C steps, pressure in 0.1 hPa / 0.01 inHg steps,
/// rain in 0.1 mm steps, gust in 0.01 m/s steps.
fn arb_config() -> impl Strategy<Value = StationConfig> {
    (
        (
            0u8..=4,
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            0u8..=15,
            0u8..=15,
            1u8..=8,
            0u8..=15,
        ),
        (any::<u16>(), any::<u16>()),
        (-400i32..=599, -400i32..=599, -400i32..=599, -400i32..=599),
        (1u8..=99, 1u8..=99, 1u8..=99, 1u8..=99),
        (0u32..=99_999, 0u32..=18_000),
        (9200u32..=10_800, 9200u32..=10_800, 2710u32..=3190, 2710u32..=3190),
        0u8..=12,
    )
        .prop_map(
            |(
                (wind, rain_inch, hpa, celsius, ampm, weather, storm, contrast, lowbat),
                (wind_alarm, other_alarm),
                (ti_min, ti_max, to_min, to_max),
                (hi_min, hi_max, ho_min, ho_max),
                (rain24h_tenths, gust_hundredths),
                (hpa_min, hpa_max, inhg_min, inhg_max),
                interval,
            )| StationConfig {
                wind_unit: match wind {
                    1 => WindUnit::Knots,
                    2 => WindUnit::Beaufort,
                    3 => WindUnit::Kmh,
                    4 => WindUnit::Mph,
                    _ => WindUnit::Ms,
                },
                rain_unit: if rain_inch { RainUnit::Inch } else { RainUnit::Mm },
                pressure_unit: if hpa { PressureUnit::Hpa } else { PressureUnit::InHg },
                temperature_unit: if celsius {
                    TemperatureUnit::Celsius
                } else {
                    TemperatureUnit::Fahrenheit
                },
                clock_mode: if ampm { ClockMode::AmPm } else { ClockMode::H24 },
                weather_threshold: weather,
                storm_threshold: storm,
                lcd_contrast: contrast,
                low_battery_mask: lowbat,
                wind_dir_alarm_flags: wind_alarm,
                other_alarm_flags: other_alarm,
                temp_indoor_min: f64::from(ti_min) / 10.0,
                temp_indoor_max: f64::from(ti_max) / 10.0,
                temp_outdoor_min: f64::from(to_min) / 10.0,
                temp_outdoor_max: f64::from(to_max) / 10.0,
                humidity_indoor_min: hi_min,
                humidity_indoor_max: hi_max,
                humidity_outdoor_min: ho_min,
                humidity_outdoor_max: ho_max,
                rain_24h_max: f64::from(rain24h_tenths) / 10.0,
                gust_max: f64::from(gust_hundredths) / 100.0,
                pressure_hpa_min: f64::from(hpa_min) / 10.0,
                pressure_hpa_max: f64::from(hpa_max) / 10.0,
                pressure_inhg_min: f64::from(inhg_min) / 100.0,
                pressure_inhg_max: f64::from(inhg_max) / 100.0,
                history_interval: HistoryInterval::from_raw(interval)
                    .unwrap_or(HistoryInterval::Min1),
                reset_minmax_flags: 0,
                checksum: 0,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Encoding a config and decoding the wire image yields the same
    /// config, modulo the write-only reset flags and the computed checksum.
    #[test]
    fn prop_set_config_round_trip(cfg in arb_config()) {
        let image = encode_set_config_image(&cfg);
        let decoded = decode_set_config_image(&image).expect("own encoding decodes");

        let expected = StationConfig {
            checksum: decoded.checksum,
            ..cfg.clone()
        };
        prop_assert_eq!(decoded, expected);
    }

    /// The reset flags never contribute to the checksum.
    #[test]
    fn prop_reset_flags_outside_checksum(cfg in arb_config(), flags in 0u32..=0xff_ffff) {
        let plain = encode_set_config_image(&cfg);
        let flagged = encode_set_config_image(&StationConfig {
            reset_minmax_flags: flags,
            ..cfg
        });
        prop_assert_eq!(&plain[42..44], &flagged[42..44]);
    }

    /// Corrupting any image byte under the checksum breaks decoding.
    #[test]
    fn prop_corruption_detected(cfg in arb_config(), byte in 0usize..39, bit in 0u8..8) {
        let mut image = encode_set_config_image(&cfg);
        image[byte] ^= 1 << bit;
        prop_assert!(decode_set_config_image(&image).is_err());
    }
}
