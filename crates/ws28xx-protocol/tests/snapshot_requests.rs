//! Insta snapshot tests pinning the exact wire bytes of every outgoing
//! frame kind. Inline snapshots so the expected bytes live next to the
//! test.

use chrono::NaiveDate;
use insta::assert_snapshot;
use wslink_ws28xx_protocol::config::encode_set_config_image;
use wslink_ws28xx_protocol::{
    build_first_config, build_request, build_send_time, Action, DeviceId, HistoryIndex,
    StationConfig,
};

#[test]
fn test_snapshot_get_current_request() {
    let frame = build_request(
        DeviceId(0x012e),
        Action::GetCurrent,
        0x04cb,
        HistoryIndex::UNKNOWN,
        3,
    );
    assert_snapshot!(
        format!("{:02x?}", frame.payload()),
        @"[01, 2e, 05, 04, cb, 00, 3f, ff, ff]"
    );
}

#[test]
fn test_snapshot_get_history_request() {
    let frame = build_request(
        DeviceId(0x012e),
        Action::GetHistory,
        0x051b,
        HistoryIndex(1729),
        3,
    );
    assert_snapshot!(
        format!("{:02x?}", frame.payload()),
        @"[01, 2e, 00, 05, 1b, 00, 30, 7b, 32]"
    );
}

#[test]
fn test_snapshot_first_config_request() {
    let frame = build_first_config(DeviceId(0x012e), 3);
    assert_snapshot!(
        format!("{:02x?}", frame.payload()),
        @"[f0, f0, 03, 01, 2e, 00, 3f, ff, ff]"
    );
}

#[test]
fn test_snapshot_send_time() {
    let now = NaiveDate::from_ymd_opt(2013, 5, 15)
        .and_then(|d| d.and_hms_opt(9, 28, 6))
        .expect("valid date");
    let frame = build_send_time(DeviceId(0x012e), 0x04cb, now);
    assert_snapshot!(
        format!("{:02x?}", frame.payload()),
        @"[01, 2e, c0, 04, cb, 06, 28, 09, 52, 51, 30, 01]"
    );
}

#[test]
fn test_snapshot_default_set_config_image() {
    let image = encode_set_config_image(&StationConfig::default());
    assert_snapshot!(
        format!("{:02x?}", image),
        @"[06, 53, 04, 00, 00, 00, 00, 00, 00, 04, 00, 80, 00, 00, 02, 00, 90, 20, 90, 20, 90, 00, 00, 05, 00, 07, 00, 10, 27, 00, 96, 60, 83, 02, 00, 04, 21, 07, 03, 00, 00, 00, 04, c7]"
    );
}
