//! WS-28xx RF protocol: frame parsing, request encoding, and the nibble codec.
//!
//! This crate is intentionally I/O-free. It provides pure functions and types
//! that can be tested and fuzzed without hardware or USB plumbing. The
//! service loop feeds it raw frame payloads and writes back the request
//! buffers it produces.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod current;
pub mod frame;
pub mod history;
pub mod ids;
pub mod nibble;
pub mod request;
pub mod values;

pub use config::{
    ClockMode, HistoryInterval, PressureUnit, RainUnit, StationConfig, TemperatureUnit, WindUnit,
    CONFIG_FRAME_LEN, SET_CONFIG_IMAGE_LEN,
};
pub use current::{CurrentWeather, CURRENT_FRAME_LEN};
pub use frame::{open_frame, seal_frame, CodecError, FrameHeader, ResponseType, MAX_FRAME_SIZE};
pub use history::{HistoryAddress, HistoryIndex, HistoryRecord, HISTORY_FRAME_LEN, HISTORY_RING_SIZE};
pub use ids::{DeviceId, AX5051_INIT_TABLE, BROADCAST_ID, VENDOR_ID, PRODUCT_ID};
pub use request::{build_first_config, build_request, build_send_time, Action, RequestFrame};
pub use values::{BatteryFlags, MinMax, Reading, WindDirection};
