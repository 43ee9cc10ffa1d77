//! Host-side driver for LaCrosse WS-28xx weather stations.
//!
//! One service worker owns the USB transport and the protocol state
//! machine; consumers talk to the thread-safe [`WeatherStationDriver`]
//! facade. Communication between the two sides goes through shared,
//! mutex-protected slots; no lock is ever held across a USB transfer.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod facade;
pub mod history_cache;
pub mod records;
pub mod service;
pub mod slots;
pub mod statemachine;
pub mod transceiver;

pub use config::DriverConfig;
pub use facade::WeatherStationDriver;
pub use records::Observation;
pub use slots::{Health, TransceiverState};
pub use transceiver::TransceiverInfo;

pub use wslink_errors::{DriverError, Result};
