//! Host-supplied driver configuration.

use serde::{Deserialize, Serialize};
use wslink_errors::DriverError;
use wslink_ws28xx_protocol::ids::Region;
use wslink_ws28xx_protocol::{PRODUCT_ID, VENDOR_ID};

/// Driver configuration with the documented defaults. Timings are
/// empirically required by the console's RF half-duplex window; shorter
/// inter-frame sleeps drop frames, longer ones lose synchronisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// RF region selecting the base frequency.
    pub transceiver_frequency: Region,
    /// Seconds between service-loop cycles when idle.
    pub polling_interval: u64,
    /// Inter-frame sleeps in milliseconds: first exchange of a cycle, then
    /// subsequent exchanges.
    pub comm_interval: [u64; 2],
    /// Human label for logs.
    pub model: String,
    /// Pairing wait in seconds.
    pub pairing_timeout: u64,
    /// Transport retries per request; 0 means retry forever.
    pub max_tries: u32,
    /// Communication-mode interval sent in every request (`cInt`).
    pub comm_mode_interval: u8,
    /// USB vendor id.
    pub vendor_id: u16,
    /// USB product id.
    pub product_id: u16,
    /// State-poll spacing in milliseconds.
    pub state_poll_ms: u64,
    /// Window without data before the receiver is re-armed, milliseconds.
    pub sync_window_ms: u64,
    /// First retry backoff in milliseconds; doubles per attempt.
    pub backoff_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            transceiver_frequency: Region::Us,
            polling_interval: 30,
            comm_interval: [380, 200],
            model: "LaCrosse WS28xx".to_string(),
            pairing_timeout: 90,
            max_tries: 3,
            comm_mode_interval: 3,
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            state_poll_ms: 200,
            sync_window_ms: 10_000,
            backoff_ms: 200,
        }
    }
}

impl DriverConfig {
    /// Range-check the configuration before the driver starts.
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.comm_interval.iter().any(|&ms| ms == 0) {
            return Err(DriverError::InvalidConfig(
                "comm_interval entries must be non-zero".into(),
            ));
        }
        if self.state_poll_ms == 0 || self.sync_window_ms < self.state_poll_ms {
            return Err(DriverError::InvalidConfig(
                "sync window must cover at least one state poll".into(),
            ));
        }
        if self.comm_mode_interval > 0x0f {
            return Err(DriverError::InvalidConfig(
                "comm_mode_interval is a 4-bit field".into(),
            ));
        }
        if self.pairing_timeout == 0 {
            return Err(DriverError::InvalidConfig(
                "pairing_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
