//! Shared slots between the service worker and the facade.
//!
//! The worker copies frame bytes and decodes with no lock held, then takes
//! the relevant slot lock only to publish. Consumers clone out under the
//! same locks. Blocking waits (pairing, shutdown) go through dedicated
//! notification primitives, never through the slot mutexes.

use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Local};
use tokio::sync::Notify;
use wslink_ws28xx_protocol::values::BatteryFlags;
use wslink_ws28xx_protocol::{DeviceId, StationConfig};

use crate::history_cache::HistoryCache;
use crate::records::Observation;
use crate::transceiver::TransceiverInfo;

/// Driver lifecycle, driven only by the service loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransceiverState {
    /// No USB contact yet.
    Uninitialised,
    /// Register table being written.
    Initialising,
    /// Transceiver ready, unpaired.
    Idle,
    /// Waiting for the console SET press.
    Pairing,
    /// Device id known, frames flowing.
    Paired,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Background link health, surfaced by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Frames arriving normally.
    Ok,
    /// Transport faults exhausted a retry budget; still trying.
    Degraded,
    /// Repeated sync losses; no console contact.
    NoContact,
}

/// Writes the facade has queued for the worker.
#[derive(Debug, Default)]
pub struct PendingWrites {
    /// Send the host clock at the next opportunity.
    pub set_time: bool,
    /// Config image to push.
    pub set_config: Option<StationConfig>,
}

/// Link metadata from the most recent frame.
#[derive(Debug, Default, Clone)]
pub struct LinkStats {
    /// Last link quality reading.
    pub quality: u8,
    /// Last battery flags.
    pub battery: BatteryFlags,
    /// When the console was last heard.
    pub last_seen: Option<DateTime<Local>>,
}

/// Latest observation plus delivery bookkeeping.
#[derive(Debug, Default)]
pub struct ObservationSlot {
    /// Most recent successfully decoded observation.
    pub latest: Option<Observation>,
    /// Timestamp of the last observation handed to a consumer via
    /// `take_new_observation`.
    pub last_delivered: Option<DateTime<Local>>,
    /// Previous raw rain-total counter for delta computation.
    pub last_rain_total: Option<f64>,
}

/// All shared state between worker and facade.
pub struct Shared {
    /// Lifecycle state.
    pub state: Mutex<TransceiverState>,
    /// Link health.
    pub health: Mutex<Health>,
    /// Dongle identity once initialised.
    pub info: Mutex<Option<TransceiverInfo>>,
    /// Console id the driver is paired to; zero until pairing completes.
    pub device_id: Mutex<DeviceId>,
    /// Last config checksum echoed by the console.
    pub device_checksum: Mutex<u16>,
    /// Latest observation.
    pub observation: Mutex<ObservationSlot>,
    /// Console configuration image; read-copy-update.
    pub config: RwLock<Option<StationConfig>>,
    /// Queued writes.
    pub pending: Mutex<PendingWrites>,
    /// History cache and drain state.
    pub history: Mutex<HistoryCache>,
    /// Link metadata.
    pub link: Mutex<LinkStats>,
    /// Signalled when the pairing state changes.
    pub paired: Notify,
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    /// Fresh shared state for one driver instance.
    pub fn new() -> Self {
        Shared {
            state: Mutex::new(TransceiverState::Uninitialised),
            health: Mutex::new(Health::Ok),
            info: Mutex::new(None),
            device_id: Mutex::new(DeviceId::UNSET),
            device_checksum: Mutex::new(0),
            observation: Mutex::new(ObservationSlot::default()),
            config: RwLock::new(None),
            pending: Mutex::new(PendingWrites::default()),
            history: Mutex::new(HistoryCache::new()),
            link: Mutex::new(LinkStats::default()),
            paired: Notify::new(),
        }
    }

    /// Lock a slot, recovering from a poisoned mutex; the worker never
    /// panics while holding one, but a consumer thread might.
    pub fn lock<'a, T>(m: &'a Mutex<T>) -> MutexGuard<'a, T> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransceiverState {
        *Self::lock(&self.state)
    }

    /// Move to a new lifecycle state and wake pairing waiters.
    pub fn set_state(&self, state: TransceiverState) {
        *Self::lock(&self.state) = state;
        self.paired.notify_waiters();
    }

    /// Current health.
    pub fn health(&self) -> Health {
        *Self::lock(&self.health)
    }

    /// Publish a health change.
    pub fn set_health(&self, health: Health) {
        *Self::lock(&self.health) = health;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions_visible() {
        let shared = Shared::new();
        assert_eq!(shared.state(), TransceiverState::Uninitialised);
        shared.set_state(TransceiverState::Pairing);
        assert_eq!(shared.state(), TransceiverState::Pairing);
    }

    #[test]
    fn test_default_health_is_ok() {
        let shared = Shared::new();
        assert_eq!(shared.health(), Health::Ok);
        shared.set_health(Health::NoContact);
        assert_eq!(shared.health(), Health::NoContact);
    }
}
