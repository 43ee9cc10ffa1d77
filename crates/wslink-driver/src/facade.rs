//! Thread-safe public API over the shared slots.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use wslink_errors::DriverError;
use wslink_hid_common::{Transport, UsbControl};
use wslink_ws28xx_protocol::history::{HistoryIndex, HistoryRecord};
use wslink_ws28xx_protocol::{DeviceId, HistoryInterval, StationConfig};

use crate::config::DriverConfig;
use crate::records::Observation;
use crate::service::ServiceWorker;
use crate::slots::{Health, Shared, TransceiverState};
use crate::transceiver;

/// Handle to one WS-28xx driver instance.
///
/// Multiple handles on one host are fine as long as each addresses a
/// distinct dongle. All methods are callable from any thread; the blocking
/// ones take explicit timeouts.
pub struct WeatherStationDriver {
    shared: Arc<Shared>,
    cfg: DriverConfig,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WeatherStationDriver {
    /// Initialize the transceiver over `usb` and start the service worker.
    ///
    /// Must be called within a tokio runtime. Transceiver init runs
    /// synchronously so a missing dongle surfaces immediately.
    pub fn open<C: UsbControl + 'static>(
        cfg: DriverConfig,
        usb: C,
    ) -> Result<Self, DriverError> {
        cfg.validate()?;
        let shared = Arc::new(Shared::new());

        shared.set_state(TransceiverState::Initialising);
        let mut transport = Transport::new(usb);
        let info = match transceiver::initialize(&mut transport, cfg.transceiver_frequency) {
            Ok(info) => info,
            Err(e) => {
                shared.set_state(TransceiverState::Uninitialised);
                return Err(e);
            }
        };
        info!(serial = %info.serial, "transceiver initialised");
        *Shared::lock(&shared.info) = Some(info);
        shared.set_state(TransceiverState::Idle);

        let (shutdown, rx) = watch::channel(false);
        let worker = ServiceWorker::new(transport, Arc::clone(&shared), cfg.clone(), rx);
        let handle = tokio::spawn(worker.run());

        Ok(WeatherStationDriver {
            shared,
            cfg,
            shutdown,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Most recent successfully decoded observation, if any.
    pub fn current_observation(&self) -> Option<Observation> {
        Shared::lock(&self.shared.observation).latest.clone()
    }

    /// The latest observation, but only once per decoded frame: returns
    /// `None` until an observation newer than the last delivered one
    /// arrives.
    pub fn take_new_observation(&self) -> Option<Observation> {
        let mut slot = Shared::lock(&self.shared.observation);
        let obs = slot.latest.clone()?;
        if slot.last_delivered == Some(obs.received_at) {
            return None;
        }
        slot.last_delivered = Some(obs.received_at);
        Some(obs)
    }

    /// Start collecting archive records. `since` drops records older than
    /// the cutoff; `num_records` stops the drain at that count.
    pub fn start_caching_history(
        &self,
        since: Option<NaiveDateTime>,
        num_records: Option<usize>,
    ) -> Result<(), DriverError> {
        self.require_paired()?;
        Shared::lock(&self.shared.history).start(since, num_records);
        Ok(())
    }

    /// Stop collecting; cached records stay available.
    pub fn stop_caching_history(&self) {
        Shared::lock(&self.shared.history).stop();
    }

    /// Cached records in strictly increasing timestamp order.
    pub fn get_history_cache_records(&self) -> Vec<HistoryRecord> {
        Shared::lock(&self.shared.history).records()
    }

    /// Drop all cached records.
    pub fn clear_history_cache(&self) {
        Shared::lock(&self.shared.history).clear();
    }

    /// History frames inspected since caching started.
    pub fn get_num_history_scanned(&self) -> u64 {
        Shared::lock(&self.shared.history).num_scanned()
    }

    /// Records still outstanding on the console.
    pub fn get_uncached_history_count(&self) -> u16 {
        Shared::lock(&self.shared.history).uncached_count()
    }

    /// Slot the drain will request next.
    pub fn get_next_history_index(&self) -> HistoryIndex {
        Shared::lock(&self.shared.history).next_index()
    }

    /// Newest slot the console has reported.
    pub fn get_latest_history_index(&self) -> HistoryIndex {
        Shared::lock(&self.shared.history).latest_index()
    }

    /// The console configuration as last reported, if any.
    pub fn get_config(&self) -> Option<StationConfig> {
        self.shared
            .config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Queue a configuration write. Validated before anything is queued;
    /// the write goes out when the console next grants a slot.
    pub fn set_config(&self, config: StationConfig) -> Result<(), DriverError> {
        config
            .validate()
            .map_err(|e| DriverError::InvalidConfig(e.to_string()))?;
        self.require_paired()?;
        Shared::lock(&self.shared.pending).set_config = Some(config);
        Ok(())
    }

    /// Change only the archive interval, keeping the rest of the console
    /// configuration.
    pub fn set_interval(&self, minutes: u32) -> Result<(), DriverError> {
        let interval = HistoryInterval::from_minutes(minutes).ok_or_else(|| {
            DriverError::InvalidConfig(format!(
                "the console has no {minutes}-minute history interval"
            ))
        })?;
        let base = {
            let pending = Shared::lock(&self.shared.pending);
            pending.set_config.clone().or_else(|| self.get_config())
        };
        let base = base.ok_or_else(|| {
            DriverError::InvalidConfig(
                "console configuration not received yet; cannot edit it".into(),
            )
        })?;
        self.set_config(StationConfig {
            history_interval: interval,
            ..base
        })
    }

    /// Send the host clock on the next opportunity.
    pub fn set_time(&self) -> Result<(), DriverError> {
        self.require_paired()?;
        Shared::lock(&self.shared.pending).set_time = true;
        Ok(())
    }

    /// Block until the console pairs or the timeout expires. The console
    /// side needs its SET button pressed within the window.
    pub async fn pair(&self, timeout_ms: u64) -> Result<(), DriverError> {
        if !self.transceiver_is_present() {
            return Err(DriverError::Transport("transceiver not present".into()));
        }
        if self.shared.state() == TransceiverState::Paired {
            return Ok(());
        }
        self.shared.set_state(TransceiverState::Pairing);
        info!("pairing: press the SET button on the console");

        let wait = async {
            loop {
                if self.shared.state() == TransceiverState::Paired {
                    return;
                }
                tokio::select! {
                    _ = self.shared.paired.notified() => {}
                    _ = sleep(Duration::from_millis(50)) => {}
                }
            }
        };
        match timeout(Duration::from_millis(timeout_ms), wait).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!("pairing window expired");
                self.shared.set_state(TransceiverState::Idle);
                Err(DriverError::ProtocolTimeout {
                    window_ms: timeout_ms,
                })
            }
        }
    }

    /// Whether a dongle was found and initialised.
    pub fn transceiver_is_present(&self) -> bool {
        Shared::lock(&self.shared.info).is_some()
    }

    /// Whether a console is paired.
    pub fn transceiver_is_paired(&self) -> bool {
        self.shared.state() == TransceiverState::Paired
            && Shared::lock(&self.shared.device_id).is_set()
    }

    /// The dongle's 14-digit serial number.
    pub fn get_transceiver_serial(&self) -> Option<String> {
        Shared::lock(&self.shared.info).as_ref().map(|i| i.serial.clone())
    }

    /// The paired console id; unset until pairing completes.
    pub fn get_transceiver_id(&self) -> DeviceId {
        *Shared::lock(&self.shared.device_id)
    }

    /// Lifecycle state.
    pub fn state(&self) -> TransceiverState {
        self.shared.state()
    }

    /// Background link health.
    pub fn health(&self) -> Health {
        self.shared.health()
    }

    /// Last link quality reading (0..=100).
    pub fn last_link_quality(&self) -> u8 {
        Shared::lock(&self.shared.link).quality
    }

    /// Last battery flags.
    pub fn last_battery_status(&self) -> u8 {
        Shared::lock(&self.shared.link).battery.0
    }

    /// Driver configuration in effect.
    pub fn driver_config(&self) -> &DriverConfig {
        &self.cfg
    }

    /// Stop the worker. Completes within one second: the worker finishes
    /// its current transaction and exits at the next cancellation point.
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        let handle = Shared::lock(&self.worker).take();
        let Some(handle) = handle else {
            return Ok(());
        };
        let _ = self.shutdown.send(true);
        match timeout(Duration::from_secs(1), handle).await {
            Ok(_) => Ok(()),
            Err(_) => Err(DriverError::Cancelled),
        }
    }

    fn require_paired(&self) -> Result<(), DriverError> {
        if self.transceiver_is_paired() {
            Ok(())
        } else {
            Err(DriverError::Unpaired)
        }
    }
}
