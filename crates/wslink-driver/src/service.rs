//! The service worker: drives the transport at the console's cadence.
//!
//! Per iteration: poll the dongle state until a frame is ready, pull and
//! decode it, publish to the shared slots, ask the state machine for the
//! next request and transmit it. The inter-frame sleeps (380 ms for the
//! first exchange of a cycle, 200 ms for the rest) match the console's RF
//! half-duplex listen window.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use wslink_errors::DriverError;
use wslink_hid_common::{Transport, TransportResult, UsbControl};
use wslink_ws28xx_protocol::config::{decode_config, encode_set_config};
use wslink_ws28xx_protocol::current::decode_current;
use wslink_ws28xx_protocol::history::decode_history;
use wslink_ws28xx_protocol::ids::{DongleState, EXECUTE_ARM_RECEIVER, PREAMBLE_PATTERN};
use wslink_ws28xx_protocol::{
    build_first_config, build_request, build_send_time, open_frame, seal_frame, Action,
    DeviceId, FrameHeader, RequestFrame, ResponseType, BROADCAST_ID, MAX_FRAME_SIZE,
};

use crate::config::DriverConfig;
use crate::records::Observation;
use crate::slots::{Health, Shared, TransceiverState};
use crate::statemachine::{next_request, HistoryProgress, NextRequest, Pending};

/// Consecutive sync losses before the driver reports `NoContact`.
const SYNC_LOSSES_FOR_NO_CONTACT: u32 = 3;

/// Window within which an identical current-weather frame is a console
/// retransmission.
const DUPLICATE_WINDOW: Duration = Duration::from_secs(3);

enum Wait {
    Data { waited: bool },
    Timeout,
    Shutdown,
}

enum Outgoing {
    Next(NextRequest),
    FirstConfig,
}

/// The single task owning the USB transport.
pub struct ServiceWorker<C: UsbControl> {
    transport: Transport<C>,
    shared: std::sync::Arc<Shared>,
    cfg: DriverConfig,
    shutdown: watch::Receiver<bool>,
    sync_losses: u32,
    last_request: Option<NextRequest>,
    last_current: Option<(u64, Instant)>,
    config_differs: bool,
}

impl<C: UsbControl> ServiceWorker<C> {
    /// Build a worker over an initialized transport.
    pub fn new(
        transport: Transport<C>,
        shared: std::sync::Arc<Shared>,
        cfg: DriverConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        ServiceWorker {
            transport,
            shared,
            cfg,
            shutdown,
            sync_losses: 0,
            last_request: None,
            last_current: None,
            config_differs: false,
        }
    }

    /// Run until shutdown. The current transaction is finished before the
    /// task exits; pending history reads survive in the shared cache.
    pub async fn run(mut self) {
        info!(model = %self.cfg.model, "service worker started");
        let mut first_in_cycle = true;
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            match self.wait_for_data().await {
                Wait::Shutdown => break,
                Wait::Timeout => {
                    first_in_cycle = true;
                    self.handle_sync_loss();
                }
                Wait::Data { waited } => {
                    if waited {
                        first_in_cycle = true;
                    }
                    if self.exchange(first_in_cycle).await {
                        break;
                    }
                    first_in_cycle = false;
                }
            }
        }
        self.shared.set_state(TransceiverState::ShuttingDown);
        info!("service worker stopped");
    }

    /// Poll the dongle state until a frame is ready or the sync window
    /// expires.
    async fn wait_for_data(&mut self) -> Wait {
        let deadline = Instant::now() + Duration::from_millis(self.cfg.sync_window_ms);
        let mut waited = false;
        loop {
            if *self.shutdown.borrow() {
                return Wait::Shutdown;
            }
            match self.transport.read_state() {
                Ok(raw) if DongleState::from_raw(raw) == DongleState::DataAvailable => {
                    return Wait::Data { waited };
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "state poll failed"),
            }
            if Instant::now() >= deadline {
                return Wait::Timeout;
            }
            waited = true;
            if self.sleep_cancellable(self.cfg.state_poll_ms).await {
                return Wait::Shutdown;
            }
        }
    }

    /// Re-arm the receiver after a missed window, up to three attempts;
    /// beyond that only the `NoContact` signal stays raised and the loop
    /// keeps listening.
    fn handle_sync_loss(&mut self) {
        self.sync_losses = self.sync_losses.saturating_add(1);
        if self.sync_losses <= SYNC_LOSSES_FOR_NO_CONTACT {
            warn!(losses = self.sync_losses, "sync lost, re-arming receiver");
            let rearm: [TransportResult<()>; 3] = [
                self.transport.execute(EXECUTE_ARM_RECEIVER),
                self.transport.set_preamble_pattern(PREAMBLE_PATTERN),
                self.transport.set_rx(),
            ];
            for result in rearm {
                if let Err(e) = result {
                    warn!(error = %e, "re-arm command failed");
                }
            }
        }
        if self.sync_losses >= SYNC_LOSSES_FOR_NO_CONTACT {
            self.shared.set_health(Health::NoContact);
        }
    }

    /// One frame exchange. Returns `true` on shutdown.
    async fn exchange(&mut self, first_in_cycle: bool) -> bool {
        let frame = match self.with_retry(|t| t.read_frame()).await {
            Ok(frame) => frame,
            Err(DriverError::Cancelled) => return true,
            Err(e) => {
                warn!(error = %e, "frame read exhausted retries");
                self.shared.set_health(Health::Degraded);
                return false;
            }
        };

        let outgoing = self.handle_frame(&frame.data);
        if let Some(outgoing) = outgoing {
            if self.emit(outgoing).await {
                return true;
            }
        }

        let pause = self.cfg.comm_interval[usize::from(!first_in_cycle)];
        self.sleep_cancellable(pause).await
    }

    /// Decode a received buffer, publish its contents, and decide the next
    /// request. Pure slot updates; no lock is held on return.
    fn handle_frame(&mut self, buf: &[u8]) -> Option<Outgoing> {
        let payload = match open_frame(buf) {
            Ok(payload) => payload,
            Err(e) => return self.codec_fault(e),
        };
        let header = match FrameHeader::parse(payload) {
            Ok(header) => header,
            Err(e) => return self.codec_fault(e),
        };

        // A decodable frame means the console is back.
        self.sync_losses = 0;
        self.shared.set_health(Health::Ok);

        if let Some(gate) = self.gate_device_id(&header) {
            return gate;
        }

        {
            let mut link = Shared::lock(&self.shared.link);
            link.quality = header.quality;
            link.last_seen = Some(Local::now());
            if !matches!(
                header.response,
                ResponseType::RequestFirstConfig
                    | ResponseType::RequestSetConfig
                    | ResponseType::RequestSetTime
            ) {
                link.battery = header.battery;
            }
        }

        let (event, progress) = match header.response {
            ResponseType::Current => match self.apply_current(payload, &header) {
                Ok(progress) => (ResponseType::Current, progress),
                Err(e) => return self.codec_fault(e),
            },
            ResponseType::History => match self.apply_history(payload) {
                Ok(progress) => (ResponseType::History, progress),
                Err(e) => return self.codec_fault(e),
            },
            ResponseType::Config => match self.apply_config(payload) {
                Ok(progress) => (ResponseType::Config, progress),
                Err(e) => return self.codec_fault(e),
            },
            ResponseType::Ack => {
                self.apply_ack();
                (ResponseType::Ack, self.current_progress())
            }
            other => {
                *Shared::lock(&self.shared.device_checksum) = header.config_checksum;
                (other, self.current_progress())
            }
        };

        let pending = {
            let p = Shared::lock(&self.shared.pending);
            Pending {
                set_time: p.set_time,
                set_config: p.set_config.is_some(),
                history_catchup: Shared::lock(&self.shared.history).catchup_pending(),
                config_differs: self.config_differs,
            }
        };
        Some(Outgoing::Next(next_request(event, pending, progress)))
    }

    /// Codec faults never retry: log, and keep cadence with a GetCurrent
    /// when possible.
    fn codec_fault(&mut self, e: wslink_ws28xx_protocol::CodecError) -> Option<Outgoing> {
        warn!(error = %e, "frame discarded");
        let id = *Shared::lock(&self.shared.device_id);
        id.is_set().then_some(Outgoing::Next(NextRequest::GetCurrent))
    }

    /// Enforce the device-id rules, performing pairing adoption when the
    /// driver is in the pairing state. Returns a short-circuit response for
    /// frames that must not be dispatched.
    fn gate_device_id(&mut self, header: &FrameHeader) -> Option<Option<Outgoing>> {
        let paired = *Shared::lock(&self.shared.device_id);
        let state = self.shared.state();

        if state == TransceiverState::Pairing {
            if header.device_id.0 == BROADCAST_ID {
                // Unpaired console broadcasting; answer with our identity.
                return Some(Some(Outgoing::FirstConfig));
            }
            if header.device_id.is_set() {
                info!(id = %header.device_id, "console adopted");
                *Shared::lock(&self.shared.device_id) = header.device_id;
                self.shared.set_state(TransceiverState::Paired);
                return None;
            }
            return Some(None);
        }

        if !paired.is_set() {
            // Unpaired but idle: only a console matching the EEPROM id is
            // ours.
            let eeprom_id = Shared::lock(&self.shared.info)
                .as_ref()
                .map(|i| i.device_id);
            if eeprom_id == Some(header.device_id) && header.device_id.is_set() {
                info!(id = %header.device_id, "console confirmed from EEPROM id");
                *Shared::lock(&self.shared.device_id) = header.device_id;
                self.shared.set_state(TransceiverState::Paired);
                return None;
            }
            debug!(id = %header.device_id, "frame from unknown console ignored");
            return Some(None);
        }

        if header.device_id != paired {
            warn!(id = %header.device_id, expected = %paired, "frame from foreign console");
            return Some(None);
        }
        None
    }

    fn current_progress(&self) -> HistoryProgress {
        let history = Shared::lock(&self.shared.history);
        HistoryProgress {
            caught_up: history.uncached_count() == 0,
            next: history.next_index(),
        }
    }

    fn apply_current(
        &mut self,
        payload: &[u8],
        header: &FrameHeader,
    ) -> Result<HistoryProgress, wslink_ws28xx_protocol::CodecError> {
        let mut hasher = DefaultHasher::new();
        hasher.write(payload);
        let hash = hasher.finish();
        let now = Instant::now();
        let duplicate = self
            .last_current
            .is_some_and(|(h, at)| h == hash && now.duration_since(at) < DUPLICATE_WINDOW);
        self.last_current = Some((hash, now));

        let (_, weather) = decode_current(payload)?;
        *Shared::lock(&self.shared.device_checksum) = header.config_checksum;

        if duplicate {
            debug!("duplicate current-weather frame dropped");
        } else {
            let mut slot = Shared::lock(&self.shared.observation);
            let rain_delta =
                Observation::rain_delta(weather.rain_total, slot.last_rain_total);
            slot.last_rain_total = weather.rain_total.value().or(slot.last_rain_total);
            slot.latest = Some(Observation {
                received_at: Local::now(),
                weather,
                quality: header.quality,
                battery: header.battery,
                rain_delta,
            });
        }
        Ok(self.current_progress())
    }

    fn apply_history(
        &mut self,
        payload: &[u8],
    ) -> Result<HistoryProgress, wslink_ws28xx_protocol::CodecError> {
        let frame = decode_history(payload)?;
        *Shared::lock(&self.shared.device_checksum) = frame.header.config_checksum;
        let caught_up = frame.this_index == frame.latest_index;
        let mut history = Shared::lock(&self.shared.history);
        history.observe(&frame, Instant::now());
        Ok(HistoryProgress {
            caught_up,
            next: history.next_index(),
        })
    }

    fn apply_config(
        &mut self,
        payload: &[u8],
    ) -> Result<HistoryProgress, wslink_ws28xx_protocol::CodecError> {
        let (_, received) = decode_config(payload)?;
        *Shared::lock(&self.shared.device_checksum) = received.checksum;

        let mut pending = Shared::lock(&self.shared.pending);
        self.config_differs = match pending.set_config.as_ref() {
            Some(wanted) => {
                let mut a = wanted.clone();
                let mut b = received.clone();
                a.checksum = 0;
                b.checksum = 0;
                a.reset_minmax_flags = 0;
                b.reset_minmax_flags = 0;
                if a == b {
                    // The console caught up; nothing left to push.
                    pending.set_config = None;
                    false
                } else {
                    true
                }
            }
            None => false,
        };
        drop(pending);

        *self
            .shared
            .config
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(received);
        Ok(self.current_progress())
    }

    /// A `0x20` acknowledge clears the write it answers.
    fn apply_ack(&mut self) {
        let mut pending = Shared::lock(&self.shared.pending);
        match self.last_request {
            Some(NextRequest::SendTime) => {
                info!("console accepted time");
                pending.set_time = false;
            }
            Some(NextRequest::SetConfigBody) => {
                info!("console accepted configuration");
                pending.set_config = None;
                self.config_differs = false;
            }
            _ => {}
        }
    }

    /// Encode and transmit a response. Returns `true` on shutdown.
    async fn emit(&mut self, outgoing: Outgoing) -> bool {
        let device_id = *Shared::lock(&self.shared.device_id);
        let checksum = *Shared::lock(&self.shared.device_checksum);
        let comm_interval = self.cfg.comm_mode_interval;

        let payload: Vec<u8> = match &outgoing {
            Outgoing::FirstConfig => {
                let eeprom_id = Shared::lock(&self.shared.info)
                    .as_ref()
                    .map(|i| i.device_id)
                    .unwrap_or(DeviceId::UNSET);
                if !eeprom_id.is_set() {
                    warn!("cannot answer broadcast without an EEPROM device id");
                    return false;
                }
                build_first_config(eeprom_id, comm_interval).payload().to_vec()
            }
            Outgoing::Next(next) => {
                // No frame ever goes out with an unset device id.
                if !device_id.is_set() {
                    debug!("suppressing request: not paired");
                    return false;
                }
                match next {
                    NextRequest::SendTime => {
                        build_send_time(device_id, checksum, Local::now().naive_local())
                            .payload()
                            .to_vec()
                    }
                    NextRequest::SetConfigBody => {
                        let body = {
                            let pending = Shared::lock(&self.shared.pending);
                            pending.set_config.clone().or_else(|| {
                                self.shared
                                    .config
                                    .read()
                                    .unwrap_or_else(|e| e.into_inner())
                                    .clone()
                            })
                        };
                        match body {
                            Some(cfg) => encode_set_config(device_id, &cfg).to_vec(),
                            None => {
                                // Nothing to push yet; ask for the console's
                                // image instead.
                                self.simple_request(device_id, Action::GetConfig, checksum)
                                    .payload()
                                    .to_vec()
                            }
                        }
                    }
                    NextRequest::GetHistory(index) => build_request(
                        device_id,
                        Action::GetHistory,
                        checksum,
                        *index,
                        comm_interval,
                    )
                    .payload()
                    .to_vec(),
                    NextRequest::GetCurrent => self
                        .simple_request(device_id, Action::GetCurrent, checksum)
                        .payload()
                        .to_vec(),
                    NextRequest::GetConfig => self
                        .simple_request(device_id, Action::GetConfig, checksum)
                        .payload()
                        .to_vec(),
                    NextRequest::AnnounceSetConfig => self
                        .simple_request(device_id, Action::SetConfig, checksum)
                        .payload()
                        .to_vec(),
                }
            }
        };

        let mut sealed = [0u8; MAX_FRAME_SIZE];
        let len = seal_frame(&payload, &mut sealed);
        let result = self
            .with_retry(move |t| {
                t.set_state(0)?;
                t.write_frame(&sealed[..len])?;
                t.set_tx()
            })
            .await;
        match result {
            Ok(()) => {
                if let Outgoing::Next(next) = outgoing {
                    self.last_request = Some(next);
                }
                false
            }
            Err(DriverError::Cancelled) => true,
            Err(e) => {
                warn!(error = %e, "frame write exhausted retries");
                self.shared.set_health(Health::Degraded);
                false
            }
        }
    }

    /// A request that carries the latest known archive slot, so the console
    /// does not start an unwanted history push.
    fn simple_request(&self, device_id: DeviceId, action: Action, checksum: u16) -> RequestFrame {
        let index = {
            let history = Shared::lock(&self.shared.history);
            if history.catchup_pending() {
                history.next_index()
            } else {
                history.latest_index()
            }
        };
        build_request(
            device_id,
            action,
            checksum,
            index,
            self.cfg.comm_mode_interval,
        )
    }

    /// Transport retry with exponential backoff; honours `max_tries = 0`
    /// as "retry forever".
    async fn with_retry<T>(
        &mut self,
        mut op: impl FnMut(&mut Transport<C>) -> TransportResult<T>,
    ) -> Result<T, DriverError> {
        let tries = if self.cfg.max_tries == 0 {
            u32::MAX
        } else {
            self.cfg.max_tries
        };
        let mut backoff = self.cfg.backoff_ms;
        let mut last_error = String::new();
        for attempt in 1..=tries {
            match op(&mut self.transport) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    debug!(attempt, error = %e, "transport fault");
                    last_error = e.to_string();
                }
            }
            if attempt == tries {
                break;
            }
            if self.sleep_cancellable(backoff).await {
                return Err(DriverError::Cancelled);
            }
            backoff = backoff.saturating_mul(2);
        }
        Err(DriverError::Transport(last_error))
    }

    /// Sleep, waking early on shutdown. Returns `true` when shutdown was
    /// signalled.
    async fn sleep_cancellable(&mut self, ms: u64) -> bool {
        if *self.shutdown.borrow() {
            return true;
        }
        tokio::select! {
            _ = sleep(Duration::from_millis(ms)) => *self.shutdown.borrow(),
            _ = self.shutdown.changed() => true,
        }
    }
}
