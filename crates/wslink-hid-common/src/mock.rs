//! Scripted USB mock for driver and service tests.
//!
//! Clones share state, so a test can keep one handle for scripting while
//! the transport owns another. The mock reports `DataAvailable` exactly
//! while queued frames remain, mirroring how the dongle raises its state
//! byte.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::{TransportError, TransportResult, UsbControl};

const STATE_IDLE: u8 = 0x15;
const STATE_DATA: u8 = 0x16;

#[derive(Default)]
struct MockState {
    frames: VecDeque<Vec<u8>>,
    writes: Vec<(u16, Vec<u8>)>,
    eeprom: HashMap<u16, Vec<u8>>,
    pending_flash_addr: u16,
    connected: bool,
    fail_reads: u32,
}

/// Shared-state mock implementing [`UsbControl`].
#[derive(Clone)]
pub struct MockUsbControl {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockUsbControl {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUsbControl {
    /// A connected mock with factory-default EEPROM contents: serial
    /// `01020304050146`, device id `0x012e`, the documented frequency
    /// correction `0x184e8`.
    pub fn new() -> Self {
        let mut eeprom = HashMap::new();
        eeprom.insert(0x1f9, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x01, 0x2e]);
        eeprom.insert(0x1f5, vec![0x00, 0x01, 0x84, 0xe8]);
        Self {
            state: Arc::new(Mutex::new(MockState {
                connected: true,
                eeprom,
                ..MockState::default()
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a frame for the next `GetFrame`; the state byte reports
    /// data-available until the queue drains.
    pub fn queue_frame(&self, data: Vec<u8>) {
        self.lock().frames.push_back(data);
    }

    /// Frames queued but not yet read.
    pub fn queued_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// Every control write so far, as `(wValue, bytes)` pairs.
    pub fn write_history(&self) -> Vec<(u16, Vec<u8>)> {
        self.lock().writes.clone()
    }

    /// Control writes whose first payload byte matches `msg`.
    pub fn writes_of(&self, msg: u8) -> Vec<Vec<u8>> {
        self.lock()
            .writes
            .iter()
            .filter(|(_, data)| data.first() == Some(&msg))
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Override an EEPROM region.
    pub fn set_eeprom(&self, addr: u16, data: Vec<u8>) {
        self.lock().eeprom.insert(addr, data);
    }

    /// Drop the connection; every transfer fails until `reconnect`.
    pub fn disconnect(&self) {
        self.lock().connected = false;
    }

    /// Restore the connection.
    pub fn reconnect(&self) {
        self.lock().connected = true;
    }

    /// Fail the next `n` control reads with a transient error.
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().fail_reads = n;
    }
}

impl UsbControl for MockUsbControl {
    fn control_write(&mut self, value: u16, data: &[u8]) -> TransportResult<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        if value == 0x03dd && data.len() >= 4 {
            state.pending_flash_addr = (u16::from(data[2]) << 8) | u16::from(data[3]);
        }
        state.writes.push((value, data.to_vec()));
        Ok(())
    }

    fn control_read(&mut self, value: u16, len: usize) -> TransportResult<Vec<u8>> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(TransportError::Read {
                value,
                message: "injected fault".into(),
            });
        }
        match value {
            // GetState: data-available while frames are queued.
            0x03de => {
                let s = if state.frames.is_empty() {
                    STATE_IDLE
                } else {
                    STATE_DATA
                };
                Ok(vec![0xde, s, 0, 0, 0, 0])
            }
            // GetFrame.
            0x03d6 => {
                let frame = state.frames.pop_front().ok_or(TransportError::Read {
                    value,
                    message: "no frame available".into(),
                })?;
                let mut buf = vec![0u8; frame.len() + 3];
                buf[0] = 0xd6;
                buf[1] = (frame.len() >> 8) as u8;
                buf[2] = frame.len() as u8;
                buf[3..].copy_from_slice(&frame);
                Ok(buf)
            }
            // ReadConfigFlash response.
            0x03dc => {
                let addr = state.pending_flash_addr;
                let data = state.eeprom.get(&addr).cloned().unwrap_or_default();
                let mut buf = vec![0xff_u8; len.max(4)];
                buf[0] = 0xdc;
                buf[1] = 0x0a;
                buf[2] = (addr >> 8) as u8;
                buf[3] = addr as u8;
                for (i, b) in data.iter().take(16).enumerate() {
                    buf[4 + i] = *b;
                }
                Ok(buf)
            }
            other => Err(TransportError::Read {
                value: other,
                message: "unsupported read".into(),
            }),
        }
    }
}
