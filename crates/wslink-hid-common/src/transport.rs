//! The five dongle operations, typed over [`UsbControl`].

use tracing::trace;

use crate::{TransportError, TransportResult, UsbControl};

/// Largest buffer exchanged by `SetFrame`/`GetFrame`.
pub const MAX_FRAME_SIZE: usize = 273;

const MSG_SET_RX: u8 = 0xd0;
const MSG_SET_TX: u8 = 0xd1;
const MSG_SET_FRAME: u8 = 0xd5;
const MSG_GET_FRAME: u8 = 0xd6;
const MSG_SET_STATE: u8 = 0xd7;
const MSG_SET_PREAMBLE: u8 = 0xd8;
const MSG_EXECUTE: u8 = 0xd9;
const MSG_READ_FLASH_IN: u8 = 0xdc;
const MSG_READ_FLASH_OUT: u8 = 0xdd;
const MSG_GET_STATE: u8 = 0xde;
const MSG_WRITE_REG: u8 = 0xf0;

const SHORT_COMMAND_LEN: usize = 0x15;
const EXECUTE_LEN: usize = 0x0f;
const FLASH_REQUEST_LEN: usize = 0x0f;
const FLASH_RESPONSE_LEN: usize = 0x15;
const STATE_LEN: usize = 0x0a;

fn wvalue(msg: u8) -> u16 {
    0x0300 | u16::from(msg)
}

/// A frame pulled from the dongle: raw bytes, length from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DongleFrame {
    /// Frame bytes, header stripped.
    pub data: Vec<u8>,
}

/// Typed dongle operations over a raw control-transfer implementation.
pub struct Transport<C: UsbControl> {
    usb: C,
}

impl<C: UsbControl> Transport<C> {
    /// Wrap a USB control channel.
    pub fn new(usb: C) -> Self {
        Self { usb }
    }

    /// Access the underlying channel (used by tests to reach the mock).
    pub fn usb_mut(&mut self) -> &mut C {
        &mut self.usb
    }

    /// Write one AX5051 register. Only used during transceiver init.
    pub fn write_register(&mut self, addr: u8, value: u8) -> TransportResult<()> {
        let buf = [MSG_WRITE_REG, addr & 0x7f, 0x01, value, 0x00];
        self.usb.control_write(wvalue(MSG_WRITE_REG), &buf)
    }

    fn short_command(&mut self, msg: u8, arg: u8, len: usize) -> TransportResult<()> {
        let mut buf = vec![0u8; len];
        buf[0] = msg;
        buf[1] = arg;
        trace!(msg = format_args!("{msg:#04x}"), arg, "short command");
        self.usb.control_write(wvalue(msg), &buf)
    }

    /// Switch the RF section to receive.
    pub fn set_rx(&mut self) -> TransportResult<()> {
        self.short_command(MSG_SET_RX, 0, SHORT_COMMAND_LEN)
    }

    /// Switch the RF section to transmit.
    pub fn set_tx(&mut self) -> TransportResult<()> {
        self.short_command(MSG_SET_TX, 0, SHORT_COMMAND_LEN)
    }

    /// Set the dongle state byte.
    pub fn set_state(&mut self, state: u8) -> TransportResult<()> {
        self.short_command(MSG_SET_STATE, state, SHORT_COMMAND_LEN)
    }

    /// Program the RF preamble pattern.
    pub fn set_preamble_pattern(&mut self, pattern: u8) -> TransportResult<()> {
        self.short_command(MSG_SET_PREAMBLE, pattern, SHORT_COMMAND_LEN)
    }

    /// Execute a dongle command; `0x05` arms the receiver.
    pub fn execute(&mut self, command: u8) -> TransportResult<()> {
        self.short_command(MSG_EXECUTE, command, EXECUTE_LEN)
    }

    /// Poll the dongle state byte.
    pub fn read_state(&mut self) -> TransportResult<u8> {
        let buf = self.usb.control_read(wvalue(MSG_GET_STATE), STATE_LEN)?;
        buf.get(1).copied().ok_or(TransportError::Read {
            value: wvalue(MSG_GET_STATE),
            message: format!("short state buffer ({} bytes)", buf.len()),
        })
    }

    /// Write a frame buffer. `data` is the sealed frame; the dongle header
    /// carries its length big-endian.
    pub fn write_frame(&mut self, data: &[u8]) -> TransportResult<()> {
        debug_assert!(data.len() <= MAX_FRAME_SIZE);
        let mut buf = vec![0u8; data.len() + 3];
        buf[0] = MSG_SET_FRAME;
        buf[1] = (data.len() >> 8) as u8;
        buf[2] = data.len() as u8;
        buf[3..].copy_from_slice(data);
        trace!(len = data.len(), "write frame");
        self.usb.control_write(wvalue(MSG_SET_FRAME), &buf)
    }

    /// Read a frame buffer; the length comes from the dongle header.
    pub fn read_frame(&mut self) -> TransportResult<DongleFrame> {
        let buf = self
            .usb
            .control_read(wvalue(MSG_GET_FRAME), MAX_FRAME_SIZE + 3)?;
        if buf.len() < 3 {
            return Err(TransportError::Read {
                value: wvalue(MSG_GET_FRAME),
                message: format!("short frame buffer ({} bytes)", buf.len()),
            });
        }
        let len = ((usize::from(buf[1]) << 8) | usize::from(buf[2])) & 0x1ff;
        if buf.len() < 3 + len {
            return Err(TransportError::Read {
                value: wvalue(MSG_GET_FRAME),
                message: format!("frame header claims {len} bytes, got {}", buf.len() - 3),
            });
        }
        trace!(len, "read frame");
        Ok(DongleFrame {
            data: buf[3..3 + len].to_vec(),
        })
    }

    /// Read `n` bytes of dongle EEPROM starting at `addr`, 16 bytes per
    /// exchange.
    pub fn read_config_flash(&mut self, mut addr: u16, n: usize) -> TransportResult<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let mut req = [0xcc_u8; FLASH_REQUEST_LEN];
            req[0] = MSG_READ_FLASH_OUT;
            req[1] = 0x0a;
            req[2] = (addr >> 8) as u8;
            req[3] = addr as u8;
            self.usb.control_write(wvalue(MSG_READ_FLASH_OUT), &req)?;

            let buf = self
                .usb
                .control_read(wvalue(MSG_READ_FLASH_IN), FLASH_RESPONSE_LEN)?;
            if buf.len() < 4 {
                return Err(TransportError::Read {
                    value: wvalue(MSG_READ_FLASH_IN),
                    message: format!("short flash buffer ({} bytes)", buf.len()),
                });
            }
            let chunk = remaining.min(16).min(buf.len() - 4);
            out.extend_from_slice(&buf[4..4 + chunk]);
            remaining -= chunk;
            addr += chunk as u16;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockUsbControl;

    #[test]
    fn test_write_register_layout() {
        let mock = MockUsbControl::new();
        let mut transport = Transport::new(mock.clone());
        transport
            .write_register(0x10, 0x41)
            .expect("register write");
        let writes = mock.write_history();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, vec![0xf0, 0x10, 0x01, 0x41, 0x00]);
        assert_eq!(writes[0].0, 0x03f0);
    }

    #[test]
    fn test_frame_round_trip_through_mock() {
        let mock = MockUsbControl::new();
        let mut transport = Transport::new(mock.clone());
        let payload = vec![0x01, 0x2e, 0x20, 0x64, 0x04, 0xcb];
        mock.queue_frame(payload.clone());

        assert_eq!(transport.read_state().expect("state"), 0x16);
        let frame = transport.read_frame().expect("frame");
        assert_eq!(frame.data, payload);
        // Drained queue reads back as idle.
        assert_eq!(transport.read_state().expect("state"), 0x15);
    }

    #[test]
    fn test_write_frame_header() {
        let mock = MockUsbControl::new();
        let mut transport = Transport::new(mock.clone());
        transport.write_frame(&[0xaa; 9]).expect("frame write");
        let writes = mock.write_history();
        assert_eq!(writes[0].1[..3], [0xd5, 0x00, 0x09]);
        assert_eq!(writes[0].1.len(), 12);
    }

    #[test]
    fn test_read_config_flash_pages() {
        let mock = MockUsbControl::new();
        mock.set_eeprom(0x1f9, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x01, 0x2e]);
        let mut transport = Transport::new(mock.clone());
        let data = transport.read_config_flash(0x1f9, 7).expect("flash read");
        assert_eq!(data, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x01, 0x2e]);
    }

    #[test]
    fn test_disconnect_surfaces_error() {
        let mock = MockUsbControl::new();
        mock.disconnect();
        let mut transport = Transport::new(mock);
        assert!(matches!(
            transport.set_rx(),
            Err(TransportError::Disconnected)
        ));
    }
}
