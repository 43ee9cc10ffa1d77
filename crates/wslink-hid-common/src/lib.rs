//! USB control-transfer layer for the WS-28xx transceiver dongle.
//!
//! The dongle speaks HID feature reports on endpoint 0: every message is a
//! control write or read whose `wValue` is `0x0300 | message_id`. This
//! crate exposes the seam as the [`UsbControl`] trait, the typed
//! [`Transport`] on top of it, and a scripted [`mock`] for tests.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod mock;
pub mod transport;

#[cfg(feature = "backend-hidapi")]
pub mod hidapi_backend;

pub use transport::{DongleFrame, Transport};

use thiserror::Error;

/// Transport-level failures. Always retryable by the layer above.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// No dongle with the expected vendor/product id is attached.
    #[error("transceiver not found (vendor {vendor_id:#06x}, product {product_id:#06x})")]
    NotFound {
        /// Expected USB vendor id.
        vendor_id: u16,
        /// Expected USB product id.
        product_id: u16,
    },

    /// A control write failed.
    #[error("control write {value:#06x} failed: {message}")]
    Write {
        /// The `wValue` of the failed transfer.
        value: u16,
        /// Underlying error text.
        message: String,
    },

    /// A control read failed or returned a short buffer.
    #[error("control read {value:#06x} failed: {message}")]
    Read {
        /// The `wValue` of the failed transfer.
        value: u16,
        /// Underlying error text.
        message: String,
    },

    /// The dongle was unplugged mid-session.
    #[error("transceiver disconnected")]
    Disconnected,
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Raw USB control-transfer primitives the dongle driver consumes.
///
/// `value` is the HID `wValue` (`0x0300 | message_id`); implementations map
/// this onto feature-report set/get or an equivalent control transfer.
pub trait UsbControl: Send {
    /// Issue a control write carrying `data`.
    fn control_write(&mut self, value: u16, data: &[u8]) -> TransportResult<()>;

    /// Issue a control read of up to `len` bytes.
    fn control_read(&mut self, value: u16, len: usize) -> TransportResult<Vec<u8>>;
}
