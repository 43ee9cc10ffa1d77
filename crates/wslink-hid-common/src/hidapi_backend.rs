//! Real dongle access through `hidapi` feature reports.

use hidapi::{HidApi, HidDevice};
use tracing::info;

use crate::{TransportError, TransportResult, UsbControl};

/// [`UsbControl`] over a hidapi device handle.
pub struct HidApiControl {
    device: HidDevice,
}

impl HidApiControl {
    /// Open the first attached dongle matching the vendor/product pair.
    pub fn open(vendor_id: u16, product_id: u16) -> TransportResult<Self> {
        let api = HidApi::new().map_err(|e| TransportError::Write {
            value: 0,
            message: format!("hidapi init: {e}"),
        })?;
        let device =
            api.open(vendor_id, product_id)
                .map_err(|_| TransportError::NotFound {
                    vendor_id,
                    product_id,
                })?;
        if let Ok(Some(product)) = device.get_product_string() {
            info!(%product, "opened transceiver");
        }
        Ok(Self { device })
    }
}

impl UsbControl for HidApiControl {
    fn control_write(&mut self, value: u16, data: &[u8]) -> TransportResult<()> {
        // Feature report id is the low byte of wValue, already the first
        // payload byte of every dongle message.
        self.device
            .send_feature_report(data)
            .map_err(|e| TransportError::Write {
                value,
                message: e.to_string(),
            })
    }

    fn control_read(&mut self, value: u16, len: usize) -> TransportResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        buf[0] = (value & 0xff) as u8;
        let n = self
            .device
            .get_feature_report(&mut buf)
            .map_err(|e| TransportError::Read {
                value,
                message: e.to_string(),
            })?;
        buf.truncate(n);
        Ok(buf)
    }
}
