//! Pedal access over USB HID

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidError {
    #[error("Failed to initialize HID API")]
    Init(#[source] hidapi::HidError),

    #[error(
        "Failed to open pedal {vendor_id:04x}:{product_id:04x}. \
         Is it plugged in, and does this user have access to its hidraw node?"
    )]
    Open {
        vendor_id: u16,
        product_id: u16,
        #[source]
        source: hidapi::HidError,
    },

    #[error("Failed to read pedal report")]
    Read(#[source] hidapi::HidError),
}

/// Anything that yields raw pedal reports.
pub trait ReportSource {
    /// Read one report into `buf`, waiting at most `timeout`.
    ///
    /// Returns the number of bytes read; `0` means the wait timed out.
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, HidError>;
}

/// An opened pedal
pub struct PedalDevice {
    device: HidDevice,
    // Kept alive for as long as the device handle is in use
    _api: HidApi,
}

impl PedalDevice {
    /// Open the first HID device matching `vendor_id:product_id`.
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self, HidError> {
        let api = HidApi::new().map_err(HidError::Init)?;

        let device = api
            .open(vendor_id, product_id)
            .map_err(|source| HidError::Open {
                vendor_id,
                product_id,
                source,
            })?;

        device
            .set_blocking_mode(false)
            .map_err(|source| HidError::Open {
                vendor_id,
                product_id,
                source,
            })?;

        let product = device
            .get_product_string()
            .ok()
            .flatten()
            .unwrap_or_else(|| "Unknown".to_string());
        tracing::info!(
            "Opened pedal '{}' ({:04x}:{:04x})",
            product,
            vendor_id,
            product_id
        );

        Ok(Self { device, _api: api })
    }
}

impl ReportSource for PedalDevice {
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, HidError> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(HidError::Read)
    }
}
