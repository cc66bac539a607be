//! BLE scanning for RuuviTag advertisements.
//!
//! Scanners only filter and forward raw advertisements; turning them into
//! measurements happens per device in the coordinator.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::mac_address::MacAddress;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Backend not available (not compiled in)
    #[error("Backend '{0}' not available (not compiled in)")]
    BackendNotAvailable(String),
}

/// Ruuvi Innovations manufacturer ID.
///
/// Used when looking up manufacturer-specific data from device advertisements.
/// See: https://github.com/ruuvi/ruuvi-sensor-protocols
pub const RUUVI_MANUFACTURER_ID: u16 = 0x0499;

/// Ruuvi manufacturer ID as little-endian bytes, as it appears on air.
pub const RUUVI_MANUFACTURER_ID_BYTES: [u8; 2] = RUUVI_MANUFACTURER_ID.to_le_bytes();

/// Bluetooth manufacturer-specific data type (AD type 0xFF)
pub const MANUFACTURER_DATA_TYPE: u8 = 0xff;

/// Channel buffer size for advertisements.
pub const ADVERTISEMENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// One observed RuuviTag advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub mac: MacAddress,
    /// Received signal strength in dBm.
    pub rssi: Option<i16>,
    /// Ruuvi manufacturer data, without the company ID prefix.
    pub manufacturer_data: Vec<u8>,
}

/// Future returned by [`Scanner::start_scan`].
pub type ScanFuture<'a> =
    Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + 'a>>;

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(&self) -> ScanFuture<'_>;
}

/// Real scanner implementation that delegates to the compiled-in backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(&self) -> ScanFuture<'_> {
        Box::pin(async move {
            #[cfg(feature = "bluer")]
            return bluer::start_scan().await;
            #[cfg(not(feature = "bluer"))]
            return Err(ScanError::BackendNotAvailable("bluer".to_string()));
        })
    }
}
