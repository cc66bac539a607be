//! BlueZ D-Bus backend for RuuviTag scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{
    ADVERTISEMENT_CHANNEL_BUFFER_SIZE, Advertisement, MANUFACTURER_DATA_TYPE,
    RUUVI_MANUFACTURER_ID, RUUVI_MANUFACTURER_ID_BYTES, ScanError,
};
use crate::mac_address::MacAddress;
use bluer::monitor::{Monitor, MonitorEvent, Pattern};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use tokio::sync::mpsc;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Start a passive scan for RuuviTag advertisements.
///
/// Advertisements are forwarded through the returned channel until the
/// receiver is dropped.
pub async fn start_scan() -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    tracing::info!(adapter = %adapter.name(), "scanning for RuuviTags");

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    let pattern = Pattern {
        data_type: MANUFACTURER_DATA_TYPE,
        start_position: 0,
        content: RUUVI_MANUFACTURER_ID_BYTES.to_vec(),
    };

    let monitor_manager = adapter.monitor().await?;
    let mut monitor_handle = monitor_manager
        .register(Monitor {
            patterns: Some(vec![pattern]),
            ..Default::default()
        })
        .await?;

    // The task owns all Bluetooth state so the monitor stays registered.
    tokio::spawn(async move {
        let _session = session;
        let _monitor_manager = monitor_manager;

        while let Some(event) = monitor_handle.next().await {
            let MonitorEvent::DeviceFound(device_id) = event else {
                continue;
            };
            match read_advertisement(&adapter, device_id.device).await {
                Ok(Some(advertisement)) => {
                    if tx.send(advertisement).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(error) => tracing::debug!(%error, "failed to read advertisement"),
            }
        }
    });

    Ok(rx)
}

/// Read the Ruuvi manufacturer data of a discovered device, if it has any.
async fn read_advertisement(
    adapter: &Adapter,
    address: Address,
) -> Result<Option<Advertisement>, ScanError> {
    let device = adapter.device(address)?;

    let Some(mut manufacturer_data) = device.manufacturer_data().await? else {
        return Ok(None);
    };
    let Some(ruuvi_data) = manufacturer_data.remove(&RUUVI_MANUFACTURER_ID) else {
        return Ok(None);
    };

    Ok(Some(Advertisement {
        mac: MacAddress::from(address),
        rssi: device.rssi().await?,
        manufacturer_data: ruuvi_data,
    }))
}
