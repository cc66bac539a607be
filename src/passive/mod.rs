//! Passive Bluetooth update processing.
//!
//! Nothing here connects to a device. A [`PassiveBluetoothProcessorCoordinator`]
//! is fed advertisements for one address, turns each into a
//! [`SensorUpdate`](crate::sensor_data::SensorUpdate) with its device parser
//! and hands it to every registered [`PassiveBluetoothDataProcessor`], which in
//! turn maps it onto entities.

pub mod coordinator;
pub mod entry;
pub mod processor;

pub use coordinator::PassiveBluetoothProcessorCoordinator;
pub use entry::ConfigEntry;
pub use processor::{PassiveBluetoothDataProcessor, ProcessorHandle, UpdateProcessor};

use crate::entity::SensorEntityDescription;
use crate::sensor_data::{DeviceKey, SensorDeviceInfo};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identifies one entity of one (sub)device behind a coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassiveBluetoothEntityKey {
    pub key: String,
    pub device_id: Option<String>,
}

impl PassiveBluetoothEntityKey {
    pub fn new(key: impl Into<String>, device_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            device_id,
        }
    }
}

impl From<&DeviceKey> for PassiveBluetoothEntityKey {
    fn from(device_key: &DeviceKey) -> Self {
        Self::new(device_key.key.clone(), device_key.device_id.clone())
    }
}

/// Device registry information for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
}

/// Convert parser device info into device registry info.
pub fn sensor_device_info_to_device_info(device_info: &SensorDeviceInfo) -> DeviceInfo {
    DeviceInfo {
        name: device_info.name.clone(),
        model: device_info.model.clone(),
        manufacturer: device_info.manufacturer.clone(),
        sw_version: device_info.sw_version.clone(),
        hw_version: device_info.hw_version.clone(),
    }
}

/// Entity-level view of one or more advertisements.
#[derive(Debug, Clone, PartialEq)]
pub struct PassiveBluetoothDataUpdate<T> {
    pub devices: HashMap<Option<String>, DeviceInfo>,
    pub entity_descriptions: HashMap<PassiveBluetoothEntityKey, SensorEntityDescription>,
    pub entity_data: HashMap<PassiveBluetoothEntityKey, T>,
    pub entity_names: HashMap<PassiveBluetoothEntityKey, String>,
}

impl<T> Default for PassiveBluetoothDataUpdate<T> {
    fn default() -> Self {
        Self {
            devices: HashMap::new(),
            entity_descriptions: HashMap::new(),
            entity_data: HashMap::new(),
            entity_names: HashMap::new(),
        }
    }
}

impl<T: Clone> PassiveBluetoothDataUpdate<T> {
    /// Fold a newer update into this one; later entries win.
    pub fn merge(&mut self, newer: &PassiveBluetoothDataUpdate<T>) {
        self.devices
            .extend(newer.devices.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.entity_descriptions
            .extend(newer.entity_descriptions.iter().map(|(k, v)| (k.clone(), *v)));
        self.entity_data
            .extend(newer.entity_data.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.entity_names
            .extend(newer.entity_names.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Handle returned when registering a listener or processor.
///
/// Calling [`RemoveListener::remove`] undoes the registration. Dropping the
/// handle without calling it leaves the registration in place.
pub struct RemoveListener(Box<dyn FnOnce() + Send>);

impl RemoveListener {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(remove))
    }

    pub fn remove(self) {
        (self.0)()
    }
}

impl fmt::Debug for RemoveListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveListener").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_entity_key_from_device_key() {
        let device_key = DeviceKey::new("temperature", Some("sub".to_string()));
        let entity_key = PassiveBluetoothEntityKey::from(&device_key);
        assert_eq!(entity_key.key, device_key.key);
        assert_eq!(entity_key.device_id, device_key.device_id);
    }

    #[test]
    fn test_device_info_adapter_copies_fields() {
        let info = SensorDeviceInfo {
            name: Some("RuuviTag EEFF".to_string()),
            model: Some("RuuviTag".to_string()),
            manufacturer: Some("Ruuvi Innovations Ltd.".to_string()),
            sw_version: None,
            hw_version: None,
        };
        let device_info = sensor_device_info_to_device_info(&info);
        assert_eq!(device_info.name.as_deref(), Some("RuuviTag EEFF"));
        assert_eq!(device_info.model.as_deref(), Some("RuuviTag"));
        assert_eq!(
            serde_json::to_string(&device_info).unwrap(),
            r#"{"name":"RuuviTag EEFF","model":"RuuviTag","manufacturer":"Ruuvi Innovations Ltd."}"#
        );
    }

    #[test]
    fn test_merge_overwrites_and_keeps_older_keys() {
        let humidity = PassiveBluetoothEntityKey::new("humidity", None);
        let temperature = PassiveBluetoothEntityKey::new("temperature", None);

        let mut older = PassiveBluetoothDataUpdate::<f64>::default();
        older.entity_data.insert(humidity.clone(), 40.0);
        older.entity_data.insert(temperature.clone(), 20.0);

        let mut newer = PassiveBluetoothDataUpdate::<f64>::default();
        newer.entity_data.insert(temperature.clone(), 21.0);

        older.merge(&newer);
        assert_eq!(older.entity_data[&humidity], 40.0);
        assert_eq!(older.entity_data[&temperature], 21.0);
    }

    #[test]
    fn test_remove_listener_runs_callback() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let handle = RemoveListener::new(move || flag.store(true, Ordering::SeqCst));
        assert!(!called.load(Ordering::SeqCst));
        handle.remove();
        assert!(called.load(Ordering::SeqCst));
    }
}
