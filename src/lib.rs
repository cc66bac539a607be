//! `ruuvitag-ble-sensor` library.
//!
//! RuuviTag advertisements are decoded into [`SensorUpdate`]s by
//! [`ruuvi::RuuvitagDeviceData`], mapped onto sensor entities by
//! [`sensor::sensor_update_to_bluetooth_data_update`] and delivered to
//! entities through the coordinator and processor in [`passive`].
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, logging setup
//! and process exit codes; the run loop lives in [`crate::app`].

pub mod alias;
pub mod app;
pub mod entity;
pub mod mac_address;
pub mod measurement;
pub mod output;
pub mod passive;
pub mod ruuvi;
pub mod scanner;
pub mod sensor;
pub mod sensor_data;
pub mod throttle;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use alias::{Alias, AliasMap, parse_alias};
pub use entity::{SensorEntityDescription, StateClass};
pub use mac_address::MacAddress;
pub use passive::{
    ConfigEntry, PassiveBluetoothDataProcessor, PassiveBluetoothDataUpdate,
    PassiveBluetoothEntityKey, PassiveBluetoothProcessorCoordinator,
};
pub use ruuvi::{DecodeError, RuuvitagDeviceData, decode_ruuvi_data};
pub use scanner::{Advertisement, ScanError, Scanner};
pub use sensor::{
    RuuvitagBluetoothSensorEntity, SENSOR_DESCRIPTIONS, sensor_update_to_bluetooth_data_update,
    setup_entry,
};
pub use sensor_data::{NativeValue, SensorUpdate};
pub use throttle::{Throttle, parse_duration};
