//! RuuviTag sensor entities.
//!
//! A fixed table decides which measurement kinds become entities. Kinds the
//! table does not list still have their values recorded but never get an
//! entity.

use crate::entity::{SensorEntityDescription, StateClass};
use crate::mac_address::MacAddress;
use crate::passive::{
    ConfigEntry, DeviceInfo, PassiveBluetoothDataProcessor, PassiveBluetoothDataUpdate,
    PassiveBluetoothEntityKey, PassiveBluetoothProcessorCoordinator, ProcessorHandle,
    sensor_device_info_to_device_info,
};
use crate::sensor_data::{
    DeviceKey, NativeValue, SensorDescription, SensorDeviceClass, SensorUpdate, Units,
};
use std::sync::Arc;

pub const TEMP_CELSIUS: &str = "°C";
pub const PERCENTAGE: &str = "%";
pub const PRESSURE_HPA: &str = "hPa";
pub const ELECTRIC_POTENTIAL_MILLIVOLT: &str = "mV";
pub const SIGNAL_STRENGTH_DECIBELS_MILLIWATT: &str = "dBm";

/// Lookup key into [`SENSOR_DESCRIPTIONS`].
pub type SensorKey = (SensorDeviceClass, Option<Units>);

/// Supported measurement kinds and the entity each one becomes.
pub static SENSOR_DESCRIPTIONS: [(SensorKey, SensorEntityDescription); 6] = [
    (
        (SensorDeviceClass::Temperature, Some(Units::TempCelsius)),
        SensorEntityDescription {
            key: "temperature_°C",
            device_class: Some(SensorDeviceClass::Temperature),
            native_unit_of_measurement: Some(TEMP_CELSIUS),
            state_class: Some(StateClass::Measurement),
            entity_registry_enabled_default: true,
        },
    ),
    (
        (SensorDeviceClass::Humidity, Some(Units::Percentage)),
        SensorEntityDescription {
            key: "humidity_%",
            device_class: Some(SensorDeviceClass::Humidity),
            native_unit_of_measurement: Some(PERCENTAGE),
            state_class: Some(StateClass::Measurement),
            entity_registry_enabled_default: true,
        },
    ),
    (
        (SensorDeviceClass::Pressure, Some(Units::PressureHpa)),
        SensorEntityDescription {
            key: "pressure_hPa",
            device_class: Some(SensorDeviceClass::Pressure),
            native_unit_of_measurement: Some(PRESSURE_HPA),
            state_class: Some(StateClass::Measurement),
            entity_registry_enabled_default: true,
        },
    ),
    (
        (
            SensorDeviceClass::Voltage,
            Some(Units::ElectricPotentialMillivolt),
        ),
        SensorEntityDescription {
            key: "voltage_mV",
            device_class: Some(SensorDeviceClass::Voltage),
            native_unit_of_measurement: Some(ELECTRIC_POTENTIAL_MILLIVOLT),
            state_class: Some(StateClass::Measurement),
            entity_registry_enabled_default: true,
        },
    ),
    (
        (
            SensorDeviceClass::SignalStrength,
            Some(Units::SignalStrengthDecibelsMilliwatt),
        ),
        SensorEntityDescription {
            key: "signal_strength_dBm",
            device_class: Some(SensorDeviceClass::SignalStrength),
            native_unit_of_measurement: Some(SIGNAL_STRENGTH_DECIBELS_MILLIWATT),
            state_class: Some(StateClass::Measurement),
            entity_registry_enabled_default: false,
        },
    ),
    (
        (SensorDeviceClass::Count, None),
        SensorEntityDescription {
            key: "movement_counter",
            device_class: Some(SensorDeviceClass::Count),
            native_unit_of_measurement: None,
            state_class: Some(StateClass::Measurement),
            entity_registry_enabled_default: false,
        },
    ),
];

/// Entity description for a measurement kind, if the kind is supported.
pub fn sensor_description(key: &SensorKey) -> Option<&'static SensorEntityDescription> {
    SENSOR_DESCRIPTIONS
        .iter()
        .find(|(table_key, _)| table_key == key)
        .map(|(_, description)| description)
}

fn device_key_to_bluetooth_entity_key(device_key: &DeviceKey) -> PassiveBluetoothEntityKey {
    PassiveBluetoothEntityKey::from(device_key)
}

/// Parsers always set a device class; a description without one has no
/// table entry.
fn to_sensor_key(description: &SensorDescription) -> Option<SensorKey> {
    debug_assert!(
        description.device_class.is_some(),
        "sensor description {:?} has no device class",
        description.device_key
    );
    description
        .device_class
        .map(|device_class| (device_class, description.native_unit_of_measurement))
}

/// Convert a parser update into an entity-level update.
pub fn sensor_update_to_bluetooth_data_update(
    sensor_update: &SensorUpdate,
) -> PassiveBluetoothDataUpdate<NativeValue> {
    let entity_descriptions = sensor_update
        .entity_descriptions
        .iter()
        .filter_map(|(device_key, description)| {
            let sensor_key = to_sensor_key(description)?;
            match sensor_description(&sensor_key) {
                Some(entity_description) => Some((
                    device_key_to_bluetooth_entity_key(device_key),
                    *entity_description,
                )),
                None => {
                    tracing::trace!(key = %device_key.key, "measurement kind has no entity");
                    None
                }
            }
        })
        .collect();

    PassiveBluetoothDataUpdate {
        devices: sensor_update
            .devices
            .iter()
            .map(|(device_id, device_info)| {
                (device_id.clone(), sensor_device_info_to_device_info(device_info))
            })
            .collect(),
        entity_descriptions,
        entity_data: sensor_update
            .entity_values
            .iter()
            .map(|(device_key, value)| {
                (device_key_to_bluetooth_entity_key(device_key), value.native_value)
            })
            .collect(),
        entity_names: sensor_update
            .entity_values
            .iter()
            .map(|(device_key, value)| {
                (device_key_to_bluetooth_entity_key(device_key), value.name.clone())
            })
            .collect(),
    }
}

/// Set up RuuviTag sensor entities for a configured device.
///
/// New entities are passed to `add_entities` as their measurements first
/// appear. Unloading `entry` detaches both the entity listener and the
/// processor.
pub fn setup_entry<A>(
    coordinator: &PassiveBluetoothProcessorCoordinator,
    entry: &mut ConfigEntry,
    add_entities: A,
) where
    A: FnMut(Vec<RuuvitagBluetoothSensorEntity>) + Send + 'static,
{
    let address = coordinator.address();
    let processor = Arc::new(PassiveBluetoothDataProcessor::new(
        sensor_update_to_bluetooth_data_update,
    ));

    entry.on_unload(processor.add_entities_listener(
        move |processor, entity_key, entity_description| {
            RuuvitagBluetoothSensorEntity::new(processor, address, entity_key, entity_description)
        },
        add_entities,
    ));
    entry.on_unload(coordinator.register_processor(processor));

    tracing::info!(entry_id = %entry.entry_id, title = %entry.title, "sensor platform set up");
}

/// A RuuviTag BLE sensor.
#[derive(Debug, Clone)]
pub struct RuuvitagBluetoothSensorEntity {
    processor: ProcessorHandle<NativeValue>,
    entity_key: PassiveBluetoothEntityKey,
    entity_description: SensorEntityDescription,
    unique_id: String,
}

impl RuuvitagBluetoothSensorEntity {
    pub fn new(
        processor: ProcessorHandle<NativeValue>,
        address: MacAddress,
        entity_key: PassiveBluetoothEntityKey,
        entity_description: SensorEntityDescription,
    ) -> Self {
        let unique_id = match &entity_key.device_id {
            Some(device_id) => format!("{address}-{}-{device_id}", entity_key.key),
            None => format!("{address}-{}", entity_key.key),
        };
        Self {
            processor,
            entity_key,
            entity_description,
            unique_id,
        }
    }

    /// Latest value for this entity, or `None` before the first one arrives.
    pub fn native_value(&self) -> Option<NativeValue> {
        self.processor.entity_data(&self.entity_key)
    }

    pub fn entity_key(&self) -> &PassiveBluetoothEntityKey {
        &self.entity_key
    }

    pub fn entity_description(&self) -> &SensorEntityDescription {
        &self.entity_description
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> String {
        self.processor
            .entity_name(&self.entity_key)
            .unwrap_or_else(|| self.entity_key.key.clone())
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.processor.device_info(&self.entity_key.device_id)
    }

    pub fn available(&self) -> bool {
        self.processor.last_update_success() && self.native_value().is_some()
    }
}
