//! Device-independent sensor readings produced by device parsers.
//!
//! A parser turns one advertisement into a [`SensorUpdate`]: which devices
//! were seen, what kind of measurement each key carries and the value it
//! carried in this packet. The entity layer in [`crate::sensor`] decides
//! which of those measurement kinds become entities.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Classification of a physical measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorDeviceClass {
    Temperature,
    Humidity,
    Pressure,
    Voltage,
    SignalStrength,
    Count,
    Acceleration,
    Pm25,
    CarbonDioxide,
    VolatileOrganicCompounds,
    NitrogenOxides,
    Illuminance,
}

impl SensorDeviceClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SensorDeviceClass::Temperature => "temperature",
            SensorDeviceClass::Humidity => "humidity",
            SensorDeviceClass::Pressure => "pressure",
            SensorDeviceClass::Voltage => "voltage",
            SensorDeviceClass::SignalStrength => "signal_strength",
            SensorDeviceClass::Count => "count",
            SensorDeviceClass::Acceleration => "acceleration",
            SensorDeviceClass::Pm25 => "pm25",
            SensorDeviceClass::CarbonDioxide => "carbon_dioxide",
            SensorDeviceClass::VolatileOrganicCompounds => "volatile_organic_compounds",
            SensorDeviceClass::NitrogenOxides => "nitrogen_oxides",
            SensorDeviceClass::Illuminance => "illuminance",
        }
    }
}

impl fmt::Display for SensorDeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit a parser reports a measurement in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Units {
    TempCelsius,
    Percentage,
    PressureHpa,
    ElectricPotentialMillivolt,
    SignalStrengthDecibelsMilliwatt,
    AccelerationMilliG,
    ConcentrationMicrogramsPerCubicMeter,
    ConcentrationPartsPerMillion,
    LightLux,
}

impl Units {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Units::TempCelsius => "°C",
            Units::Percentage => "%",
            Units::PressureHpa => "hPa",
            Units::ElectricPotentialMillivolt => "mV",
            Units::SignalStrengthDecibelsMilliwatt => "dBm",
            Units::AccelerationMilliG => "mG",
            Units::ConcentrationMicrogramsPerCubicMeter => "µg/m³",
            Units::ConcentrationPartsPerMillion => "ppm",
            Units::LightLux => "lx",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one measurement of one device within an update.
///
/// `device_id` is `None` for the primary device of the advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    pub key: String,
    pub device_id: Option<String>,
}

impl DeviceKey {
    pub fn new(key: impl Into<String>, device_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            device_id,
        }
    }
}

/// What kind of measurement a [`DeviceKey`] carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDescription {
    pub device_key: DeviceKey,
    pub device_class: Option<SensorDeviceClass>,
    pub native_unit_of_measurement: Option<Units>,
}

/// A measured value, kept as the parser produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NativeValue {
    Int(i64),
    Float(f64),
}

impl NativeValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            NativeValue::Int(v) => v as f64,
            NativeValue::Float(v) => v,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Int(v) => write!(f, "{v}"),
            NativeValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Int(value)
    }
}

impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        NativeValue::Float(value)
    }
}

/// The value of one measurement in one advertisement.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorValue {
    pub device_key: DeviceKey,
    pub name: String,
    pub native_value: NativeValue,
}

/// Parser-side device metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorDeviceInfo {
    pub name: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub sw_version: Option<String>,
    pub hw_version: Option<String>,
}

/// Snapshot of everything one advertisement told us.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorUpdate {
    pub title: Option<String>,
    pub devices: HashMap<Option<String>, SensorDeviceInfo>,
    pub entity_descriptions: HashMap<DeviceKey, SensorDescription>,
    pub entity_values: HashMap<DeviceKey, SensorValue>,
}

impl SensorUpdate {
    /// Record one measurement of the primary device.
    pub fn update_sensor(
        &mut self,
        key: &str,
        unit: Option<Units>,
        value: impl Into<NativeValue>,
        device_class: SensorDeviceClass,
        name: &str,
    ) {
        let device_key = DeviceKey::new(key, None);
        self.entity_descriptions.insert(
            device_key.clone(),
            SensorDescription {
                device_key: device_key.clone(),
                device_class: Some(device_class),
                native_unit_of_measurement: unit,
            },
        );
        self.entity_values.insert(
            device_key.clone(),
            SensorValue {
                device_key,
                name: name.to_string(),
                native_value: value.into(),
            },
        );
    }
}
