//! Output formatters for entity states.
//!
//! Each formatter turns one [`EntityState`] into one line of output.

pub mod json;
pub mod text;

use crate::entity::StateClass;
use crate::mac_address::MacAddress;
use crate::sensor::RuuvitagBluetoothSensorEntity;
use crate::sensor_data::{NativeValue, SensorDeviceClass};
use serde::Serialize;
use thiserror::Error;

pub use json::JsonFormatter;
pub use text::TextFormatter;

/// Errors returned by output formatters.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The current state of one entity, ready to be written out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub address: MacAddress,
    pub device: String,
    pub name: String,
    pub state: NativeValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<SensorDeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
}

impl EntityState {
    /// Snapshot `entity`, or `None` if it has no value yet.
    pub fn from_entity(
        entity: &RuuvitagBluetoothSensorEntity,
        address: MacAddress,
        device: &str,
    ) -> Option<Self> {
        let state = entity.native_value()?;
        let description = entity.entity_description();
        Some(Self {
            unique_id: entity.unique_id().to_string(),
            address,
            device: device.to_string(),
            name: entity.name(),
            state,
            unit: description.native_unit_of_measurement,
            device_class: description.device_class,
            state_class: description.state_class,
        })
    }
}

/// Trait for formatting entity states into output lines.
pub trait OutputFormatter: Send + Sync {
    fn format(&self, state: &EntityState) -> Result<String, FormatError>;
}

/// Output formats selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `<device> <entity>: <value> <unit>`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}
