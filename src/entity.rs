//! Platform-side sensor entity metadata.

use crate::sensor_data::SensorDeviceClass;
use serde::Serialize;

/// How the state of a sensor should be interpreted over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// A measurement in present time, e.g. current temperature.
    Measurement,
    /// A total amount that can both increase and decrease.
    Total,
    /// A monotonically increasing total.
    TotalIncreasing,
}

/// Static description of a kind of sensor entity.
///
/// Descriptions are defined at compile time and never change; entities
/// reference them by value since the type is `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorEntityDescription {
    /// Stable key, used as part of the entity's unique id.
    pub key: &'static str,
    pub device_class: Option<SensorDeviceClass>,
    pub native_unit_of_measurement: Option<&'static str>,
    pub state_class: Option<StateClass>,
    /// Whether a newly registered entity starts out enabled.
    pub entity_registry_enabled_default: bool,
}

impl SensorEntityDescription {
    /// A description with no metadata besides the key, enabled by default.
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            device_class: None,
            native_unit_of_measurement: None,
            state_class: None,
            entity_registry_enabled_default: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_description_defaults() {
        let description = SensorEntityDescription::new("battery");
        assert_eq!(description.key, "battery");
        assert!(description.entity_registry_enabled_default);
        assert!(description.device_class.is_none());
        assert!(description.state_class.is_none());
    }

    #[test]
    fn test_state_class_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StateClass::TotalIncreasing).unwrap(),
            "\"total_increasing\""
        );
    }
}
