//! JSON lines output.

use super::{EntityState, FormatError, OutputFormatter};

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, state: &EntityState) -> Result<String, FormatError> {
        Ok(serde_json::to_string(state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::temperature_state;
    use serde_json::{Value, json};

    #[test]
    fn test_format_fields() {
        let line = JsonFormatter.format(&temperature_state()).unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            json!({
                "unique_id": "AA:BB:CC:DD:EE:FF-temperature",
                "address": "AA:BB:CC:DD:EE:FF",
                "device": "Sauna",
                "name": "Temperature",
                "state": 80.5,
                "unit": "°C",
                "device_class": "temperature",
                "state_class": "measurement",
            })
        );
    }

    #[test]
    fn test_format_omits_missing_metadata() {
        let mut state = temperature_state();
        state.unit = None;
        state.device_class = None;
        state.state_class = None;
        let line = JsonFormatter.format(&state).unwrap();
        assert!(!line.contains("\"unit\""));
        assert!(!line.contains("\"device_class\""));
        assert!(!line.contains("\"state_class\""));
        assert!(!line.contains('\n'));
    }
}
