//! Plain text output, one entity per line.

use super::{EntityState, FormatError, OutputFormatter};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format(&self, state: &EntityState) -> Result<String, FormatError> {
        let mut line = format!("{} {}: {}", state.device, state.name, state.state);
        if let Some(unit) = state.unit {
            // Writing to a String cannot fail.
            let _ = write!(line, " {unit}");
        }
        Ok(line)
    }
}
