//! RuuviTag measurement data structure.

use crate::mac_address::MacAddress;

/// RuuviTag data formats this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// RAWv2, sent by RuuviTag sensors.
    V5,
    /// Sent by the Ruuvi Air quality monitor.
    V6,
}

impl DataFormat {
    pub const fn model(&self) -> &'static str {
        match self {
            DataFormat::V5 => "RuuviTag",
            DataFormat::V6 => "Ruuvi Air",
        }
    }
}

/// A decoded measurement from a RuuviTag sensor.
///
/// All values are in the units the decoder reports them in:
/// - Temperature in Celsius
/// - Humidity in percent (0-100)
/// - Pressure in Pascals
/// - Battery voltage in millivolts
/// - Acceleration in milli-g
/// - PM2.5 in micrograms per cubic meter (ug/m3)
/// - CO2 in parts per million (ppm)
/// - VOC/NOx indexes are unitless scores
/// - Luminosity in lux
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub mac: MacAddress,
    pub format: DataFormat,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub movement_counter: Option<u32>,
    /// Acceleration vector (x, y, z) in milli-g
    pub acceleration: Option<(f64, f64, f64)>,
    pub pm2_5: Option<f64>,
    pub co2: Option<f64>,
    pub voc_index: Option<f64>,
    pub nox_index: Option<f64>,
    pub luminosity: Option<f64>,
}
