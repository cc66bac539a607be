//! RuuviTag advertisement parser.
//!
//! Payload decoding is done by `ruuvi-decoders`; this module turns the decoded
//! values into a [`SensorUpdate`] that the entity layer understands.

use crate::mac_address::MacAddress;
use crate::measurement::{DataFormat, Measurement};
use crate::scanner::Advertisement;
use crate::sensor_data::{SensorDeviceClass, SensorDeviceInfo, SensorUpdate, Units};
use ruuvi_decoders::{v5, v6};
use thiserror::Error;

pub const MANUFACTURER: &str = "Ruuvi Innovations Ltd.";

/// Error types for decoding RuuviTag data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Unsupported RuuviTag data format (e.g., V2, V3, V4)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Invalid or corrupted data that cannot be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Decoder library returned an error
    #[error("Decoder error: {0}")]
    DecoderError(String),
}

/// Decode manufacturer data from a RuuviTag into a Measurement.
///
/// # Arguments
/// * `mac` - The MAC address of the device
/// * `data` - The manufacturer-specific data bytes (without the company ID prefix)
pub fn decode_ruuvi_data(mac: MacAddress, data: &[u8]) -> Result<Measurement, DecodeError> {
    match data.first() {
        None => Err(DecodeError::InvalidData("Empty data".into())),
        Some(5) => decode_v5_measurement(mac, data),
        Some(6) => decode_v6_measurement(mac, data),
        Some(format) => Err(DecodeError::UnsupportedFormat(format!(
            "RuuviTag data format {format} (only V5 and V6 supported)"
        ))),
    }
}

fn decode_v5_measurement(mac: MacAddress, data: &[u8]) -> Result<Measurement, DecodeError> {
    let tag = v5::decode(data).map_err(|e| {
        DecodeError::DecoderError(format!("Failed to decode RuuviTag data: {e:?}"))
    })?;

    let acceleration = match (tag.acceleration_x, tag.acceleration_y, tag.acceleration_z) {
        (Some(x), Some(y), Some(z)) => Some((f64::from(x), f64::from(y), f64::from(z))),
        _ => None,
    };

    Ok(Measurement {
        mac,
        format: DataFormat::V5,
        temperature: tag.temperature,
        humidity: tag.humidity,
        pressure: tag.pressure,
        battery_voltage: tag.battery_voltage.map(f64::from),
        movement_counter: tag.movement_counter.map(u32::from),
        acceleration,
        pm2_5: None,
        co2: None,
        voc_index: None,
        nox_index: None,
        luminosity: None,
    })
}

fn decode_v6_measurement(mac: MacAddress, data: &[u8]) -> Result<Measurement, DecodeError> {
    let tag = v6::decode(data).map_err(|e| {
        DecodeError::DecoderError(format!("Failed to decode RuuviTag data: {e:?}"))
    })?;

    Ok(Measurement {
        mac,
        format: DataFormat::V6,
        temperature: tag.temperature,
        humidity: tag.humidity,
        // Decoder returns hPa; store as Pa to stay consistent with v5 handling.
        pressure: tag.pressure.map(|hpa| hpa * 100.0),
        battery_voltage: None,
        movement_counter: None,
        acceleration: None,
        pm2_5: tag.pm2_5,
        co2: tag.co2.map(f64::from),
        voc_index: tag.voc_index.map(f64::from),
        nox_index: tag.nox_index.map(f64::from),
        luminosity: tag.luminosity,
    })
}

/// Parses RuuviTag advertisements into sensor updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuuvitagDeviceData;

impl RuuvitagDeviceData {
    /// Name shown for a tag before the user picks one, e.g. `RuuviTag EEFF`.
    pub fn default_name(mac: &MacAddress) -> String {
        format!("RuuviTag {}", mac.short_id())
    }

    pub fn update(&self, advertisement: &Advertisement) -> Result<SensorUpdate, DecodeError> {
        let measurement = decode_ruuvi_data(advertisement.mac, &advertisement.manufacturer_data)?;
        let mut update = measurement_to_sensor_update(&measurement);

        if let Some(rssi) = advertisement.rssi {
            update.update_sensor(
                "signal_strength",
                Some(Units::SignalStrengthDecibelsMilliwatt),
                i64::from(rssi),
                SensorDeviceClass::SignalStrength,
                "Signal Strength",
            );
        }

        Ok(update)
    }
}

fn measurement_to_sensor_update(m: &Measurement) -> SensorUpdate {
    let name = RuuvitagDeviceData::default_name(&m.mac);
    let mut update = SensorUpdate {
        title: Some(name.clone()),
        ..Default::default()
    };
    update.devices.insert(
        None,
        SensorDeviceInfo {
            name: Some(name),
            model: Some(m.format.model().to_string()),
            manufacturer: Some(MANUFACTURER.to_string()),
            sw_version: None,
            hw_version: None,
        },
    );

    macro_rules! sensor {
        ($key:literal, $unit:expr, $class:expr, $name:literal, $val:expr) => {
            if let Some(v) = $val {
                update.update_sensor($key, $unit, v, $class, $name);
            }
        };
    }

    sensor!(
        "temperature",
        Some(Units::TempCelsius),
        SensorDeviceClass::Temperature,
        "Temperature",
        m.temperature
    );
    sensor!(
        "humidity",
        Some(Units::Percentage),
        SensorDeviceClass::Humidity,
        "Humidity",
        m.humidity
    );
    sensor!(
        "pressure",
        Some(Units::PressureHpa),
        SensorDeviceClass::Pressure,
        "Pressure",
        m.pressure.map(|pa| pa / 100.0)
    );
    sensor!(
        "voltage",
        Some(Units::ElectricPotentialMillivolt),
        SensorDeviceClass::Voltage,
        "Battery Voltage",
        m.battery_voltage.map(|mv| mv.round() as i64)
    );
    sensor!(
        "movement_counter",
        None,
        SensorDeviceClass::Count,
        "Movement Counter",
        m.movement_counter.map(i64::from)
    );

    if let Some((x, y, z)) = m.acceleration {
        for (key, name, value) in [
            ("acceleration_x", "Acceleration X", x),
            ("acceleration_y", "Acceleration Y", y),
            ("acceleration_z", "Acceleration Z", z),
        ] {
            update.update_sensor(
                key,
                Some(Units::AccelerationMilliG),
                value.round() as i64,
                SensorDeviceClass::Acceleration,
                name,
            );
        }
    }

    sensor!(
        "pm25",
        Some(Units::ConcentrationMicrogramsPerCubicMeter),
        SensorDeviceClass::Pm25,
        "PM2.5",
        m.pm2_5
    );
    sensor!(
        "carbon_dioxide",
        Some(Units::ConcentrationPartsPerMillion),
        SensorDeviceClass::CarbonDioxide,
        "Carbon Dioxide",
        m.co2
    );
    sensor!(
        "voc_index",
        None,
        SensorDeviceClass::VolatileOrganicCompounds,
        "VOC Index",
        m.voc_index
    );
    sensor!(
        "nox_index",
        None,
        SensorDeviceClass::NitrogenOxides,
        "NOx Index",
        m.nox_index
    );
    sensor!(
        "illuminance",
        Some(Units::LightLux),
        SensorDeviceClass::Illuminance,
        "Illuminance",
        m.luminosity
    );

    update
}
