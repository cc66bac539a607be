use crate::mac_address::MacAddress;
use crate::scanner::Advertisement;

/// A stable MAC address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// Example V5 payload (without manufacturer ID prefix).
pub fn v5_payload() -> Vec<u8> {
    vec![
        0x05, // Format 5
        0x12, 0xFC, // Temperature: 24.30°C (0x12FC = 4860, 4860 * 0.005 = 24.30)
        0x53, 0x94, // Humidity: 53.49% (0x5394 = 21396, 21396 * 0.0025 = 53.49)
        0xC3, 0x7C, // Pressure: 100044 Pa (0xC37C = 50044, 50044 + 50000 = 100044)
        0x00, 0x04, // Acceleration X: 4 mG
        0xFF, 0xFC, // Acceleration Y: -4 mG
        0x04, 0x0C, // Acceleration Z: 1036 mG
        0xAC, 0x36, // Battery: 2977 mV, TX Power: 4 dBm
        0x42, // Movement counter: 66
        0x00, 0xCD, // Sequence: 205
        0xCB, 0xB8, 0x33, 0x4C, 0x88, 0x4F, // MAC address (ignored in decode)
    ]
}

/// Example V6 payload (Ruuvi Air, includes format byte and compact MAC).
pub fn v6_payload() -> Vec<u8> {
    vec![
        0x06, 0x17, 0x0C, 0x56, 0x68, 0xC7, 0x9E, 0x00, 0x70, 0x00, 0xC9, 0x05, 0x01, 0xD9, 0xFF,
        0xCD, 0x00, 0x4C, 0x88, 0x4F,
    ]
}

/// Build an advertisement heard at -60 dBm.
pub fn advertisement(mac: MacAddress, manufacturer_data: Vec<u8>) -> Advertisement {
    Advertisement {
        mac,
        rssi: Some(-60),
        manufacturer_data,
    }
}
