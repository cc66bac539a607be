//! Per-device advertisement throttling.
//!
//! RuuviTags advertise about once a second. Throttling drops advertisements
//! arriving within the configured interval of the last one accepted for the
//! same tag, before they reach the coordinator.

use crate::mac_address::MacAddress;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Allows at most one advertisement per `interval` for each device.
///
/// The first advertisement of a device is always allowed.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_seen: HashMap<MacAddress, Instant>,
}

impl Throttle {
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use ruuvitag_ble_sensor::throttle::Throttle;
    ///
    /// let throttle = Throttle::new(Duration::from_secs(3));
    /// ```
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last_seen: HashMap::new(),
        }
    }

    /// Check whether an advertisement from `mac` should pass now.
    pub fn should_emit(&mut self, mac: MacAddress) -> bool {
        self.should_emit_at(mac, Instant::now())
    }

    /// Check whether an advertisement from `mac` arriving at `now` should pass.
    ///
    /// Accepting resets the device's timer; rejecting leaves it untouched.
    pub fn should_emit_at(&mut self, mac: MacAddress, now: Instant) -> bool {
        match self.last_seen.get(&mac) {
            Some(last) if now.saturating_duration_since(*last) < self.interval => false,
            _ => {
                self.last_seen.insert(mac, now);
                true
            }
        }
    }
}

/// Parse a duration from a human-readable string.
///
/// Supports the following suffixes:
/// - `s` or no suffix: seconds
/// - `m`: minutes
/// - `h`: hours
/// - `ms`: milliseconds
///
/// # Examples
/// ```
/// use ruuvitag_ble_sensor::throttle::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();

    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // "ms" must be tried before "m" and "s".
    let (num, unit_secs, unit_name) = if let Some(num) = src.strip_suffix("ms") {
        let millis = parse_count(num, "milliseconds")?;
        return Ok(Duration::from_millis(millis));
    } else if let Some(num) = src.strip_suffix('h') {
        (num, 3600, "hours")
    } else if let Some(num) = src.strip_suffix('m') {
        (num, 60, "minutes")
    } else if let Some(num) = src.strip_suffix('s') {
        (num, 1, "seconds")
    } else {
        (src, 1, "duration")
    };

    let count = parse_count(num, unit_name)?;
    count
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: {src}"))
}

fn parse_count(num: &str, unit_name: &str) -> Result<u64, String> {
    num.trim()
        .parse()
        .map_err(|_| format!("invalid {unit_name}: {num}"))
}
