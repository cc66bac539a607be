//! Human-readable device names for RuuviTags.
//!
//! An alias replaces the default `RuuviTag XXXX` device name shown in
//! entity output.

use crate::mac_address::MacAddress;
use std::collections::BTreeMap;

/// Map from tag address to the configured device name.
pub type AliasMap = BTreeMap<MacAddress, String>;

/// A parsed `MAC=NAME` alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub address: MacAddress,
    pub name: String,
}

/// Parse an alias from a string in the format "MAC=NAME".
///
/// # Example
/// ```
/// use ruuvitag_ble_sensor::alias::parse_alias;
///
/// let alias = parse_alias("AA:BB:CC:DD:EE:FF=Kitchen").unwrap();
/// assert_eq!(alias.address.to_string(), "AA:BB:CC:DD:EE:FF");
/// assert_eq!(alias.name, "Kitchen");
/// ```
pub fn parse_alias(src: &str) -> Result<Alias, String> {
    let (address, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid alias: expected format MAC=NAME".to_string())?;
    let address = address.trim().parse().map_err(|e| format!("{e}"))?;
    if name.is_empty() {
        return Err("invalid alias: name must not be empty".into());
    }

    Ok(Alias {
        address,
        name: name.into(),
    })
}

/// Collect aliases into a lookup map; a later alias for the same address wins.
pub fn to_map(aliases: &[Alias]) -> AliasMap {
    aliases
        .iter()
        .map(|a| (a.address, a.name.clone()))
        .collect()
}
