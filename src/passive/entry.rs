//! Configuration entries and their teardown callbacks.

use super::RemoveListener;
use crate::mac_address::MacAddress;

/// One configured device.
///
/// Registrations made during setup are attached with [`ConfigEntry::on_unload`]
/// and undone, newest first, by [`ConfigEntry::unload`].
#[derive(Debug)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub address: MacAddress,
    pub title: String,
    on_unload: Vec<RemoveListener>,
}

impl ConfigEntry {
    pub fn new(address: MacAddress, title: impl Into<String>) -> Self {
        Self {
            entry_id: address.to_string(),
            address,
            title: title.into(),
            on_unload: Vec::new(),
        }
    }

    pub fn on_unload(&mut self, remove: RemoveListener) {
        self.on_unload.push(remove);
    }

    pub fn unload(&mut self) {
        while let Some(remove) = self.on_unload.pop() {
            remove.remove();
        }
        tracing::info!(entry_id = %self.entry_id, "config entry unloaded");
    }

    pub fn pending_unload_count(&self) -> usize {
        self.on_unload.len()
    }
}
