//! Per-device dispatch of advertisements to processors.

use super::{RemoveListener, UpdateProcessor};
use crate::mac_address::MacAddress;
use crate::ruuvi::DecodeError;
use crate::scanner::Advertisement;
use crate::sensor_data::SensorUpdate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Device parser invoked for every advertisement of the coordinator's address.
pub type DeviceUpdateMethod =
    Box<dyn Fn(&Advertisement) -> Result<SensorUpdate, DecodeError> + Send + Sync>;

type Processors = Arc<Mutex<Vec<(u64, Arc<dyn UpdateProcessor>)>>>;

/// Receives advertisements for a single device and fans decoded updates out to
/// the registered processors.
pub struct PassiveBluetoothProcessorCoordinator {
    address: MacAddress,
    update_method: DeviceUpdateMethod,
    processors: Processors,
    next_processor_id: AtomicU64,
}

impl PassiveBluetoothProcessorCoordinator {
    pub fn new(
        address: MacAddress,
        update_method: impl Fn(&Advertisement) -> Result<SensorUpdate, DecodeError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            address,
            update_method: Box::new(update_method),
            processors: Arc::new(Mutex::new(Vec::new())),
            next_processor_id: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> MacAddress {
        self.address
    }

    /// Register a processor; the returned handle unregisters it.
    pub fn register_processor(&self, processor: Arc<dyn UpdateProcessor>) -> RemoveListener {
        let id = self.next_processor_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.processors).push((id, processor));

        let processors = Arc::clone(&self.processors);
        RemoveListener::new(move || {
            lock(&processors).retain(|(processor_id, _)| *processor_id != id);
        })
    }

    pub fn processor_count(&self) -> usize {
        lock(&self.processors).len()
    }

    /// Decode `advertisement` and dispatch the result.
    ///
    /// Advertisements for other addresses are ignored. A decode error marks
    /// every processor's last update as failed and is returned to the caller.
    pub fn handle_advertisement(&self, advertisement: &Advertisement) -> Result<(), DecodeError> {
        if advertisement.mac != self.address {
            return Ok(());
        }

        // Processors are cloned out so a processor may unregister from its own listener.
        let processors: Vec<_> = lock(&self.processors)
            .iter()
            .map(|(_, processor)| Arc::clone(processor))
            .collect();

        match (self.update_method)(advertisement) {
            Ok(update) => {
                for processor in &processors {
                    processor.handle_update(&update);
                }
                Ok(())
            }
            Err(error) => {
                for processor in &processors {
                    processor.handle_update_failure();
                }
                Err(error)
            }
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> std::sync::MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
