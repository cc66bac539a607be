//! Maps sensor updates onto entities and tracks their latest values.

use super::{DeviceInfo, PassiveBluetoothDataUpdate, PassiveBluetoothEntityKey, RemoveListener};
use crate::entity::SensorEntityDescription;
use crate::sensor_data::SensorUpdate;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Converts a parser update into the entity-level representation.
pub type UpdateMethod<T> =
    Box<dyn Fn(&SensorUpdate) -> PassiveBluetoothDataUpdate<T> + Send + Sync>;

type Listener<T> = Box<dyn FnMut(&PassiveBluetoothDataUpdate<T>) + Send>;

type SharedListener<T> = Arc<Mutex<Listener<T>>>;

/// Something a coordinator can dispatch updates to.
pub trait UpdateProcessor: Send + Sync {
    /// Process a successfully decoded advertisement.
    fn handle_update(&self, update: &SensorUpdate);

    /// The latest advertisement could not be decoded.
    fn handle_update_failure(&self);
}

#[derive(Debug)]
struct Shared<T> {
    data: RwLock<PassiveBluetoothDataUpdate<T>>,
    last_update_success: AtomicBool,
}

/// Read-only view of a processor's accumulated data, held by entities.
#[derive(Debug)]
pub struct ProcessorHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ProcessorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> ProcessorHandle<T> {
    /// Latest value seen for `key`, if any.
    pub fn entity_data(&self, key: &PassiveBluetoothEntityKey) -> Option<T> {
        self.read(|data| data.entity_data.get(key).cloned())
    }

    pub fn entity_name(&self, key: &PassiveBluetoothEntityKey) -> Option<String> {
        self.read(|data| data.entity_names.get(key).cloned())
    }

    pub fn device_info(&self, device_id: &Option<String>) -> Option<DeviceInfo> {
        self.read(|data| data.devices.get(device_id).cloned())
    }

    /// Whether the most recent advertisement decoded successfully.
    pub fn last_update_success(&self) -> bool {
        self.shared.last_update_success.load(Ordering::Acquire)
    }

    fn read<R>(&self, f: impl FnOnce(&PassiveBluetoothDataUpdate<T>) -> R) -> R {
        let data = self
            .shared
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&data)
    }
}

/// Processor wrapping an update method, shared data and entity listeners.
pub struct PassiveBluetoothDataProcessor<T> {
    update_method: UpdateMethod<T>,
    shared: Arc<Shared<T>>,
    listeners: Arc<Mutex<Vec<(u64, SharedListener<T>)>>>,
    next_listener_id: AtomicU64,
}

impl<T> PassiveBluetoothDataProcessor<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        update_method: impl Fn(&SensorUpdate) -> PassiveBluetoothDataUpdate<T>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            update_method: Box::new(update_method),
            shared: Arc::new(Shared {
                data: RwLock::new(PassiveBluetoothDataUpdate::default()),
                last_update_success: AtomicBool::new(true),
            }),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
        }
    }

    pub fn handle(&self) -> ProcessorHandle<T> {
        ProcessorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Create entities for entity keys as they first appear.
    ///
    /// `entity_factory` builds one entity per new key and `add_entities`
    /// receives each batch of new entities, sorted by key. Each key produces
    /// an entity at most once for this listener.
    pub fn add_entities_listener<E, F, A>(
        &self,
        entity_factory: F,
        mut add_entities: A,
    ) -> RemoveListener
    where
        F: Fn(ProcessorHandle<T>, PassiveBluetoothEntityKey, SensorEntityDescription) -> E
            + Send
            + 'static,
        A: FnMut(Vec<E>) + Send + 'static,
    {
        let handle = self.handle();
        let mut created: HashSet<PassiveBluetoothEntityKey> = HashSet::new();

        self.add_listener(Box::new(move |update: &PassiveBluetoothDataUpdate<T>| {
            let mut new_keys: Vec<_> = update
                .entity_descriptions
                .iter()
                .filter(|(key, _)| !created.contains(*key))
                .collect();
            if new_keys.is_empty() {
                return;
            }
            new_keys.sort_by(|a, b| a.0.cmp(b.0));

            let entities: Vec<E> = new_keys
                .into_iter()
                .map(|(key, description)| {
                    created.insert(key.clone());
                    entity_factory(handle.clone(), key.clone(), *description)
                })
                .collect();
            add_entities(entities);
        }))
    }

    fn add_listener(&self, listener: Listener<T>) -> RemoveListener {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::new(Mutex::new(listener))));

        let listeners = Arc::clone(&self.listeners);
        RemoveListener::new(move || {
            lock(&listeners).retain(|(listener_id, _)| *listener_id != id);
        })
    }

    fn has_listener(&self, id: u64) -> bool {
        lock(&self.listeners)
            .iter()
            .any(|(listener_id, _)| *listener_id == id)
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

impl<T> UpdateProcessor for PassiveBluetoothDataProcessor<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn handle_update(&self, update: &SensorUpdate) {
        let new_data = (self.update_method)(update);
        self.shared
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(&new_data);
        self.shared
            .last_update_success
            .store(true, Ordering::Release);

        // Listeners are cloned out so one may remove itself or another while running.
        let listeners: Vec<_> = lock(&self.listeners)
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();
        for (id, listener) in listeners {
            if !self.has_listener(id) {
                continue;
            }
            let mut listener = lock(&listener);
            (*listener)(&new_data);
        }
    }

    fn handle_update_failure(&self) {
        self.shared
            .last_update_success
            .store(false, Ordering::Release);
    }
}

fn lock<V>(mutex: &Mutex<V>) -> std::sync::MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::SensorEntityDescription;
    use crate::sensor_data::{DeviceKey, NativeValue};

    const DESCRIPTION: SensorEntityDescription = SensorEntityDescription::new("value");

    fn passthrough(update: &SensorUpdate) -> PassiveBluetoothDataUpdate<NativeValue> {
        let mut data = PassiveBluetoothDataUpdate::default();
        for (device_key, value) in &update.entity_values {
            let key = PassiveBluetoothEntityKey::from(device_key);
            data.entity_descriptions.insert(key.clone(), DESCRIPTION);
            data.entity_data.insert(key, value.native_value);
        }
        data
    }

    fn update_with(keys: &[(&str, i64)]) -> SensorUpdate {
        let mut update = SensorUpdate::default();
        for (key, value) in keys {
            update.update_sensor(
                key,
                None,
                *value,
                crate::sensor_data::SensorDeviceClass::Count,
                key,
            );
        }
        update
    }

    #[test]
    fn test_entities_created_once_per_key() {
        let processor = PassiveBluetoothDataProcessor::new(passthrough);
        let added = Arc::new(Mutex::new(Vec::<Vec<String>>::new()));
        let sink = added.clone();

        let _remove = processor.add_entities_listener(
            |_handle, key, _description| key.key,
            move |entities| sink.lock().unwrap().push(entities),
        );

        processor.handle_update(&update_with(&[("b", 1), ("a", 2)]));
        processor.handle_update(&update_with(&[("a", 3)]));
        processor.handle_update(&update_with(&[("a", 4), ("c", 5)]));

        let added = added.lock().unwrap();
        assert_eq!(
            *added,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()]
            ]
        );
    }

    #[test]
    fn test_handle_reads_latest_value() {
        let processor = PassiveBluetoothDataProcessor::new(passthrough);
        let handle = processor.handle();
        let key = PassiveBluetoothEntityKey::from(&DeviceKey::new("a", None));

        assert_eq!(handle.entity_data(&key), None);
        processor.handle_update(&update_with(&[("a", 1)]));
        processor.handle_update(&update_with(&[("a", 2)]));
        assert_eq!(handle.entity_data(&key), Some(NativeValue::Int(2)));
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let processor = PassiveBluetoothDataProcessor::new(passthrough);
        let added = Arc::new(Mutex::new(0usize));
        let sink = added.clone();

        let remove = processor.add_entities_listener(
            |_handle, key, _description| key,
            move |entities| *sink.lock().unwrap() += entities.len(),
        );
        assert_eq!(processor.listener_count(), 1);
        remove.remove();
        assert_eq!(processor.listener_count(), 0);

        processor.handle_update(&update_with(&[("a", 1)]));
        assert_eq!(*added.lock().unwrap(), 0);
    }

    #[test]
    fn test_update_failure_tracked() {
        let processor = PassiveBluetoothDataProcessor::new(passthrough);
        let handle = processor.handle();
        assert!(handle.last_update_success());

        processor.handle_update_failure();
        assert!(!handle.last_update_success());

        processor.handle_update(&update_with(&[("a", 1)]));
        assert!(handle.last_update_success());
    }

    #[test]
    fn test_listener_can_remove_itself_while_adding_entities() {
        let processor = Arc::new(PassiveBluetoothDataProcessor::new(passthrough));
        let remove_slot: Arc<Mutex<Option<RemoveListener>>> = Arc::default();
        let added = Arc::new(Mutex::new(0usize));

        let slot = remove_slot.clone();
        let sink = added.clone();
        let remove = processor.add_entities_listener(
            |_handle, key, _description| key,
            move |entities| {
                *sink.lock().unwrap() += entities.len();
                if let Some(remove) = slot.lock().unwrap().take() {
                    remove.remove();
                }
            },
        );
        *remove_slot.lock().unwrap() = Some(remove);

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let worker = Arc::clone(&processor);
        std::thread::spawn(move || {
            worker.handle_update(&update_with(&[("a", 1)]));
            done_tx.send(()).unwrap();
        });
        done_rx
            .recv_timeout(std::time::Duration::from_secs(3))
            .expect("handle_update returned");

        assert_eq!(processor.listener_count(), 0);
        assert_eq!(*added.lock().unwrap(), 1);

        processor.handle_update(&update_with(&[("b", 2)]));
        assert_eq!(*added.lock().unwrap(), 1);
    }

    #[test]
    fn test_listener_removed_by_earlier_listener_is_skipped() {
        let processor = PassiveBluetoothDataProcessor::new(passthrough);
        let second_slot: Arc<Mutex<Option<RemoveListener>>> = Arc::default();
        let second_calls = Arc::new(Mutex::new(0usize));

        let slot = second_slot.clone();
        let _first = processor.add_entities_listener(
            |_handle, key, _description| key,
            move |_entities| {
                if let Some(remove) = slot.lock().unwrap().take() {
                    remove.remove();
                }
            },
        );
        let sink = second_calls.clone();
        let second = processor.add_entities_listener(
            |_handle, key, _description| key,
            move |_entities| *sink.lock().unwrap() += 1,
        );
        *second_slot.lock().unwrap() = Some(second);

        processor.handle_update(&update_with(&[("a", 1)]));

        assert_eq!(processor.listener_count(), 1);
        assert_eq!(*second_calls.lock().unwrap(), 0);
    }
}
