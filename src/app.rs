//! Core application runner for `ruuvitag-ble-sensor`.
//!
//! Decoupled from CLI parsing and process exit codes so it can be tested
//! deterministically with an injected scanner and output streams.

use crate::alias::{Alias, AliasMap};
use crate::mac_address::MacAddress;
use crate::output::{EntityState, FormatError, OutputFormat, OutputFormatter};
use crate::passive::{ConfigEntry, PassiveBluetoothProcessorCoordinator};
use crate::ruuvi::{DecodeError, RuuvitagDeviceData};
use crate::scanner::{Advertisement, ScanError, Scanner};
use crate::sensor::{self, RuuvitagBluetoothSensorEntity};
use crate::throttle::Throttle;
use clap::Parser;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Specify human-readable device name for RuuviTag id.
    /// Format: --alias DE:AD:BE:EF:00:00=Sauna
    #[arg(long = "alias", value_parser = crate::alias::parse_alias, value_name = "ALIAS")]
    pub aliases: Vec<Alias>,

    /// Verbose output, print parse errors for unrecognized data
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Throttle advertisements per tag to at most one per interval.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = crate::throttle::parse_duration)]
    pub throttle: Option<Duration>,

    /// Output format for entity states
    #[arg(long, default_value_t, value_enum)]
    pub format: OutputFormat,

    /// Also print entities that are disabled by default (signal strength, movement counter)
    #[arg(long)]
    pub include_disabled: bool,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
}

type EntityList = Arc<Mutex<Vec<RuuvitagBluetoothSensorEntity>>>;

/// A tag that has been seen and set up.
struct Device {
    name: String,
    coordinator: PassiveBluetoothProcessorCoordinator,
    entry: ConfigEntry,
    entities: EntityList,
}

impl Device {
    fn setup(address: MacAddress, aliases: &AliasMap) -> Self {
        let name = aliases
            .get(&address)
            .cloned()
            .unwrap_or_else(|| RuuvitagDeviceData::default_name(&address));

        let parser = RuuvitagDeviceData;
        let coordinator =
            PassiveBluetoothProcessorCoordinator::new(address, move |adv| parser.update(adv));
        let mut entry = ConfigEntry::new(address, name.clone());

        let entities: EntityList = Arc::default();
        let registry = Arc::clone(&entities);
        sensor::setup_entry(&coordinator, &mut entry, move |new_entities| {
            for entity in &new_entities {
                tracing::debug!(unique_id = %entity.unique_id(), "entity added");
            }
            lock(&registry).extend(new_entities);
        });

        Device {
            name,
            coordinator,
            entry,
            entities,
        }
    }

    fn write_states(
        &self,
        formatter: &dyn OutputFormatter,
        include_disabled: bool,
        out: &mut dyn Write,
    ) -> Result<(), RunError> {
        let address = self.coordinator.address();
        for entity in lock(&self.entities).iter() {
            if !include_disabled && !entity.entity_description().entity_registry_enabled_default {
                continue;
            }
            if let Some(state) = EntityState::from_entity(entity, address, &self.name) {
                writeln!(out, "{}", formatter.format(&state)?)?;
            }
        }
        Ok(())
    }
}

/// Run the core processing loop, writing entity states to `out` and verbose errors to `err`.
///
/// - Every new tag address gets its own coordinator and config entry.
/// - After each accepted advertisement, the states of that tag's entities are written to `out`.
/// - On decode errors, the error is written to `err` only when `options.verbose` is true.
/// - When the scanner stops, every config entry is unloaded.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let aliases: AliasMap = crate::alias::to_map(&options.aliases);
    let formatter = options.format.formatter();

    let mut throttle = options.throttle.map(Throttle::new);
    let mut devices: BTreeMap<MacAddress, Device> = BTreeMap::new();

    let mut advertisements = scanner.start_scan().await?;

    let result = async {
        while let Some(advertisement) = advertisements.recv().await {
            let should_emit = throttle
                .as_mut()
                .is_none_or(|t: &mut Throttle| t.should_emit(advertisement.mac));
            if !should_emit {
                continue;
            }

            let device = match device_for(&mut devices, &aliases, &advertisement) {
                Ok(device) => device,
                Err(decode_err) => {
                    report_decode_error(err, options.verbose, &advertisement, &decode_err)?;
                    continue;
                }
            };

            match device.coordinator.handle_advertisement(&advertisement) {
                Ok(()) => device.write_states(&*formatter, options.include_disabled, out)?,
                Err(decode_err) => {
                    report_decode_error(err, options.verbose, &advertisement, &decode_err)?;
                }
            }
        }
        Ok::<(), RunError>(())
    }
    .await;

    for device in devices.values_mut() {
        device.entry.unload();
    }

    result
}

/// The set-up device for `advertisement`'s address.
///
/// Unknown addresses are only set up once one of their advertisements
/// decodes, so tags sending unsupported formats never get an entry.
fn device_for<'a>(
    devices: &'a mut BTreeMap<MacAddress, Device>,
    aliases: &AliasMap,
    advertisement: &Advertisement,
) -> Result<&'a mut Device, DecodeError> {
    match devices.entry(advertisement.mac) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            RuuvitagDeviceData.update(advertisement)?;
            tracing::info!(address = %advertisement.mac, "discovered RuuviTag");
            Ok(entry.insert(Device::setup(advertisement.mac, aliases)))
        }
    }
}

fn report_decode_error(
    err: &mut dyn Write,
    verbose: bool,
    advertisement: &Advertisement,
    decode_err: &DecodeError,
) -> io::Result<()> {
    tracing::debug!(
        address = %advertisement.mac,
        error = %decode_err,
        "failed to decode advertisement"
    );
    if verbose {
        writeln!(err, "{decode_err}")?;
    }
    Ok(())
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanFuture;
    use crate::test_utils::{TEST_MAC, advertisement, v5_payload, v6_payload};
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct FakeScanner {
        advertisements: Vec<Advertisement>,
    }

    impl FakeScanner {
        fn new(advertisements: Vec<Advertisement>) -> Self {
            Self { advertisements }
        }
    }

    impl Scanner for FakeScanner {
        fn start_scan(&self) -> ScanFuture<'_> {
            let advertisements = self.advertisements.clone();
            Box::pin(async move {
                let (tx, rx) = mpsc::channel::<Advertisement>(advertisements.len().max(1));
                tokio::spawn(async move {
                    for a in advertisements {
                        let _ = tx.send(a).await;
                    }
                    // drop tx to close channel
                });
                Ok(rx)
            })
        }
    }

    fn options() -> Options {
        Options {
            aliases: vec![],
            verbose: false,
            throttle: None,
            format: OutputFormat::Text,
            include_disabled: false,
        }
    }

    async fn run(options: Options, advertisements: Vec<Advertisement>) -> (String, String) {
        let scanner = FakeScanner::new(advertisements);
        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        run_with_io(options, &scanner, &mut out, &mut err)
            .await
            .unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[tokio::test]
    async fn run_writes_enabled_entities() {
        let (out, err) = run(options(), vec![advertisement(TEST_MAC, v5_payload())]).await;

        assert!(err.is_empty());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4, "{out}");
        assert!(lines[0].starts_with("RuuviTag EEFF Humidity: "));
        assert!(lines[1].starts_with("RuuviTag EEFF Pressure: "));
        assert!(lines[1].ends_with(" hPa"));
        assert!(lines[2].starts_with("RuuviTag EEFF Temperature: "));
        assert!(lines[2].ends_with(" °C"));
        assert_eq!(lines[3], "RuuviTag EEFF Battery Voltage: 2977 mV");
        assert!(!out.contains("Acceleration"));
        assert!(!out.contains("Signal Strength"));
    }

    #[tokio::test]
    async fn run_includes_disabled_entities_on_request() {
        let mut options = options();
        options.include_disabled = true;
        let (out, _) = run(options, vec![advertisement(TEST_MAC, v5_payload())]).await;

        assert_eq!(out.lines().count(), 6, "{out}");
        assert!(out.contains("RuuviTag EEFF Movement Counter: 66\n"));
        assert!(out.contains("RuuviTag EEFF Signal Strength: -60 dBm\n"));
    }

    #[tokio::test]
    async fn run_uses_alias_as_device_name() {
        let mut options = options();
        options.aliases = vec![crate::alias::parse_alias("AA:BB:CC:DD:EE:FF=Sauna").unwrap()];
        let (out, _) = run(options, vec![advertisement(TEST_MAC, v5_payload())]).await;

        assert!(out.lines().all(|line| line.starts_with("Sauna ")), "{out}");
    }

    #[tokio::test]
    async fn run_writes_each_update_for_each_device() {
        let other = MacAddress([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let (out, _) = run(
            options(),
            vec![
                advertisement(TEST_MAC, v5_payload()),
                advertisement(other, v5_payload()),
                advertisement(TEST_MAC, v5_payload()),
            ],
        )
        .await;

        assert_eq!(out.lines().filter(|l| l.starts_with("RuuviTag EEFF ")).count(), 8);
        assert_eq!(out.lines().filter(|l| l.starts_with("RuuviTag 5566 ")).count(), 4);
    }

    #[tokio::test]
    async fn run_applies_throttle() {
        let mut options = options();
        options.throttle = Some(Duration::from_secs(3600));
        let (out, _) = run(
            options,
            vec![
                advertisement(TEST_MAC, v5_payload()),
                advertisement(TEST_MAC, v5_payload()),
            ],
        )
        .await;

        // only the first advertisement passes
        assert_eq!(out.lines().count(), 4);
    }

    #[tokio::test]
    async fn run_skips_unsupported_kinds_from_air_monitor() {
        let (out, _) = run(options(), vec![advertisement(TEST_MAC, v6_payload())]).await;

        assert!(out.contains("Temperature: "));
        assert!(!out.contains("PM2.5"));
        assert!(!out.contains("Carbon Dioxide"));
        assert!(!out.contains("Battery Voltage"));
    }

    #[tokio::test]
    async fn run_writes_json_lines() {
        let mut options = options();
        options.format = OutputFormat::Json;
        let (out, _) = run(options, vec![advertisement(TEST_MAC, v5_payload())]).await;

        let voltage = out
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
            .find(|value| value["name"] == "Battery Voltage")
            .unwrap();
        assert_eq!(voltage["state"], 2977);
        assert_eq!(voltage["unit"], "mV");
        assert_eq!(voltage["unique_id"], "AA:BB:CC:DD:EE:FF-voltage");
        assert_eq!(voltage["address"], "AA:BB:CC:DD:EE:FF");
    }

    #[tokio::test]
    async fn run_prints_decode_errors_only_when_verbose() {
        let bad = vec![advertisement(TEST_MAC, vec![0x03, 0x01])];

        let (out, err) = run(options(), bad.clone()).await;
        assert!(out.is_empty());
        assert!(err.is_empty());

        let mut verbose = options();
        verbose.verbose = true;
        let (out, err) = run(verbose, bad).await;
        assert!(out.is_empty());
        assert!(err.contains("Unsupported format: RuuviTag data format 3"));
    }

    #[test]
    fn device_for_skips_setup_until_first_decode() {
        let mut devices = BTreeMap::new();
        let aliases = AliasMap::new();

        let unsupported = advertisement(TEST_MAC, vec![0x03, 0x01]);
        assert!(matches!(
            device_for(&mut devices, &aliases, &unsupported),
            Err(DecodeError::UnsupportedFormat(_))
        ));
        assert!(devices.is_empty());

        let supported = advertisement(TEST_MAC, v5_payload());
        let device = device_for(&mut devices, &aliases, &supported).unwrap();
        assert_eq!(device.coordinator.processor_count(), 1);
        assert_eq!(devices.len(), 1);

        // a known tag keeps its entry when a later advertisement fails
        assert!(device_for(&mut devices, &aliases, &unsupported).is_ok());
        assert_eq!(devices.len(), 1);
    }

    #[tokio::test]
    async fn run_sets_up_tag_after_unsupported_advertisement() {
        let mut verbose = options();
        verbose.verbose = true;
        let (out, err) = run(
            verbose,
            vec![
                advertisement(TEST_MAC, vec![0x03, 0x01]),
                advertisement(TEST_MAC, v5_payload()),
            ],
        )
        .await;

        assert_eq!(err.lines().count(), 1, "{err}");
        assert_eq!(out.lines().count(), 4, "{out}");
    }

    #[test]
    fn device_setup_registers_processor_and_unloads() {
        let mut device = Device::setup(TEST_MAC, &AliasMap::new());
        assert_eq!(device.name, "RuuviTag EEFF");
        assert_eq!(device.coordinator.processor_count(), 1);

        device
            .coordinator
            .handle_advertisement(&advertisement(TEST_MAC, v5_payload()))
            .unwrap();
        assert_eq!(lock(&device.entities).len(), 6);

        device.entry.unload();
        assert_eq!(device.coordinator.processor_count(), 0);
    }
}
