//! Scan loop and snapshot orchestration.
//!
//! Each cycle runs two phases against live sysfs state:
//!
//! 1. **Inventory**: VFs already bound to the user-space driver are counted
//!    against the device cap and described.
//! 2. **Rebind**: VFs bound to a configured kernel driver are migrated, up to
//!    the headroom left by phase 1, in directory enumeration order.
//!
//! Nothing is remembered between cycles. A device already moved to the
//! user-space driver simply shows up in phase 1 of the next cycle.

use crate::config::{Config, KernelDriver};
use crate::descriptor::DescriptorBuilder;
use crate::error::{QatError, Result};
use crate::observability::metrics::{record_device_failure, record_rebind, record_scan};
use crate::pci::{bound_devices, classify, is_bound_to, rebind};
use crate::resolver::{self, Resolver};
use crate::types::{DeviceInfo, DeviceTree, PciAddress, GENERIC_CLASS};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

/// Receives every completed snapshot.
///
/// The notifier takes ownership; the scanner builds a fresh tree each cycle.
pub trait Notifier: Send + Sync {
    fn notify(&self, tree: DeviceTree);
}

impl Notifier for watch::Sender<DeviceTree> {
    fn notify(&self, tree: DeviceTree) {
        self.send_replace(tree);
    }
}

/// Outcome of one scan cycle.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub tree: DeviceTree,
    /// VFs counted against the cap in the inventory phase
    pub target_bound: usize,
    /// Kernel-bound VFs the rebind phase worked on
    pub rebind_attempts: usize,
    /// VFs successfully moved to the user-space driver
    pub rebound: usize,
    /// Per-device failures (skipped until the next cycle)
    pub failures: usize,
}

/// Drives scan cycles for one immutable configuration.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: Arc<Config>,
    descriptors: DescriptorBuilder,
}

impl Scanner {
    /// Create a scanner with the resolver matching the configured driver.
    pub fn new(config: Arc<Config>) -> Self {
        let resolver = resolver::create(&config);
        let descriptors = DescriptorBuilder::new(config.device_root().to_path_buf(), resolver);
        Self { config, descriptors }
    }

    /// Create a scanner with a caller-supplied resolver.
    ///
    /// The resolver must serve the configured target driver.
    pub fn with_resolver(config: Arc<Config>, resolver: Arc<dyn Resolver>) -> Result<Self> {
        if resolver.driver() != config.target_driver() {
            return Err(QatError::InvalidConfig {
                reason: format!(
                    "resolver for {} cannot serve target driver {}",
                    resolver.driver(),
                    config.target_driver()
                ),
            });
        }
        let descriptors = DescriptorBuilder::new(config.device_root().to_path_buf(), resolver);
        Ok(Self { config, descriptors })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one full cycle and return the snapshot.
    pub fn scan(&self) -> DeviceTree {
        self.scan_cycle().tree
    }

    /// Run one full cycle. Per-device and per-driver failures are logged and
    /// skipped; a cycle itself never fails.
    #[instrument(skip(self), fields(driver = %self.config.target_driver()))]
    pub fn scan_cycle(&self) -> ScanReport {
        let started = Instant::now();
        let mut report = ScanReport::default();
        let max_devices = self.config.max_devices();
        let target = self.config.target_driver().name();

        // Inventory phase
        for address in bound_devices(self.config.driver_root(), target) {
            if report.target_bound >= max_devices {
                debug!(address = %address, max_devices, "Device cap reached, ignoring bound device");
                break;
            }
            report.target_bound += 1;

            match self.descriptors.describe(&address, report.target_bound) {
                Ok(Some(info)) => {
                    report.tree.add_device(GENERIC_CLASS, address.short(), info);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(address = %address, error = %e, "Cannot get device info");
                    record_device_failure(e.phase());
                    report.failures += 1;
                }
            }
        }

        // Rebind phase
        let headroom = max_devices - report.target_bound;
        if headroom == 0 {
            debug!(max_devices, "No headroom left, skipping rebind phase");
        } else {
            let candidates: Vec<(KernelDriver, PciAddress)> = self
                .config
                .kernel_drivers()
                .iter()
                .flat_map(|&driver| {
                    bound_devices(self.config.driver_root(), driver.name())
                        .into_iter()
                        .map(move |address| (driver, address))
                })
                .collect();

            // Rebound devices reuse the inventory count as their ordinal
            let ordinal = report.target_bound;
            for (kernel, address) in candidates.into_iter().take(headroom) {
                report.rebind_attempts += 1;
                match self.migrate(kernel, &address, ordinal) {
                    Ok(Some(info)) => {
                        report.tree.add_device(GENERIC_CLASS, address.short(), info);
                        report.rebound += 1;
                        record_rebind();
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(address = %address, error = %e, "Cannot get device info");
                        record_device_failure(e.phase());
                        report.failures += 1;
                    }
                }
            }
        }

        let devices = report.tree.device_count();
        record_scan(started.elapsed().as_secs_f64(), devices);
        info!(
            devices,
            target_bound = report.target_bound,
            rebound = report.rebound,
            failures = report.failures,
            "Scan complete"
        );

        report
    }

    /// Classify, rebind and describe one VF bound to `kernel`.
    fn migrate(&self, kernel: KernelDriver, address: &PciAddress, ordinal: usize) -> Result<Option<DeviceInfo>> {
        let Some(device_id) = classify(self.config.device_root(), address)? else {
            return Ok(None);
        };

        rebind(&self.config, address, &device_id, kernel)?;

        let target = self.config.target_driver().name();
        if !is_bound_to(self.config.device_root(), address, target) {
            return Err(QatError::NotBound { address: address.to_string(), driver: target.to_string() });
        }

        self.descriptors.describe(address, ordinal)
    }

    /// Scan, notify and sleep until `shutdown` fires.
    ///
    /// Scans run on the blocking pool one at a time; a shutdown received while
    /// a scan is running takes effect once that scan has been delivered.
    pub async fn run<N>(&self, notifier: &N, mut shutdown: broadcast::Receiver<()>) -> Result<()>
    where
        N: Notifier + ?Sized,
    {
        info!(
            driver = %self.config.target_driver(),
            kernel_drivers = ?self.config.kernel_drivers(),
            max_devices = self.config.max_devices(),
            interval = ?self.config.scan_interval(),
            "Starting scan loop"
        );

        loop {
            let scanner = self.clone();
            let report =
                tokio::task::spawn_blocking(move || scanner.scan_cycle()).await.map_err(QatError::internal)?;
            notifier.notify(report.tree);

            tokio::select! {
                _ = tokio::time::sleep(self.config.scan_interval()) => {}
                _ = shutdown.recv() => {
                    info!("Scan loop stopped");
                    return Ok(());
                }
            }
        }
    }
}
