//! Configuration management.
//!
//! `Settings` is the raw form read from flags or a JSON file. It is validated
//! once at startup into an immutable [`Config`] that every component borrows.

use crate::error::{QatError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// User-space driver that VFs are migrated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserspaceDriver {
    #[serde(rename = "igb_uio")]
    IgbUio,
    #[serde(rename = "vfio-pci")]
    VfioPci,
}

impl UserspaceDriver {
    /// Sysfs driver directory name.
    pub fn name(&self) -> &'static str {
        match self {
            UserspaceDriver::IgbUio => "igb_uio",
            UserspaceDriver::VfioPci => "vfio-pci",
        }
    }
}

impl fmt::Display for UserspaceDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UserspaceDriver {
    type Err = QatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "igb_uio" => Ok(UserspaceDriver::IgbUio),
            "vfio-pci" => Ok(UserspaceDriver::VfioPci),
            other => Err(QatError::InvalidConfig {
                reason: format!("Wrong DPDK device driver: {} (expected igb_uio or vfio-pci)", other),
            }),
        }
    }
}

/// In-kernel QAT VF driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelDriver {
    Dh895xccvf,
    C6xxvf,
    C3xxxvf,
    D15xxvf,
}

impl KernelDriver {
    /// Every supported kernel VF driver.
    pub const ALL: [KernelDriver; 4] =
        [KernelDriver::Dh895xccvf, KernelDriver::C6xxvf, KernelDriver::C3xxxvf, KernelDriver::D15xxvf];

    /// Sysfs driver directory name.
    pub fn name(&self) -> &'static str {
        match self {
            KernelDriver::Dh895xccvf => "dh895xccvf",
            KernelDriver::C6xxvf => "c6xxvf",
            KernelDriver::C3xxxvf => "c3xxxvf",
            KernelDriver::D15xxvf => "d15xxvf",
        }
    }
}

impl fmt::Display for KernelDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelDriver {
    type Err = QatError;

    fn from_str(s: &str) -> Result<Self> {
        KernelDriver::ALL.into_iter().find(|d| d.name() == s).ok_or_else(|| {
            QatError::InvalidConfig { reason: format!("Wrong kernel VF driver: {}", s) }
        })
    }
}

/// Split a comma-separated driver list, dropping blanks.
pub fn split_driver_list(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Unvalidated plugin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dpdk_driver: String,
    pub kernel_vf_drivers: Vec<String>,
    pub max_num_devices: usize,
    pub pci_bus_root: PathBuf,
    pub scan_interval_secs: u64,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dpdk_driver: UserspaceDriver::VfioPci.name().to_string(),
            kernel_vf_drivers: KernelDriver::ALL.iter().map(|d| d.name().to_string()).collect(),
            max_num_devices: 32,
            pci_bus_root: PathBuf::from(paths::DEFAULT_PCI_BUS_ROOT),
            scan_interval_secs: 5,
            debug: false,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| QatError::InvalidConfig {
            reason: format!("Failed to read config {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| QatError::InvalidConfig {
            reason: format!("Failed to parse config {}: {}", path.display(), e),
        })
    }

    /// Validate into an immutable [`Config`].
    pub fn validate(&self) -> Result<Config> {
        let target_driver: UserspaceDriver = self.dpdk_driver.parse()?;
        let kernel_drivers = self
            .kernel_vf_drivers
            .iter()
            .map(|d| d.parse::<KernelDriver>())
            .collect::<Result<Vec<_>>>()?;

        if self.scan_interval_secs == 0 {
            return Err(QatError::InvalidConfig {
                reason: "scan interval must be at least one second".to_string(),
            });
        }

        Config::new(target_driver, kernel_drivers, self.max_num_devices, &self.pci_bus_root)
            .map(|c| c.with_scan_interval(Duration::from_secs(self.scan_interval_secs)))
    }
}

/// Validated, immutable plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    target_driver: UserspaceDriver,
    kernel_drivers: Vec<KernelDriver>,
    max_devices: usize,
    driver_root: PathBuf,
    device_root: PathBuf,
    scan_interval: Duration,
}

impl Config {
    /// Build a configuration rooted at a PCI bus directory.
    ///
    /// Duplicate kernel drivers are collapsed, keeping first-seen order.
    pub fn new(
        target_driver: UserspaceDriver,
        kernel_drivers: Vec<KernelDriver>,
        max_devices: usize,
        pci_bus_root: &Path,
    ) -> Result<Self> {
        if max_devices == 0 {
            return Err(QatError::InvalidConfig {
                reason: "maximum number of devices must be positive".to_string(),
            });
        }
        if kernel_drivers.is_empty() {
            return Err(QatError::InvalidConfig {
                reason: "at least one kernel VF driver is required".to_string(),
            });
        }

        let mut unique = Vec::with_capacity(kernel_drivers.len());
        for driver in kernel_drivers {
            if !unique.contains(&driver) {
                unique.push(driver);
            }
        }

        Ok(Self {
            target_driver,
            kernel_drivers: unique,
            max_devices,
            driver_root: paths::driver_root(pci_bus_root),
            device_root: paths::device_root(pci_bus_root),
            scan_interval: Duration::from_secs(5),
        })
    }

    fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn target_driver(&self) -> UserspaceDriver {
        self.target_driver
    }

    pub fn kernel_drivers(&self) -> &[KernelDriver] {
        &self.kernel_drivers
    }

    pub fn max_devices(&self) -> usize {
        self.max_devices
    }

    /// `<bus>/drivers`
    pub fn driver_root(&self) -> &Path {
        &self.driver_root
    }

    /// `<bus>/devices`
    pub fn device_root(&self) -> &Path {
        &self.device_root
    }

    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }
}
