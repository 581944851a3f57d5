//! Centralized path configuration for the plugin.
//!
//! Sysfs locations are read from here so tests and containerized deployments
//! can point the plugin at a different PCI bus tree.

use std::path::PathBuf;

/// Device nodes for uio handles live directly under `/dev`.
pub const UIO_DEVICE_PATH: &str = "/dev";

/// VFIO group nodes and the global control node.
pub const VFIO_DEVICE_PATH: &str = "/dev/vfio";

/// Sysfs class directory exposing uio handles.
pub const UIO_MOUNT_PATH: &str = "/sys/class/uio";

/// Default PCI bus directory in sysfs.
pub const DEFAULT_PCI_BUS_ROOT: &str = "/sys/bus/pci";

/// Environment variable overriding the configured PCI bus root.
pub const PCI_BUS_ROOT_ENV: &str = "QAT_PCI_BUS_ROOT";

/// PCI bus root from `QAT_PCI_BUS_ROOT`, if set.
pub fn pci_bus_root_override() -> Option<PathBuf> {
    std::env::var_os(PCI_BUS_ROOT_ENV).map(PathBuf::from)
}

/// Driver directory (`<bus>/drivers`) below a PCI bus root.
pub fn driver_root(bus_root: &std::path::Path) -> PathBuf {
    bus_root.join("drivers")
}

/// Device directory (`<bus>/devices`) below a PCI bus root.
pub fn device_root(bus_root: &std::path::Path) -> PathBuf {
    bus_root.join("devices")
}
