//! Per-device domain types.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// PCI domain marker every managed VF address starts with.
pub const PCI_DOMAIN_PREFIX: &str = "0000:";

/// Regular expression for a domain-0 PCI address: 0000:3d:01.0
static PCI_ADDRESS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^0000:[0-9a-fA-F]{2}:[0-9a-fA-F]{2}\.[0-7]$").expect("Invalid PCI address regex")
});

/// Full PCI address of a VF, including the domain (e.g. "0000:3d:01.0").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PciAddress(String);

impl PciAddress {
    /// Parse a sysfs directory entry. Returns `None` for anything that is not
    /// a domain-0 PCI address (driver control files, module links, ...).
    pub fn parse(entry: &str) -> Option<Self> {
        PCI_ADDRESS_REGEX.is_match(entry).then(|| Self(entry.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address without the domain ("3d:01.0"). Used as the device id in snapshots.
    pub fn short(&self) -> &str {
        self.0.strip_prefix(PCI_DOMAIN_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device health as reported to the allocation manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceHealth {
    Healthy,
    Unhealthy,
}

/// Everything a container needs to use one VF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub state: DeviceHealth,
    /// Device nodes to expose, in order.
    pub nodes: Vec<PathBuf>,
    /// Host paths to mount, in order.
    pub mounts: Vec<PathBuf>,
    /// Environment variables to set.
    pub envs: BTreeMap<String, String>,
}
