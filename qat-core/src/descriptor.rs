//! Per-device descriptors.

use crate::error::Result;
use crate::pci::classify;
use crate::resolver::Resolver;
use crate::types::{DeviceHealth, DeviceInfo, PciAddress};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Resource namespace advertised to the allocation manager.
pub const NAMESPACE: &str = "qat.intel.com";

/// Prefix of the environment variables carrying device addresses ("QAT").
pub fn env_prefix() -> String {
    NAMESPACE.trim_end_matches(".intel.com").to_uppercase()
}

/// Environment variable name for a device ordinal ("QAT3").
pub fn env_key(ordinal: usize) -> String {
    format!("{}{}", env_prefix(), ordinal)
}

/// Builds descriptors for VFs bound to the user-space driver.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    device_root: PathBuf,
    resolver: Arc<dyn Resolver>,
}

impl DescriptorBuilder {
    pub fn new(device_root: PathBuf, resolver: Arc<dyn Resolver>) -> Self {
        Self { device_root, resolver }
    }

    pub fn resolver(&self) -> &dyn Resolver {
        self.resolver.as_ref()
    }

    /// Describe a VF already bound to the user-space driver.
    ///
    /// Returns `Ok(None)` for devices that are not supported QAT VFs; callers
    /// leave those out of the snapshot instead of marking them unhealthy.
    pub fn describe(&self, address: &PciAddress, ordinal: usize) -> Result<Option<DeviceInfo>> {
        if classify(&self.device_root, address)?.is_none() {
            return Ok(None);
        }

        let paths = self.resolver.resolve(address)?;
        debug!(address = %address, ordinal, nodes = ?paths.nodes, "Described device");

        Ok(Some(DeviceInfo {
            state: DeviceHealth::Healthy,
            nodes: paths.nodes,
            mounts: paths.mounts,
            envs: BTreeMap::from([(env_key(ordinal), address.to_string())]),
        }))
    }
}
