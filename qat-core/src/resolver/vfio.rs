//! Resolver for VFs bound to `vfio-pci`.

use crate::config::UserspaceDriver;
use crate::error::{QatError, Result};
use crate::paths::VFIO_DEVICE_PATH;
use crate::resolver::{DevicePaths, Resolver};
use crate::types::PciAddress;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps a VF to its IOMMU group node.
#[derive(Debug, Clone)]
pub struct VfioResolver {
    device_root: PathBuf,
}

impl VfioResolver {
    pub fn new(device_root: PathBuf) -> Self {
        Self { device_root }
    }

    /// IOMMU group id behind `<device-root>/<addr>/iommu_group`.
    fn iommu_group(&self, address: &PciAddress) -> Result<u32> {
        let link = self.device_root.join(address.as_str()).join("iommu_group");
        let group = fs::canonicalize(&link).map_err(|e| QatError::IoError { path: link, source: e })?;

        let name = group.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        name.parse().map_err(|_| QatError::InvalidIommuGroup {
            address: address.to_string(),
            reason: format!("{} is not a numeric group", group.display()),
        })
    }
}

impl Resolver for VfioResolver {
    fn driver(&self) -> UserspaceDriver {
        UserspaceDriver::VfioPci
    }

    fn resolve(&self, address: &PciAddress) -> Result<DevicePaths> {
        let group = self.iommu_group(address)?;
        debug!(address = %address, iommu_group = group, "Resolved VFIO group");

        let vfio = Path::new(VFIO_DEVICE_PATH);
        Ok(DevicePaths { nodes: vec![vfio.join(group.to_string()), vfio.join("vfio")], mounts: vec![] })
    }
}
