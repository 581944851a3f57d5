//! User-space device resolution.
//!
//! Once a VF is bound to the user-space driver, the resolver maps its PCI
//! address to the device nodes and mounts a container needs:
//!
//! - `igb_uio`: `/dev/uioN` plus the handle's sysfs device tree
//! - `vfio-pci`: `/dev/vfio/<group>` plus the `/dev/vfio/vfio` control node
//!
//! The implementation is chosen once from the configured driver, so a resolver
//! never disagrees with the driver it was built for.

use crate::config::{Config, UserspaceDriver};
use crate::error::Result;
use crate::types::PciAddress;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

mod uio;
mod vfio;

pub use uio::UioResolver;
pub use vfio::VfioResolver;

/// Device nodes and mounts backing one VF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevicePaths {
    pub nodes: Vec<PathBuf>,
    pub mounts: Vec<PathBuf>,
}

/// Resolver trait.
///
/// Implementations only read sysfs; they never change driver bindings.
pub trait Resolver: Send + Sync + Debug {
    /// User-space driver this resolver understands.
    fn driver(&self) -> UserspaceDriver;

    /// Resolve a VF that is bound to [`Resolver::driver`].
    fn resolve(&self, address: &PciAddress) -> Result<DevicePaths>;
}

/// Create the resolver matching the configured target driver.
pub fn create(config: &Config) -> Arc<dyn Resolver> {
    let device_root = config.device_root().to_path_buf();
    match config.target_driver() {
        UserspaceDriver::IgbUio => Arc::new(UioResolver::new(device_root)),
        UserspaceDriver::VfioPci => Arc::new(VfioResolver::new(device_root)),
    }
}
