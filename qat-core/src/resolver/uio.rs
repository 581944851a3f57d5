//! Resolver for VFs bound to `igb_uio`.

use crate::config::UserspaceDriver;
use crate::error::{QatError, Result};
use crate::paths::{UIO_DEVICE_PATH, UIO_MOUNT_PATH};
use crate::resolver::{DevicePaths, Resolver};
use crate::types::PciAddress;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maps a VF to its `uioN` handle.
#[derive(Debug, Clone)]
pub struct UioResolver {
    device_root: PathBuf,
}

impl UioResolver {
    pub fn new(device_root: PathBuf) -> Self {
        Self { device_root }
    }

    /// Name of the uio handle under `<device-root>/<addr>/uio/`.
    fn handle(&self, address: &PciAddress) -> Result<String> {
        let uio_dir = self.device_root.join(address.as_str()).join("uio");
        let entries = match fs::read_dir(&uio_dir) {
            Ok(entries) => entries,
            // The kernel has not created the handle yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(QatError::NoUioHandle { address: address.to_string() })
            }
            Err(e) => return Err(QatError::IoError { path: uio_dir, source: e }),
        };

        let mut handles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| QatError::IoError { path: uio_dir.clone(), source: e })?;
            handles.push(entry.file_name().to_string_lossy().to_string());
        }
        handles.sort();

        if handles.len() > 1 {
            warn!(address = %address, handles = ?handles, "Multiple uio handles, using the first");
        }
        handles.into_iter().next().ok_or_else(|| QatError::NoUioHandle { address: address.to_string() })
    }
}

impl Resolver for UioResolver {
    fn driver(&self) -> UserspaceDriver {
        UserspaceDriver::IgbUio
    }

    fn resolve(&self, address: &PciAddress) -> Result<DevicePaths> {
        let handle = self.handle(address)?;
        debug!(address = %address, handle = %handle, "Resolved uio handle");

        Ok(DevicePaths {
            nodes: vec![Path::new(UIO_DEVICE_PATH).join(&handle)],
            mounts: vec![Path::new(UIO_MOUNT_PATH).join(&handle).join("device")],
        })
    }
}
