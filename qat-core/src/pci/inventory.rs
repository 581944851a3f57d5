//! Listing the VFs bound to a driver.

use crate::error::{QatError, Result};
use crate::observability::metrics::record_driver_skip;
use crate::types::PciAddress;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// List VF addresses bound to `driver`, in directory enumeration order.
///
/// Fails with [`QatError::DriverUnavailable`] when the driver directory is
/// missing, which is what sysfs looks like when the module is not loaded.
pub fn list_bound(driver_root: &Path, driver: &str) -> Result<Vec<PciAddress>> {
    let path = driver_root.join(driver);
    let entries = fs::read_dir(&path).map_err(|e| QatError::DriverUnavailable {
        driver: driver.to_string(),
        path: path.clone(),
        source: e,
    })?;

    let mut addresses = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| QatError::IoError { path: path.clone(), source: e })?;
        if let Some(address) = entry.file_name().to_str().and_then(PciAddress::parse) {
            addresses.push(address);
        }
    }

    debug!(driver = %driver, devices = addresses.len(), "Listed bound devices");
    Ok(addresses)
}

/// Like [`list_bound`], but an unavailable driver is logged and yields no devices.
pub fn bound_devices(driver_root: &Path, driver: &str) -> Vec<PciAddress> {
    match list_bound(driver_root, driver) {
        Ok(addresses) => addresses,
        Err(e) => {
            warn!(driver = %driver, error = %e, "Can't read sysfs for driver, skipping");
            record_driver_skip(driver);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_bound_filters_control_files() {
        let temp = TempDir::new().unwrap();
        let driver_dir = temp.path().join("c6xxvf");
        fs::create_dir_all(driver_dir.join("0000:3d:01.0")).unwrap();
        fs::create_dir_all(driver_dir.join("0000:3d:01.1")).unwrap();
        fs::create_dir_all(driver_dir.join("module")).unwrap();
        for control in ["bind", "unbind", "new_id", "remove_id", "uevent"] {
            fs::write(driver_dir.join(control), "").unwrap();
        }

        let mut addresses = list_bound(temp.path(), "c6xxvf").unwrap();
        addresses.sort();
        let names: Vec<_> = addresses.iter().map(PciAddress::as_str).collect();
        assert_eq!(names, vec!["0000:3d:01.0", "0000:3d:01.1"]);
    }

    #[test]
    fn test_missing_driver_is_skipped() {
        let temp = TempDir::new().unwrap();

        let err = list_bound(temp.path(), "c6xxvf").unwrap_err();
        assert!(matches!(err, QatError::DriverUnavailable { ref driver, .. } if driver == "c6xxvf"));
        assert!(bound_devices(temp.path(), "c6xxvf").is_empty());
    }
}
