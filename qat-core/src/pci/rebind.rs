//! Moving a VF from its kernel driver to the user-space driver.

use crate::config::{Config, KernelDriver};
use crate::error::{QatError, RebindPhase, Result};
use crate::types::PciAddress;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Vendor id written to `new_id` together with the device id.
pub const INTEL_VENDOR_ID: &str = "8086";

/// Write a sysfs attribute. Unlike `fs::write` this never creates the file.
fn write_attr(path: &Path, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.write_all(value.as_bytes())
}

/// Unbind `address` from `kernel` and hand it to the target driver.
///
/// # Process
///
/// 1. Write the address to `<device-root>/<addr>/driver/unbind`
/// 2. Write `"8086 <device-id>"` to `<driver-root>/<target>/new_id`
///
/// Step 2 is never attempted when step 1 fails, so a failed unbind leaves the
/// device with its kernel driver. When step 2 fails the address is written
/// back to `<driver-root>/<kernel>/bind` so the next scan finds the device
/// under its kernel driver again.
pub fn rebind(config: &Config, address: &PciAddress, device_id: &str, kernel: KernelDriver) -> Result<()> {
    let unbind_path = config.device_root().join(address.as_str()).join("driver").join("unbind");

    debug!(address = %address, driver = %kernel, "Unbinding from kernel driver");
    write_attr(&unbind_path, address.as_str()).map_err(|e| QatError::RebindFailed {
        address: address.to_string(),
        phase: RebindPhase::Unbind,
        source: e,
    })?;

    let target = config.target_driver().name();
    let target_dir = config.driver_root().join(target);
    let id_string = format!("{} {}", INTEL_VENDOR_ID, device_id);

    debug!(address = %address, driver = %target, id = %id_string, "Registering device ID");
    let registered = write_attr(&target_dir.join("new_id"), &id_string);
    if let Err(e) = bind_after_new_id(&target_dir, address, registered) {
        restore_kernel_driver(config, address, kernel);
        return Err(QatError::RebindFailed {
            address: address.to_string(),
            phase: RebindPhase::Bind,
            source: e,
        });
    }

    info!(address = %address, driver = %target, "Device bound to user-space driver");
    Ok(())
}

/// Finish the bind step given the outcome of the `new_id` write.
///
/// `new_id` refuses an id pair that is already registered (a sibling VF was
/// migrated before); the address then goes to the target's `bind` file.
fn bind_after_new_id(target_dir: &Path, address: &PciAddress, registered: io::Result<()>) -> io::Result<()> {
    match registered {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(address = %address, "Device ID already registered, binding directly");
            write_attr(&target_dir.join("bind"), address.as_str())
        }
        Err(e) => Err(e),
    }
}

/// Best-effort return of an unbound device to its kernel driver.
fn restore_kernel_driver(config: &Config, address: &PciAddress, kernel: KernelDriver) {
    let bind_path = config.driver_root().join(kernel.name()).join("bind");
    match write_attr(&bind_path, address.as_str()) {
        Ok(()) => info!(address = %address, driver = %kernel, "Restored kernel driver after failed bind"),
        Err(e) => warn!(
            address = %address,
            driver = %kernel,
            error = %e,
            "Cannot restore kernel driver, device left unbound"
        ),
    }
}

/// Read the driver currently bound to a device (None if unbound).
pub fn current_driver(device_root: &Path, address: &PciAddress) -> Option<String> {
    fs::read_link(device_root.join(address.as_str()).join("driver"))
        .ok()
        .and_then(|target| target.file_name().map(|n| n.to_string_lossy().to_string()))
}

/// Whether the device's `driver` link names `driver`.
pub fn is_bound_to(device_root: &Path, address: &PciAddress, driver: &str) -> bool {
    current_driver(device_root, address).is_some_and(|d| d == driver)
}
