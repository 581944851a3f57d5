//! Reading and validating VF device IDs.

use crate::error::{QatError, Result};
use crate::types::PciAddress;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Device IDs of the supported QAT virtual functions.
pub const KNOWN_VF_DEVICE_IDS: [&str; 4] = ["0442", "0443", "37c9", "19e3"];

/// Strip whitespace and the `0x` prefix from a raw sysfs id.
pub fn normalize_device_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let id = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    id.to_lowercase()
}

/// Whether a normalized id belongs to a supported VF.
pub fn is_known_vf(device_id: &str) -> bool {
    KNOWN_VF_DEVICE_IDS.contains(&device_id)
}

/// Read the normalized device id of `address` from `<device-root>/<addr>/device`.
pub fn read_device_id(device_root: &Path, address: &PciAddress) -> Result<String> {
    let path = device_root.join(address.as_str()).join("device");
    let raw = fs::read_to_string(&path).map_err(|e| QatError::DeviceIdUnreadable {
        address: address.to_string(),
        source: e,
    })?;
    Ok(normalize_device_id(&raw))
}

/// Classify a VF. `Ok(None)` means the device is not a supported QAT VF.
pub fn classify(device_root: &Path, address: &PciAddress) -> Result<Option<String>> {
    let device_id = read_device_id(device_root, address)?;
    if is_known_vf(&device_id) {
        Ok(Some(device_id))
    } else {
        debug!(address = %address, device = %device_id, "Not a supported QAT VF");
        Ok(None)
    }
}
