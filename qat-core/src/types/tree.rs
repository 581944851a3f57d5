//! Device tree snapshots handed to the allocation manager.

use crate::types::device::DeviceInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource class every QAT VF is published under.
pub const GENERIC_CLASS: &str = "generic";

/// Resource class → device id → descriptor.
///
/// Ordered maps keep snapshots of an unchanged host equal and stably printable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTree(BTreeMap<String, BTreeMap<String, DeviceInfo>>);

impl DeviceTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device. Returns the previous descriptor if the id was already present.
    pub fn add_device(&mut self, class: &str, id: &str, info: DeviceInfo) -> Option<DeviceInfo> {
        self.0.entry(class.to_string()).or_default().insert(id.to_string(), info)
    }

    pub fn get(&self, class: &str, id: &str) -> Option<&DeviceInfo> {
        self.0.get(class).and_then(|devices| devices.get(id))
    }

    /// Devices of one resource class, ordered by id.
    pub fn devices(&self, class: &str) -> impl Iterator<Item = (&String, &DeviceInfo)> {
        self.0.get(class).into_iter().flat_map(|devices| devices.iter())
    }

    pub fn classes(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Total number of devices across all classes.
    pub fn device_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.device_count() == 0
    }
}
