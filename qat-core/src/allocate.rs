//! Allocation responses built from a snapshot.
//!
//! The allocation manager merges the descriptors of the VFs it hands to one
//! container, then calls [`post_allocate`] so the container sees a dense
//! `QAT0..QATn` environment regardless of the ordinals in the snapshot.

use crate::descriptor::env_key;
use crate::error::{QatError, Result};
use crate::types::{DeviceTree, GENERIC_CLASS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Devices, mounts and environment for one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerAllocateResponse {
    pub envs: BTreeMap<String, String>,
    pub devices: Vec<PathBuf>,
    pub mounts: Vec<PathBuf>,
}

impl ContainerAllocateResponse {
    /// Merge the descriptors of `ids` from the generic class of `tree`.
    ///
    /// Nodes and mounts shared between devices (`/dev/vfio/vfio`) are listed once.
    /// Descriptors can carry the same env key, so addresses are collected
    /// first and keyed `QAT0..` in request order.
    pub fn for_devices(tree: &DeviceTree, ids: &[&str]) -> Result<Self> {
        let mut response = Self::default();
        let mut addresses: Vec<&String> = Vec::new();
        for id in ids {
            let info = tree
                .get(GENERIC_CLASS, id)
                .ok_or_else(|| QatError::UnknownDevice { id: id.to_string() })?;

            for node in &info.nodes {
                if !response.devices.contains(node) {
                    response.devices.push(node.clone());
                }
            }
            for mount in &info.mounts {
                if !response.mounts.contains(mount) {
                    response.mounts.push(mount.clone());
                }
            }
            for address in info.envs.values() {
                if !addresses.contains(&address) {
                    addresses.push(address);
                }
            }
        }
        response.envs =
            addresses.into_iter().enumerate().map(|(i, addr)| (env_key(i), addr.clone())).collect();
        Ok(response)
    }
}

/// Response to one allocation request, one entry per container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateResponse {
    pub container_responses: Vec<ContainerAllocateResponse>,
}

/// Renumber each container's environment to `QAT0..QAT<n-1>`, ordered by
/// device address.
pub fn post_allocate(response: &mut AllocateResponse) {
    for container in &mut response.container_responses {
        let mut addresses: Vec<String> = std::mem::take(&mut container.envs).into_values().collect();
        addresses.sort();
        container.envs =
            addresses.into_iter().enumerate().map(|(i, addr)| (env_key(i), addr)).collect();
    }
}
