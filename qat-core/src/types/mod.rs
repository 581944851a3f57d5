//! Core domain types for the plugin.

pub mod device;
pub mod tree;

// Re-exports
pub use device::{DeviceHealth, DeviceInfo, PciAddress};
pub use tree::{DeviceTree, GENERIC_CLASS};
