//! QAT device plugin core library.
//!
//! Discovers QAT virtual functions in sysfs, moves them from their kernel
//! driver to a user-space driver (`igb_uio` or `vfio-pci`), and publishes a
//! bounded snapshot of ready devices every scan cycle.

pub mod allocate;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod observability;
pub mod paths;
pub mod pci;
pub mod resolver;
pub mod scanner;
pub mod types;

// Re-export commonly used items
pub use allocate::{post_allocate, AllocateResponse, ContainerAllocateResponse};
pub use config::{Config, KernelDriver, Settings, UserspaceDriver};
pub use error::{QatError, Result};
pub use observability::init as init_observability;
pub use scanner::{Notifier, ScanReport, Scanner};
pub use types::{DeviceHealth, DeviceInfo, DeviceTree, PciAddress, GENERIC_CLASS};
