//! Integration tests for full scan cycles.
//!
//! Each test builds a fake PCI bus tree in a temp directory:
//! - `drivers/<driver>/<addr>` entries for inventory
//! - `devices/<addr>/device` holding the VF id
//! - `devices/<addr>/driver` symlinked to the bound driver directory
//! - `devices/<addr>/iommu_group` or `devices/<addr>/uio/<handle>` for resolution
//!
//! Sysfs does not move devices between drivers here. A device probed in the
//! same cycle is simulated by pointing its `driver` link at the target driver
//! up front; a probe between cycles by moving it with `FakeSysfs::move_vf`.

#![cfg(unix)]

use qat_core::config::{Config, KernelDriver, UserspaceDriver};
use qat_core::error::Result;
use qat_core::resolver::{DevicePaths, Resolver, VfioResolver};
use qat_core::{
    post_allocate, AllocateResponse, ContainerAllocateResponse, DeviceHealth, PciAddress, Scanner,
    GENERIC_CLASS,
};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Fake `/sys/bus/pci` tree.
struct FakeSysfs {
    temp: TempDir,
}

impl FakeSysfs {
    fn new() -> Self {
        Self { temp: TempDir::new().expect("Failed to create temp directory") }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn driver_dir(&self, driver: &str) -> PathBuf {
        self.root().join("drivers").join(driver)
    }

    fn device_dir(&self, addr: &str) -> PathBuf {
        self.root().join("devices").join(addr)
    }

    /// Create a driver directory with its control files.
    fn add_driver(&self, driver: &str) {
        let dir = self.driver_dir(driver);
        fs::create_dir_all(&dir).unwrap();
        for control in ["bind", "unbind", "new_id"] {
            if !dir.join(control).exists() {
                fs::write(dir.join(control), "").unwrap();
            }
        }
    }

    /// Add a VF with the given raw id, bound to `driver`.
    fn add_vf(&self, addr: &str, device_id: &str, driver: &str) {
        self.add_driver(driver);
        let dev = self.device_dir(addr);
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("device"), format!("0x{}\n", device_id)).unwrap();
        symlink(&dev, self.driver_dir(driver).join(addr)).unwrap();
        self.link_driver(addr, driver);
    }

    /// Point the device's `driver` link at `driver`.
    fn link_driver(&self, addr: &str, driver: &str) {
        let link = self.device_dir(addr).join("driver");
        let _ = fs::remove_file(&link);
        symlink(self.driver_dir(driver), link).unwrap();
    }

    /// Move a VF's driver entry and link from `from` to `to`.
    fn move_vf(&self, addr: &str, from: &str, to: &str) {
        self.add_driver(to);
        fs::remove_file(self.driver_dir(from).join(addr)).unwrap();
        symlink(self.device_dir(addr), self.driver_dir(to).join(addr)).unwrap();
        self.link_driver(addr, to);
    }

    fn set_iommu_group(&self, addr: &str, group: u32) {
        let group_dir = self.root().join("iommu_groups").join(group.to_string());
        fs::create_dir_all(&group_dir).unwrap();
        symlink(group_dir, self.device_dir(addr).join("iommu_group")).unwrap();
    }

    fn set_uio_handle(&self, addr: &str, handle: &str) {
        fs::create_dir_all(self.device_dir(addr).join("uio").join(handle)).unwrap();
    }

    fn read_control(&self, driver: &str, control: &str) -> String {
        fs::read_to_string(self.driver_dir(driver).join(control)).unwrap()
    }

    fn config(&self, target: UserspaceDriver, max_devices: usize) -> Arc<Config> {
        Arc::new(Config::new(target, KernelDriver::ALL.to_vec(), max_devices, self.root()).unwrap())
    }
}

/// Resolver that records every address it is asked about.
#[derive(Debug)]
struct RecordingResolver {
    inner: VfioResolver,
    seen: Mutex<Vec<String>>,
}

impl Resolver for RecordingResolver {
    fn driver(&self) -> UserspaceDriver {
        self.inner.driver()
    }

    fn resolve(&self, address: &PciAddress) -> Result<DevicePaths> {
        self.seen.lock().unwrap().push(address.to_string());
        self.inner.resolve(address)
    }
}

#[test]
fn test_target_bound_devices_are_described() {
    let sysfs = FakeSysfs::new();
    sysfs.add_vf("0000:3d:01.0", "37c9", "vfio-pci");
    sysfs.set_iommu_group("0000:3d:01.0", 42);

    let report = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 4)).scan_cycle();

    assert_eq!(report.target_bound, 1);
    assert_eq!(report.rebind_attempts, 0);
    let info = report.tree.get(GENERIC_CLASS, "3d:01.0").expect("device should be published");
    assert_eq!(info.state, DeviceHealth::Healthy);
    assert_eq!(info.nodes, vec![PathBuf::from("/dev/vfio/42"), PathBuf::from("/dev/vfio/vfio")]);
    assert!(info.mounts.is_empty());
    assert_eq!(info.envs.get("QAT1").map(String::as_str), Some("0000:3d:01.0"));
}

#[test]
fn test_unknown_ids_never_surface() {
    let sysfs = FakeSysfs::new();
    // Unknown id already under the target driver
    sysfs.add_vf("0000:3d:01.0", "1234", "vfio-pci");
    sysfs.set_iommu_group("0000:3d:01.0", 1);
    // Unknown id under a kernel driver
    sysfs.add_vf("0000:3f:01.0", "0435", "c6xxvf");

    let report = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 4)).scan_cycle();

    assert!(report.tree.is_empty());
    assert_eq!(report.failures, 0);
    // The kernel-bound device was never unbound
    assert_eq!(sysfs.read_control("c6xxvf", "unbind"), "");
}

#[test]
fn test_cap_limits_inventory_phase() {
    let sysfs = FakeSysfs::new();
    for (addr, group) in [("0000:3d:01.0", 10), ("0000:3d:01.1", 11)] {
        sysfs.add_vf(addr, "37c9", "vfio-pci");
        sysfs.set_iommu_group(addr, group);
    }
    sysfs.add_vf("0000:3f:01.0", "37c9", "c6xxvf");

    let report = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 1)).scan_cycle();

    assert_eq!(report.tree.device_count(), 1);
    assert_eq!(report.target_bound, 1);
    assert_eq!(report.rebind_attempts, 0);
    assert_eq!(sysfs.read_control("c6xxvf", "unbind"), "");
}

#[test]
fn test_cap_limits_rebind_phase() {
    let sysfs = FakeSysfs::new();
    sysfs.add_vf("0000:3d:01.0", "37c9", "vfio-pci");
    sysfs.set_iommu_group("0000:3d:01.0", 10);
    // Kernel drivers are walked in configured order, dh895xccvf first
    sysfs.add_vf("0000:3f:01.0", "0443", "dh895xccvf");
    sysfs.link_driver("0000:3f:01.0", "vfio-pci");
    sysfs.set_iommu_group("0000:3f:01.0", 20);
    sysfs.add_vf("0000:3f:01.1", "37c9", "c6xxvf");
    sysfs.add_vf("0000:3f:01.2", "19e3", "c3xxxvf");

    let report = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 2)).scan_cycle();

    assert_eq!(report.target_bound, 1);
    assert_eq!(report.rebind_attempts, 1);
    assert_eq!(report.rebound, 1);
    assert_eq!(report.tree.device_count(), 2);
    assert!(report.tree.get(GENERIC_CLASS, "3f:01.0").is_some());
    assert_eq!(sysfs.read_control("c6xxvf", "unbind"), "");
    assert_eq!(sysfs.read_control("c3xxxvf", "unbind"), "");
}

#[test]
fn test_missing_kernel_driver_is_skipped() {
    let sysfs = FakeSysfs::new();
    // Only d15xxvf is loaded; c6xxvf and the others have no directory
    sysfs.add_driver("vfio-pci");
    sysfs.add_vf("0000:3f:01.0", "19e3", "d15xxvf");
    sysfs.link_driver("0000:3f:01.0", "vfio-pci");
    sysfs.set_iommu_group("0000:3f:01.0", 7);
    assert!(!sysfs.driver_dir("c6xxvf").exists());

    let report = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 4)).scan_cycle();

    assert_eq!(report.rebind_attempts, 1);
    assert_eq!(report.rebound, 1);
    assert!(report.tree.get(GENERIC_CLASS, "3f:01.0").is_some());
}

#[test]
fn test_rebind_writes_sysfs_in_order() {
    let sysfs = FakeSysfs::new();
    sysfs.add_driver("vfio-pci");
    sysfs.add_vf("0000:3f:01.0", "37c9", "c6xxvf");

    let scanner = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 4));
    let report = scanner.scan_cycle();

    assert_eq!(sysfs.read_control("c6xxvf", "unbind"), "0000:3f:01.0");
    assert_eq!(sysfs.read_control("vfio-pci", "new_id"), "8086 37c9");
    // Probe has not happened yet
    assert!(report.tree.is_empty());
    assert_eq!(report.failures, 1);

    // Kernel probe moves the device before the next cycle
    sysfs.move_vf("0000:3f:01.0", "c6xxvf", "vfio-pci");
    sysfs.set_iommu_group("0000:3f:01.0", 3);

    let report = scanner.scan_cycle();
    assert_eq!(report.target_bound, 1);
    assert_eq!(report.rebind_attempts, 0);
    let info = report.tree.get(GENERIC_CLASS, "3f:01.0").unwrap();
    assert_eq!(info.envs.get("QAT1").map(String::as_str), Some("0000:3f:01.0"));
}

#[test]
fn test_same_cycle_rebinds_keep_distinct_allocations() {
    let sysfs = FakeSysfs::new();
    sysfs.add_driver("vfio-pci");
    for (addr, group) in [("0000:3f:01.0", 20), ("0000:3f:01.1", 21)] {
        sysfs.add_vf(addr, "37c9", "c6xxvf");
        sysfs.link_driver(addr, "vfio-pci");
        sysfs.set_iommu_group(addr, group);
    }

    let report = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 4)).scan_cycle();
    assert_eq!(report.rebound, 2);

    // Rebound devices take the inventory count as their ordinal
    for id in ["3f:01.0", "3f:01.1"] {
        let info = report.tree.get(GENERIC_CLASS, id).unwrap();
        assert_eq!(info.envs.keys().collect::<Vec<_>>(), vec!["QAT0"]);
    }

    let container = ContainerAllocateResponse::for_devices(&report.tree, &["3f:01.1", "3f:01.0"]).unwrap();
    let mut response = AllocateResponse { container_responses: vec![container] };
    post_allocate(&mut response);

    let envs = &response.container_responses[0].envs;
    assert_eq!(envs.len(), 2);
    assert_eq!(envs.get("QAT0").map(String::as_str), Some("0000:3f:01.0"));
    assert_eq!(envs.get("QAT1").map(String::as_str), Some("0000:3f:01.1"));
}

#[test]
fn test_bind_failure_returns_device_to_kernel_driver() {
    let sysfs = FakeSysfs::new();
    // No vfio-pci directory: unbind succeeds, new_id cannot be written
    sysfs.add_vf("0000:3f:01.0", "37c9", "c6xxvf");

    let report = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 4)).scan_cycle();

    assert!(report.tree.is_empty());
    assert_eq!(report.failures, 1);
    assert_eq!(sysfs.read_control("c6xxvf", "unbind"), "0000:3f:01.0");
    assert_eq!(sysfs.read_control("c6xxvf", "bind"), "0000:3f:01.0");
}

#[test]
fn test_unconfirmed_bind_is_not_resolved() {
    let sysfs = FakeSysfs::new();
    sysfs.add_driver("vfio-pci");
    sysfs.add_vf("0000:3f:01.0", "37c9", "c6xxvf");
    sysfs.set_iommu_group("0000:3f:01.0", 3);

    let config = sysfs.config(UserspaceDriver::VfioPci, 4);
    let resolver = Arc::new(RecordingResolver {
        inner: VfioResolver::new(config.device_root().to_path_buf()),
        seen: Mutex::new(Vec::new()),
    });
    let scanner = Scanner::with_resolver(config, resolver.clone()).unwrap();

    let report = scanner.scan_cycle();

    // new_id was written but the device never showed up under vfio-pci
    assert_eq!(sysfs.read_control("vfio-pci", "new_id"), "8086 37c9");
    assert!(report.tree.is_empty());
    assert_eq!(report.failures, 1);
    assert!(resolver.seen.lock().unwrap().is_empty());
}

#[test]
fn test_resolution_only_for_target_bound() {
    let sysfs = FakeSysfs::new();
    sysfs.add_vf("0000:3d:01.0", "0443", "vfio-pci");
    sysfs.set_iommu_group("0000:3d:01.0", 5);
    // Kernel-bound, bind will fail (new_id removed)
    sysfs.add_vf("0000:3f:01.0", "0443", "dh895xccvf");
    fs::remove_file(sysfs.driver_dir("vfio-pci").join("new_id")).unwrap();

    let config = sysfs.config(UserspaceDriver::VfioPci, 4);
    let resolver = Arc::new(RecordingResolver {
        inner: VfioResolver::new(config.device_root().to_path_buf()),
        seen: Mutex::new(Vec::new()),
    });
    let scanner = Scanner::with_resolver(config, resolver.clone()).unwrap();

    let report = scanner.scan_cycle();

    assert_eq!(report.tree.device_count(), 1);
    assert_eq!(*resolver.seen.lock().unwrap(), vec!["0000:3d:01.0".to_string()]);
}

#[test]
fn test_unchanged_host_gives_identical_snapshots() {
    let sysfs = FakeSysfs::new();
    for (addr, group) in [("0000:3d:01.0", 10), ("0000:3d:01.1", 11), ("0000:3d:01.2", 12)] {
        sysfs.add_vf(addr, "37c9", "vfio-pci");
        sysfs.set_iommu_group(addr, group);
    }

    let scanner = Scanner::new(sysfs.config(UserspaceDriver::VfioPci, 8));
    let first = scanner.scan();
    let second = scanner.scan();

    assert_eq!(first.device_count(), 3);
    assert_eq!(first, second);
}

#[test]
fn test_uio_variant() {
    let sysfs = FakeSysfs::new();
    sysfs.add_vf("0000:3d:01.0", "19e3", "igb_uio");
    sysfs.set_uio_handle("0000:3d:01.0", "uio4");
    // Handle not materialized yet: skipped this cycle
    sysfs.add_vf("0000:3d:01.1", "19e3", "igb_uio");

    let report = Scanner::new(sysfs.config(UserspaceDriver::IgbUio, 4)).scan_cycle();

    assert_eq!(report.tree.device_count(), 1);
    assert_eq!(report.failures, 1);
    let info = report.tree.get(GENERIC_CLASS, "3d:01.0").unwrap();
    assert_eq!(info.nodes, vec![PathBuf::from("/dev/uio4")]);
    assert_eq!(info.mounts, vec![PathBuf::from("/sys/class/uio/uio4/device")]);
}
