//! Stand-in consumer for published snapshots.
//!
//! The allocation server reads the same watch channel; until it is attached
//! the daemon logs every snapshot that differs from the previous one.

use qat_core::{DeviceTree, GENERIC_CLASS};
use tokio::sync::watch;
use tracing::{debug, info};

/// Log snapshot changes until the sending side is dropped.
pub async fn log_snapshots(mut rx: watch::Receiver<DeviceTree>) {
    let mut last = DeviceTree::new();

    while rx.changed().await.is_ok() {
        let tree = rx.borrow_and_update().clone();
        if tree == last {
            debug!(devices = tree.device_count(), "Snapshot unchanged");
            continue;
        }

        let ids: Vec<&str> = tree.devices(GENERIC_CLASS).map(|(id, _)| id.as_str()).collect();
        info!(devices = tree.device_count(), ids = ?ids, "Device snapshot updated");
        last = tree;
    }
}
