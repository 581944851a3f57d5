//! Sysfs access for QAT virtual functions.
//!
//! # Layout
//!
//! ```text
//! <bus>/drivers/<driver>/0000:3d:01.0 -> ../../../devices/...   (inventory)
//! <bus>/drivers/<driver>/new_id                                  (rebind, step 2)
//! <bus>/drivers/<driver>/bind                                    (fallback, restore)
//! <bus>/devices/0000:3d:01.0/device                              (classify)
//! <bus>/devices/0000:3d:01.0/driver/unbind                       (rebind, step 1)
//! ```
//!
//! Every function takes its sysfs roots explicitly so the whole pipeline can
//! run against a fake tree.

pub mod classify;
pub mod inventory;
pub mod rebind;

pub use classify::{classify, is_known_vf, normalize_device_id, read_device_id};
pub use inventory::{bound_devices, list_bound};
pub use rebind::{current_driver, is_bound_to, rebind};
