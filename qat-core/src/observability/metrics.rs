//! Core metrics definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `_total` suffix for counters
//! - `_seconds` suffix for histograms measuring duration

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Register all core metrics with descriptions.
pub fn register_core_metrics() {
    describe_counter!("qat_scan_cycles_total", "Total number of completed scan cycles");
    describe_histogram!("qat_scan_duration_seconds", "Time taken by one scan cycle");
    describe_gauge!("qat_devices_available", "Devices published in the latest snapshot");
    describe_counter!(
        "qat_devices_rebound_total",
        "Total number of VFs moved from a kernel driver to the user-space driver"
    );
    describe_counter!(
        "qat_device_failures_total",
        "Total per-device failures (by phase: classify, unbind, bind, resolve)"
    );
    describe_counter!(
        "qat_driver_skips_total",
        "Total scans of a kernel driver that was not loaded (by driver)"
    );
}

/// Record a completed scan cycle.
pub fn record_scan(duration_secs: f64, devices: usize) {
    histogram!("qat_scan_duration_seconds").record(duration_secs);
    counter!("qat_scan_cycles_total").increment(1);
    gauge!("qat_devices_available").set(devices as f64);
}

pub fn record_rebind() {
    counter!("qat_devices_rebound_total").increment(1);
}

pub fn record_device_failure(phase: &'static str) {
    counter!("qat_device_failures_total", "phase" => phase).increment(1);
}

pub fn record_driver_skip(driver: &str) {
    counter!("qat_driver_skips_total", "driver" => driver.to_string()).increment(1);
}
