use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use qat_core::config::split_driver_list;
use qat_core::paths;
use qat_core::{init_observability, DeviceTree, Scanner, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

mod shutdown;
mod snapshot_log;

#[derive(Parser, Debug)]
#[command(name = "qatd")]
#[command(about = "QAT device plugin: moves QAT VFs to a DPDK driver and publishes them", long_about = None)]
struct Cli {
    /// DPDK device driver for configuring the QAT device (igb_uio, vfio-pci) [default: vfio-pci]
    #[arg(long)]
    dpdk_driver: Option<String>,

    /// Comma separated VF device drivers of the QuickAssist devices in the system
    /// (dh895xccvf, c6xxvf, c3xxxvf, d15xxvf) [default: all]
    #[arg(long)]
    kernel_vf_drivers: Option<String>,

    /// Maximum number of QAT devices to be provided [default: 32]
    #[arg(long)]
    max_num_devices: Option<usize>,

    /// Seconds between scans [default: 5]
    #[arg(long)]
    scan_interval: Option<u64>,

    /// JSON settings file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve Prometheus metrics on this port
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Merge the optional settings file with flag overrides.
    fn settings(&self) -> Result<Settings> {
        let settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        Ok(self.apply(settings, paths::pci_bus_root_override()))
    }

    /// Layer the bus root override and the flags over `settings`.
    fn apply(&self, mut settings: Settings, bus_root: Option<PathBuf>) -> Settings {
        if let Some(root) = bus_root {
            settings.pci_bus_root = root;
        }
        if let Some(driver) = &self.dpdk_driver {
            settings.dpdk_driver = driver.clone();
        }
        if let Some(drivers) = &self.kernel_vf_drivers {
            settings.kernel_vf_drivers = split_driver_list(drivers);
        }
        if let Some(max) = self.max_num_devices {
            settings.max_num_devices = max;
        }
        if let Some(interval) = self.scan_interval {
            settings.scan_interval_secs = interval;
        }
        settings.debug |= self.debug;

        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    // Recorder first so metric descriptions registered during init are kept
    if let Some(port) = cli.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("failed to start metrics exporter")?;
    }

    init_observability(settings.debug)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!("QAT device plugin started");

    let config = Arc::new(settings.validate().context("invalid configuration")?);
    let scanner = Scanner::new(config);

    let (tx, rx) = watch::channel(DeviceTree::new());
    let consumer = tokio::spawn(snapshot_log::log_snapshots(rx));

    scanner.run(&tx, shutdown::shutdown_signal()).await?;

    drop(tx);
    let _ = consumer.await;

    info!("QAT device plugin shutting down");
    Ok(())
}
