//! Signal handling for qatd.
//!
//! The scan loop stops between cycles when SIGTERM or SIGINT arrives. Driver
//! bindings are left as they are; VFs stay with the user-space driver.

use tokio::sync::broadcast;
use tracing::{error, info};

/// Signal that stopped the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Terminate,
}

impl StopSignal {
    pub fn name(self) -> &'static str {
        match self {
            StopSignal::Interrupt => "SIGINT",
            StopSignal::Terminate => "SIGTERM",
        }
    }
}

/// Resolve on the first stop signal. A handler that cannot be installed
/// never fires; the other one still can.
async fn wait_for_stop() -> StopSignal {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => StopSignal::Interrupt,
        _ = terminate => StopSignal::Terminate,
    }
}

/// Receiver that fires once a stop signal arrives.
pub fn shutdown_signal() -> broadcast::Receiver<()> {
    let (tx, rx) = broadcast::channel(1);

    tokio::spawn(async move {
        let signal = wait_for_stop().await;
        info!(signal = signal.name(), "Stop signal received");
        let _ = tx.send(());
    });

    rx
}
