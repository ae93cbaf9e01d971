use tracing::info;

/// Process exit codes: `0` success, `1` fatal startup (bad credentials,
/// cannot connect to the gateway after retrying), `2` internal panic during
/// recovery.
pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL_STARTUP: i32 = 1;
pub const EXIT_FATAL_INTERNAL: i32 = 2;

/// Resolve once a termination signal arrives, so `main` can race it against
/// the process's own work and run a single, uniform shutdown path
/// regardless of which signal fired.
///
/// A single named trigger a binary waits on, rather than a shutdown trait,
/// since a process boundary has nothing to implement shutdown *against*
/// beyond "stop".
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c");
    }
}
