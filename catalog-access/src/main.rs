use catalog_access::{config::AccessConfig, AccessCore};
use service_core::observability::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AccessConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        service = %config.service_name,
        environment = ?config.environment,
        auth_enabled = config.access.auth_enabled,
        view_permissions_enabled = config.access.view_permissions_enabled,
        "Starting catalog access core"
    );

    let core = AccessCore::connect(&config).await?;

    let groups = core.groups(None).await?;
    tracing::info!(groups = groups.len(), "Data store reachable");

    run_until_shutdown(&core).await;

    tracing::info!("Service shutdown complete");
    Ok(())
}

/// Serve cache-clear requests (SIGHUP) until SIGINT or SIGTERM.
#[cfg(unix)]
async fn run_until_shutdown(core: &AccessCore) {
    use signal::unix::{signal as unix_signal, SignalKind};

    let (mut hangup, mut terminate) = match (
        unix_signal(SignalKind::hangup()),
        unix_signal(SignalKind::terminate()),
    ) {
        (Ok(hangup), Ok(terminate)) => (hangup, terminate),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                tracing::info!("Received SIGHUP, clearing caches");
                core.clear_caches();
            },
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                break;
            },
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
                tracing::info!("Received SIGINT, shutting down");
                break;
            },
        }
    }
}

#[cfg(not(unix))]
async fn run_until_shutdown(_core: &AccessCore) {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
    tracing::info!("Received SIGINT, shutting down");
}
