//! vitals agent
//!
//! - Loads `vitals.yaml` (or the path given as the first argument)
//! - Starts the shared clock and one poll loop per enabled collector
//! - Serves the registry over HTTP until Ctrl+C / SIGTERM

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use vitals_agent::{app_state, collectors, config, router, scheduler::Scheduler};
use vitals_core::error::VitalsError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "vitals.yaml".into());
    let cfg = config::load_or_default(&path)?;
    let listen: SocketAddr = cfg
        .agent
        .listen
        .parse()
        .map_err(|e| VitalsError::BadConfig(format!("agent.listen: {e}")))?;

    let state = app_state::AppState::new(cfg)?;

    let mut scheduler = Scheduler::new(state.metrics());
    for (collector, every) in collectors::build_enabled(&state.cfg().collectors, &state.metrics()) {
        scheduler.spawn(collector, every);
    }
    if let Some(every) = state.cfg().output.text_dump_interval() {
        scheduler.spawn_text_dump(every);
    }

    let app = router::build_router(state);

    tracing::info!(%listen, "vitals-agent starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    tracing::info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
