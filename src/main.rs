use log::*;
use service::{config::Config, logging::Logger, AppState};
use sse::{Heartbeat, Manager};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        "Starting up Creative Ink push service [{}]...",
        config.runtime_env()
    );

    let heartbeat_interval = config.heartbeat_interval();
    let app_state = AppState::new(config);
    let heartbeat = Heartbeat::new(app_state.sse_manager.clone(), heartbeat_interval).spawn();

    let shutdown = shutdown_signal(app_state.sse_manager.clone(), heartbeat);
    if let Err(e) = web::init_server(app_state, shutdown).await {
        error!("Server stopped with an error: {e}");
        std::process::exit(1);
    }

    info!("Shutdown complete");
}

// Open event streams never finish by themselves, so they are closed here before
// the server waits for in-flight responses to drain.
async fn shutdown_signal(sse_manager: Arc<Manager>, heartbeat: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
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
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }

    heartbeat.abort();
    sse_manager.close_all("server shutting down");
}
