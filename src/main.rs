use std::net::SocketAddr;

use env_logger::Env;
use log::{error, info};
use tokio::net::TcpListener;
use truecanvas::errors::AppError;
use truecanvas::{api, AppConfig, AppState};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    let jobs = state.jobs.clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await
                                          .map_err(|source| AppError::Bind { addr: addr.to_string(), source })?;
    info!("listening on {addr}");

    axum::serve(listener, api::router(state)).with_graceful_shutdown(shutdown_signal())
                                             .await
                                             .map_err(AppError::Serve)?;
    jobs.shutdown().await;
    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for ctrl-c: {e}");
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
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
