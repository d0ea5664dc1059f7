//! Terragate - Entry Point
//!
//! An HTTP gateway that turns an uploaded codebase into terraform files by
//! coordinating the language-context, codebase-context, deployment-suggestion
//! and terraform-generation services, then merging the generated archive into
//! the upload.

use std::env;
use std::sync::Arc;

use terragate::config::Config;
use terragate::logs::{init_logging, LogOptions};
use terragate::server::serve::serve;
use terragate::server::state::ServerState;
use terragate::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Print version and exit
    let version = version_info();
    if env::args().skip(1).any(|arg| arg == "--version") {
        println!("{}", serde_json::to_string_pretty(&version).unwrap());
        return;
    }

    // Load the configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let log_options = LogOptions::from_env(config.verbose);
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    info!(
        "Starting terragate {} ({})",
        version.version, version.git_hash
    );

    // Build the shared state
    let state = match ServerState::new(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize gateway: {e}");
            std::process::exit(1);
        }
    };

    // Run the server
    let handle = match serve(&config.server, Arc::new(state), await_shutdown_signal()).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    match handle.await {
        Ok(Ok(())) => info!("Shutdown complete"),
        Ok(Err(e)) => error!("Server error: {e}"),
        Err(e) => error!("Server task failed: {e}"),
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
