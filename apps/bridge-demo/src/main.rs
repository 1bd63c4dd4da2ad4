use bridge_demo::bindings::{Counter, register};
use bridge_demo::error::DemoError;
use bridge_demo::launcher::SystemBrowser;
use bridge_demo::logger::initialize as LoggerInitialize;
use bridge_demo::page;
use bridge_demo::paths::{DemoPaths, load_dotenv};

use bridge_core::config::BridgeConfig;
use bridge_core::ipc::{BridgeServer, start_bridge_server};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), DemoError> {
    // .env before anything reads the environment
    let dotenv = load_dotenv();

    let paths = DemoPaths::resolve()?;
    let log_dir = paths.log_dir();
    create_dir_all(&log_dir).map_err(|e| DemoError::Demo {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let config = BridgeConfig::load(paths.config_dir())?;
    LoggerInitialize(&log_dir, config.dev_enabled())?;

    info!("Bridge demo starting");
    info!("Log directory: {}", log_dir.display());
    if let Some(path) = dotenv {
        info!("Loaded .env from {}", path.display());
    }

    let server = BridgeServer::new(config)?;
    server.set_page(page(&server.config().script_path()));
    let counter = Arc::new(Counter::default());
    register(&server, Arc::clone(&counter))?;
    info!("Bindings: {}", server.binding_names().join(", "));

    let handle = start_bridge_server(server).await?;
    let url = handle.url();
    info!("Serving {url}");

    if let Err(e) = handle.run_with(&SystemBrowser, &url).await {
        warn!("Could not open a browser ({e}); open {url} manually");
        handle.closed().await;
    }

    info!("Bridge demo finished; counter ended at {}", counter.value());
    Ok(())
}
