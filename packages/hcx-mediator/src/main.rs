use std::sync::Arc;

use clap::Parser;
use hcx_mediator::config::MediatorConfig;
use hcx_mediator::mediator::Mediator;
use hcx_mediator::store::memory::MemoryStore;
use hcx_mediator::{log, server, Args};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match MediatorConfig::load(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration Error: {}", err);
            std::process::exit(exitcode::CONFIG);
        }
    };

    log::init(config.log.clone());

    let mediator = init(config).await;

    let address = mediator.config.server.to_socket_address();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(msg = "Could not bind listener", address, error = err.to_string());
            std::process::exit(exitcode::UNAVAILABLE);
        }
    };

    info!(msg = "HCX Mediator listening", address);

    if let Err(err) = server::serve(mediator, listener).await {
        error!(msg = "Server error", error = err.to_string());
        std::process::exit(exitcode::SOFTWARE);
    }

    info!(msg = "Shutting down HCX Mediator");
}

///
/// Validate configuration and init the Mediator service
///
async fn init(config: MediatorConfig) -> Arc<Mediator> {
    // The dev server runs against the in-memory store; a deployment embeds
    // the crate and provides its own EntityStore over the application
    // database
    warn!(msg = "Using the in-memory entity store; records do not survive a restart");

    let store = Arc::new(MemoryStore::new());

    match Mediator::init(config, store.clone(), store.clone(), store).await {
        Ok(mediator) => {
            info!(
                msg = "Connected to gateway",
                participant_code = mediator.config.gateway.participant_code,
            );
            Arc::new(mediator)
        }
        Err(err) => {
            error!(
                msg = "Could not start HCX Mediator",
                error = err.to_string()
            );
            std::process::exit(exitcode::UNAVAILABLE);
        }
    }
}
