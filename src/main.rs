use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::process::ExitCode;
use std::sync::Arc;

mod shutdown;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
        return ExitCode::FAILURE;
    }

    info!("Starting up event relay...");

    let (relay, notifier, queue) = match service::init_relay(&config) {
        Ok(relay) => relay,
        Err(e) => {
            error!("Failed to start the event relay: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let file_watchers = match service::init_file_watchers(&config, &notifier) {
        Ok(watchers) => watchers,
        Err(e) => {
            error!("Failed to start file watchers: {}", e);
            relay.shutdown();
            return ExitCode::FAILURE;
        }
    };

    let app_state = AppState::new(config, &relay);

    let signalled_relay = Arc::clone(&relay);
    let result = web::init_server(app_state, async move {
        if let Err(e) = shutdown::wait_for_shutdown_signal().await {
            error!("Failed to listen for shutdown signals: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, closing event streams...");
        signalled_relay.shutdown();
    })
    .await;

    if !relay.is_shutting_down() {
        relay.shutdown();
    }
    for watcher in file_watchers {
        watcher.stop().await;
    }
    queue.close().await;

    match result {
        Ok(()) => {
            info!("Event relay stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
