use log::*;
use service::AppState;
use std::future::Future;
use tokio::net::TcpListener;

mod controller;
mod error;
mod params;
mod router;
mod sse;

pub use error::{Error, Result};
pub use router::define_routes;

/// Binds the configured interface and port and serves the relay's HTTP API
/// until `shutdown` resolves. Open event streams are expected to end on their
/// own once the relay is shut down, which lets the graceful shutdown finish.
pub async fn init_server<F>(app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let interface = app_state.config.interface().to_string();
    let port = app_state.config.port;
    let url_prefix = app_state.config.url_prefix();

    let listener = TcpListener::bind((interface.as_str(), port)).await?;
    info!(
        "Server starting... listening for connections on http://{}:{}{}/api/event",
        interface, port, url_prefix
    );

    axum::serve(listener, router::define_routes(app_state))
        .with_graceful_shutdown(shutdown)
        .await
}
