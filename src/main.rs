//! Serves the custom field configuration of one SQLite database over HTTP.
//!
//! Settings come from `fieldkeeper.toml` in the working directory when it
//! exists, and from `FIELDKEEPER_*` environment variables, for example:
//!
//! ```text
//! FIELDKEEPER_DATABASE=/var/lib/fieldkeeper.db FIELDKEEPER_LISTEN=0.0.0.0:8088 fieldkeeper
//! ```
//!
//! Logging follows `RUST_LOG` when set and the configured level otherwise.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fieldkeeper::database::Database;
use fieldkeeper::interface::ActionInterface;
use fieldkeeper::server::router;
use fieldkeeper::settings::Settings;

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("fieldkeeper={}", settings.log_level))),
        )
        .init();

    let listen = settings.listen.clone();
    info!(database = %settings.database, "opening database");
    let db = match Database::open(settings) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, "could not open database");
            std::process::exit(1);
        }
    };
    let app = router(Arc::new(ActionInterface::new(db)));
    let listener = match tokio::net::TcpListener::bind(&listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %listen, "could not bind");
            std::process::exit(1);
        }
    };
    info!(%listen, "listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
