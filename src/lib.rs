mod db;
pub mod connectivity;
pub mod enrichment;
pub mod models;
pub mod queue;
pub mod records;
pub mod settings;
pub mod sync;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

pub use db::Database;
pub use settings::{SettingsStore, SyncSettings, SETTINGS_FILE};
pub use sync::{SyncController, SyncStatus};

const DEFAULT_DATA_DIR: &str = "tripsync-data";

fn data_dir() -> PathBuf {
    std::env::var_os("TRIPSYNC_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Run the background sync agent until Ctrl-C.
pub async fn run() -> Result<()> {
    // Info by default; RUST_LOG takes precedence.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("tripsync starting up...");

    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_store = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
    let settings = settings_store.current().with_env_overrides();
    if settings.firestore.project_id.is_empty() {
        log::warn!(
            "no Firestore project configured in {}; enrichment writes will fail",
            settings_store.path().display()
        );
    }

    let database = Database::new(data_dir.join("tripsync.sqlite3"))?;
    let controller = SyncController::new(database, &settings)?;

    let cancel_token = CancellationToken::new();
    controller.start(cancel_token.clone()).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    log::info!("shutting down");
    cancel_token.cancel();
    controller.shutdown().await
}
