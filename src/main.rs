//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use school_records::adapters::persistence::SqliteStore;
use school_records::adapters::ui::progress::spinner;
use school_records::adapters::ui::tui::TuiInputPort;
use school_records::ports::{InputPort, SchoolStore};
use school_records::shared::config::AppConfig;
use school_records::usecases::{PersistenceSync, Registry, ReportService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    school_records::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        AppConfig::default()
    });
    let data_dir = cfg.data_dir_or_default();
    info!(path = %data_dir.display(), "data directory");

    let sqlite = SqliteStore::connect(&data_dir, cfg.db_file_or_default())
        .await
        .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?;
    let store: Arc<dyn SchoolStore> = Arc::new(sqlite);

    let pb = spinner("Loading records...");
    let loaded = Registry::load(PersistenceSync::new(store)).await;
    pb.finish_and_clear();
    let (registry, stats) = loaded.map_err(|e| {
        error!(error = %e, "failed to load records from storage");
        anyhow::anyhow!("load failed: {}", e)
    })?;
    if stats.skipped > 0 {
        warn!(skipped = stats.skipped, "some stored rows could not be loaded");
    }

    let reports = ReportService::new(cfg.reports_dir_or_default());
    let mut input_port = TuiInputPort::new(registry, reports);
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
