use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
};

mod models;
mod repositories;
pub mod services;
pub mod settings;

use repositories::{
    analysis::GeminiApi,
    identity::{GoogleIdentity, ProviderVerifier},
    memory::MemoryStore,
    postgres::PostgresStore,
    WasteStore,
};
use settings::{Settings, StorageBackend};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log4rs)?;
    let settings = Settings::new(&args.config).context("Could not load config file.")?;
    log::info!("Starting EcoWaste in {:?} mode.", settings.environment);

    let store = build_store(&settings).await?;
    let model = Arc::new(GeminiApi::new(&settings.gemini)?);
    if settings.gemini.api_key.is_none() {
        log::warn!("No Gemini API key configured; image analysis requests will fail.");
    }
    let identity = Arc::new(ProviderVerifier::new(GoogleIdentity::new(
        settings.auth.google_tokeninfo_url.clone(),
        settings.auth.google_client_id.clone(),
    )));

    services::start_services(store, model, identity, settings).await
}

async fn build_store(settings: &Settings) -> Result<Arc<dyn WasteStore>> {
    match settings.storage.backend {
        StorageBackend::Postgres => {
            let config = settings
                .postgres
                .as_ref()
                .ok_or_else(|| anyhow!("storage.backend is postgres but [postgres] is missing."))?;
            let store = PostgresStore::connect(config)
                .await
                .context("Could not connect to database.")?;

            log::info!("Using Postgres store.");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory store; data is lost on restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn init_logging(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        log4rs::init_file(path, Default::default())
            .map_err(|e| anyhow!("Could not initialize logging: {}", e))?;
        return Ok(());
    }

    let stdout = ConsoleAppender::builder().build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;

    log::warn!("{} not found, logging to console.", path);
    Ok(())
}
