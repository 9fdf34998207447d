// src/main.rs
use models::{CliApp, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod cli;
mod config;
mod enrich;
mod errors;
mod export;
mod extract;
mod fetcher;
mod models;
mod pipeline;
mod search;

use config::{load_config, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let (config, config_err) = match load_config("config.yml").await {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Setup logging
    std::env::set_var(
        "RUST_LOG",
        format!(
            "supplier_finder={},hyper=warn,reqwest=warn",
            config.logging.level
        ),
    );
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Some(e) = config_err {
        warn!("Failed to load config.yml: {}. Using defaults.", e);
    }

    // Create output directory
    tokio::fs::create_dir_all(&config.output.directory).await?;

    // Run CLI app
    let app = CliApp::new(config);
    app.run().await?;

    Ok(())
}
