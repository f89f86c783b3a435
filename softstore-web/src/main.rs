//! softstore-web - Software catalog web service
//!
//! Serves the program catalog and the submission form. Starts with built-in
//! defaults when no configuration file exists.

use anyhow::{Context, Result};
use clap::Parser;
use softstore_common::config::{
    load_toml_config, resolve_config_path, resolve_root_folder, Config, CONFIG_ENV_VAR,
    ROOT_FOLDER_ENV_VAR,
};
use softstore_common::db::init::init_database;
use softstore_web::{build_router, AppState};
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments (highest configuration priority)
#[derive(Debug, Parser)]
#[command(name = "softstore-web", version, about = "Software catalog web service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root folder for the database, uploads and program storage
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// HTTP port (overrides the configuration file)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref(), CONFIG_ENV_VAR);
    let toml = load_toml_config(config_path.as_deref())?;
    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), ROOT_FOLDER_ENV_VAR, &toml);
    let mut config = Config::from_toml(toml, root_folder)?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting SoftStore (softstore-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file, using built-in defaults"),
    }
    info!("Root folder: {}", config.root_folder.display());

    std::fs::create_dir_all(&config.temp_upload_dir).with_context(|| {
        format!("Failed to create upload directory {}", config.temp_upload_dir.display())
    })?;
    std::fs::create_dir_all(&config.storage_dir).with_context(|| {
        format!("Failed to create storage directory {}", config.storage_dir.display())
    })?;

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Connected to database {}", config.database_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::from_config(pool, &config);
    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("softstore-web listening on http://{}", address);
    info!("Max upload size: {} KB", config.max_upload_size_kb());

    axum::serve(listener, app).await?;

    Ok(())
}
