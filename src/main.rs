//! mapsite - Main Entry Point

use clap::{Parser, Subcommand};
use mapsite::captcha::{RecaptchaClient, RecaptchaConfig};
use mapsite::config::AppConfig;
use mapsite::directions::api::{GoogleDirectionsClient, GoogleDirectionsConfig};
use mapsite::observability::{init_default_logging, init_logging_with_level};
use mapsite::server::{self, AppState};
use mapsite::store::ProfileStore;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Level};

/// User accounts and driving directions web backend
#[derive(Parser)]
#[command(name = "mapsite")]
#[command(about = "User accounts and driving directions web backend")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "MAPSITE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP interface
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_cli_logging(cli.verbose);

    info!("Starting mapsite v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_server(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

/// `LOG_LEVEL` unless raised by `-v`
fn init_cli_logging(verbose: u8) {
    match verbose {
        0 => init_default_logging(),
        1 => init_logging_with_level(Some(Level::DEBUG)),
        _ => init_logging_with_level(Some(Level::TRACE)),
    }
}

fn load_configuration(config_path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(AppConfig::load_from_file(path)?);
    }

    for path_str in ["mapsite.toml", "config/mapsite.toml"] {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(AppConfig::load_from_file(path)?);
        }
    }

    Err("no configuration file found; pass -c/--config or create mapsite.toml".into())
}

/// Wire the store and API clients into the shared state
fn build_state(config: AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let captcha = RecaptchaClient::new(RecaptchaConfig::from_app_config(&config)?)?;
    let routing = GoogleDirectionsClient::new(GoogleDirectionsConfig::from_app_config(&config)?)?;

    info!(path = %config.database.path, "Opening profile store");
    let store = ProfileStore::open(Path::new(&config.database.path))?;

    Ok(AppState::new(
        config,
        store,
        Arc::new(captcha),
        Arc::new(routing),
    ))
}

async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(build_state(config)?);

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
    };

    server::serve(state, shutdown).await?;
    Ok(())
}

fn handle_config_command(config: &AppConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    for (name, present) in [
        (&config.recaptcha.secret_key_env, config.get_recaptcha_secret().is_ok()),
        (&config.maps.api_key_env, config.get_maps_api_key().is_ok()),
    ] {
        if !present {
            tracing::warn!(variable = %name, "secret environment variable is not set");
        }
    }

    info!("Configuration validation complete");
    Ok(())
}
