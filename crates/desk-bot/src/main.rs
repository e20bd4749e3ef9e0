//! wallet-desk - Telegram account dashboard entry point

use anyhow::Result;
use clap::Parser;
use desk_bot::{AppConfig, Application, EnvSettings, UserDirectory};
use tracing::{info, warn};

/// Read-only exchange account dashboard driven by chat commands
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DESK_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env is optional; real environment variables win
    let dotenv_loaded = dotenv::dotenv().is_ok();

    desk_telemetry::init_logging()?;

    info!("Starting wallet-desk v{}", env!("CARGO_PKG_VERSION"));
    if !dotenv_loaded {
        info!("No .env file loaded");
    }

    // CLI arg > DESK_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("DESK_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let env = EnvSettings::from_env()?;
    let mut config = AppConfig::load(&config_path)?;
    config.apply_env(&env);
    info!(
        alert_symbol = %config.alert.symbol,
        alert_cooldown_secs = config.alert.cooldown_secs,
        menu_delay_secs = config.cleanup.menu_delay_secs,
        "Configuration loaded"
    );

    let users = UserDirectory::from_env();
    if users.is_empty() {
        warn!("No exchange users configured; account commands will answer as not configured");
    }

    let app = Application::new(config, &env, users)?;
    app.run().await?;

    Ok(())
}
