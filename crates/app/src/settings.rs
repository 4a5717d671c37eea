//! Handles settings for the application. Configuration is written in
//! `config/finora.toml`; every key can be overridden from the environment
//! with the `FINORA__` prefix (e.g. `FINORA__SERVER__PORT=8080`).
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/finora";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: None,
            port: 3000,
            database: Database::Sqlite("finora.db".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Rates {
    pub base_url: String,
    /// Without a key only base-currency amounts are accepted.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: None,
            timeout_secs: engine::DEFAULT_RATE_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Allocation {
    pub rate_bps: u32,
    pub strategy: String,
    pub max_total_bps: Option<u32>,
}

impl Default for Allocation {
    fn default() -> Self {
        Self {
            rate_bps: engine::DEFAULT_ALLOCATION_RATE_BPS,
            strategy: "fifo".to_string(),
            max_total_bps: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub rates: Rates,
    pub allocation: Allocation,
}

#[derive(Debug, Parser)]
#[command(name = "finora", version, about = "Personal finance bookkeeping server")]
struct Args {
    /// Config file path, without extension (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,
    /// Override the log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();

        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix("FINORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(port) = args.port {
            settings.server.port = port;
        }
        if let Some(level) = args.log_level {
            settings.app.level = level;
        }

        Ok(settings)
    }
}
