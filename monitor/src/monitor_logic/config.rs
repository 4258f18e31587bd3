use anyhow::{Context, Result};
use clap::Parser;
use fleet_common::{Endpoints, FilterCriteria, SyncConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "fleet_monitor.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Robot fleet live-state monitor", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "FLEET_HOST", help = "Host the dashboard is served from; selects local or deployed backend.")]
    pub host: Option<String>,

    #[clap(long = "config", env = "FLEET_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "FLEET_API_BASE", help = "Override for the REST base URL.")]
    pub api_base: Option<String>,

    #[clap(long, env = "FLEET_WS_BASE", help = "Override for the WebSocket base URL.")]
    pub ws_base: Option<String>,

    #[clap(long, env = "FLEET_RECONNECT_DELAY_MS", help = "Fixed delay in milliseconds before reconnecting the live channel.")]
    pub reconnect_delay_ms: Option<u64>,

    #[clap(long, env = "FLEET_REQUEST_TIMEOUT_SECS", help = "Timeout in seconds for the initial snapshot request.")]
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "FLEET_CONNECT_TIMEOUT_SECS", help = "Timeout in seconds for opening the live channel.")]
    pub connect_timeout_secs: Option<u64>,

    #[clap(long, env = "FLEET_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "FLEET_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "FLEET_STATUS", help = "Status filter: Online, Offline or empty for all.")]
    pub status: Option<String>,

    #[clap(long, env = "FLEET_BATTERY", help = "Battery filter: Low or empty for all.")]
    pub battery: Option<String>,

    #[clap(long, env = "FLEET_SEARCH", help = "Case-insensitive substring of the robot id.")]
    pub search: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            host: other.host.or(self.host),
            config_path: other.config_path.or(self.config_path),
            api_base: other.api_base.or(self.api_base),
            ws_base: other.ws_base.or(self.ws_base),
            reconnect_delay_ms: other.reconnect_delay_ms.or(self.reconnect_delay_ms),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            connect_timeout_secs: other.connect_timeout_secs.or(self.connect_timeout_secs),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            status: other.status.or(self.status),
            battery: other.battery.or(self.battery),
            search: other.search.or(self.search),
        }
    }

    fn defaults() -> Config {
        Config {
            host: Some("localhost".to_string()),
            reconnect_delay_ms: Some(5000),
            request_timeout_secs: Some(10),
            connect_timeout_secs: Some(10),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Endpoints and timings for the sync layer.
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let host = self.host.as_deref().unwrap_or("localhost");
        let endpoints = Endpoints::resolve(host, self.api_base.as_deref(), self.ws_base.as_deref())?;

        let mut sync = SyncConfig::new(endpoints);
        if let Some(ms) = self.reconnect_delay_ms {
            sync = sync.with_reconnect_delay(Duration::from_millis(ms));
        }
        if let Some(secs) = self.request_timeout_secs {
            sync = sync.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.connect_timeout_secs {
            sync = sync.with_connect_timeout(Duration::from_secs(secs));
        }
        Ok(sync)
    }

    /// Initial filter selections.
    pub fn criteria(&self) -> Result<FilterCriteria> {
        let criteria = FilterCriteria::parse(
            self.status.as_deref().unwrap_or(""),
            self.battery.as_deref().unwrap_or(""),
            self.search.as_deref().unwrap_or(""),
        )?;
        Ok(criteria)
    }
}

/// Reads a JSON config file. A missing file is not an error.
fn read_config_file(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        log::info!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return Ok(None);
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file_config = serde_json::from_str::<Config>(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(Some(file_config))
}

/// Defaults, then the config file, then env/CLI on top.
pub fn merge_sources(cli_args: Config) -> Result<Config> {
    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path)? {
        current_config = current_config.merge(file_config);
    }
    Ok(current_config.merge(cli_args))
}

pub fn load_config() -> Result<Config> {
    // clap::Parser handles env vars and CLI args together.
    merge_sources(Config::parse())
}
