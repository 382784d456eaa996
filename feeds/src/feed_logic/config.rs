use clap::Parser;
use lib_feed::{CapacityPolicy, SessionConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "ordfeed.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Live console feed of inscription images in the Bitcoin mempool", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, help = "Path to the JSON configuration file (default: ./ordfeed.conf).")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "ORDFEED_URL", help = "Base URL of the host serving the snapshot and the push endpoint.")]
    pub base_url: Option<String>,

    #[clap(long, env = "ORDFEED_WS_URL", help = "Explicit push endpoint. Derived from the base URL when absent.")]
    pub ws_url: Option<String>,

    #[clap(long, env = "ORDFEED_RECONNECT_DELAY_MS", help = "Fixed delay in milliseconds before reconnecting the push endpoint.")]
    pub reconnect_delay_ms: Option<u64>,

    #[clap(long, help = "Keep only the N most recent records.")]
    pub capacity: Option<usize>,

    #[clap(long, help = "Keep every record in arrival order. Overrides --capacity.")]
    #[serde(default)]
    pub unbounded: bool,

    #[clap(long, help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl Config {
    /// Built-in defaults, the lowest layer.
    pub fn defaults() -> Config {
        let session = SessionConfig::default();
        Config {
            base_url: Some(session.base_url),
            reconnect_delay_ms: Some(session.reconnect_delay.as_millis() as u64),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            base_url: other.base_url.or(self.base_url),
            ws_url: other.ws_url.or(self.ws_url),
            reconnect_delay_ms: other.reconnect_delay_ms.or(self.reconnect_delay_ms),
            capacity: other.capacity.or(self.capacity),
            unbounded: other.unbounded || self.unbounded,
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn policy(&self) -> CapacityPolicy {
        match (self.unbounded, self.capacity) {
            (true, _) => CapacityPolicy::UnboundedAppend,
            (false, Some(capacity)) => CapacityPolicy::BoundedResort { capacity },
            (false, None) => CapacityPolicy::default(),
        }
    }

    /// Library-level settings for the session.
    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::default();
        if let Some(base_url) = &self.base_url {
            session.base_url = base_url.clone();
        }
        session.ws_url = self.ws_url.clone();
        if let Some(ms) = self.reconnect_delay_ms {
            session.reconnect_delay = Duration::from_millis(ms);
        }
        session.policy = self.policy();
        session
    }
}

/// `./ordfeed.conf`, falling back to `<config dir>/ordfeed/ordfeed.conf`.
fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("ordfeed").join(CONFIG_FILE_NAME),
        None => local,
    }
}

/// `Ok(None)` when there is no file at `path`; `Err` carries the reason a
/// file that exists was not used.
fn read_config_file(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let config_str = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file: {} ({}). Falling back to other sources.", path.display(), e))?;
    serde_json::from_str::<Config>(&config_str)
        .map(Some)
        .map_err(|e| format!("Failed to parse config file: {} ({}). Falling back to other sources.", path.display(), e))
}

/// Layers defaults, then the config file, then environment/CLI.
pub fn resolve(cli: Config, file: Option<Config>) -> Config {
    let mut current_config = Config::defaults();
    if let Some(file_config) = file {
        current_config = current_config.merge(file_config);
    }
    current_config.merge(cli)
}

/// Messages about the config file, held until the logger is up.
pub type ConfigNotes = Vec<(log::Level, String)>;

pub fn load_config() -> (Config, ConfigNotes) {
    // clap handles both env vars and CLI args
    let cli_args = Config::parse();

    let config_file_path = cli_args.config_path.clone().unwrap_or_else(default_config_path);
    let mut notes = ConfigNotes::new();
    let file_config = match read_config_file(&config_file_path) {
        Ok(Some(file_config)) => {
            notes.push((log::Level::Info, format!("Loaded config file {}.", config_file_path.display())));
            Some(file_config)
        }
        Ok(None) => {
            notes.push((
                log::Level::Info,
                format!(
                    "Config file not found at {}. Using defaults and environment/CLI variables.",
                    config_file_path.display()
                ),
            ));
            None
        }
        Err(reason) => {
            notes.push((log::Level::Warn, reason));
            None
        }
    };

    (resolve(cli_args, file_config), notes)
}
