use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for caces-vote
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacesVoteConfig {
    /// OMBEA hardware-control API
    pub hardware: HardwareConfig,
    /// Voting-session behaviour
    pub session: SessionSettings,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Base URL of the local hardware-control service
    pub base_url: String,
    /// OAuth client id (can be set via env var)
    pub client_id: Option<String>,
    /// OAuth client secret (can be set via env var)
    pub client_secret: Option<String>,
    /// Scopes requested with the client-credentials exchange
    pub scope: String,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9236".to_string(),
            client_id: None,
            client_secret: None,
            scope: "responselink.events responselink.control".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Close a poll automatically when the question's time limit runs out
    pub auto_close_polls: bool,
    /// Countdown used for questions without a time limit
    pub default_time_limit_secs: u32,
    /// Simulated responses used in test mode
    pub simulation: SimulationSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_close_polls: false,
            default_time_limit_secs: 30,
            simulation: SimulationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub min_period_ms: u64,
    pub max_period_ms: u64,
    /// Devices invented when no response link is known
    pub placeholder_devices: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            min_period_ms: 1500,
            max_period_ms: 2500,
            placeholder_devices: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl CacesVoteConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (caces-vote.toml)
    /// 3. Environment variables (prefixed with CACES_VOTE__)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("caces-vote.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("CACES_VOTE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut caces_config: CacesVoteConfig = config.try_deserialize()?;

        // The desktop app shares its credentials through plain OMBEA_* variables
        if caces_config.hardware.client_id.is_none() {
            caces_config.hardware.client_id = std::env::var("OMBEA_CLIENT_ID").ok();
        }
        if caces_config.hardware.client_secret.is_none() {
            caces_config.hardware.client_secret = std::env::var("OMBEA_CLIENT_SECRET").ok();
        }

        Ok(caces_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
