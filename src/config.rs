use crate::mapping::MatchPolicy;
use crate::persistence::ProfileStore;
use crate::session::SessionSettings;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};

const CONFIG_DIR: &str = ".config/voicepad";
const CONFIG_FILE: &str = "config.toml";

/// Application settings, `~/.config/voicepad/config.toml`
///
/// Every field has a default so a partial file still loads.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides `~/.config/voicepad/profiles`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
    /// Profile to listen with; falls back to `default`, then the first one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,
    /// trace, debug, info, warn or error
    pub log_level: String,
    pub matching: MatchPolicy,
    pub session: SessionSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profiles_dir: None,
            active_profile: None,
            log_level: "info".to_string(),
            matching: MatchPolicy::default(),
            session: SessionSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Reads the config file, using defaults when it does not exist.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file: {}", e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;

        info!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn profile_store(&self) -> ProfileStore {
        match &self.profiles_dir {
            Some(dir) => ProfileStore::new(dir),
            None => ProfileStore::new(ProfileStore::default_dir()),
        }
    }

    /// Parsed log level; unknown values fall back to info
    pub fn level(&self) -> Level {
        match self.log_level.trim().to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            other => {
                warn!("Unknown log level '{}', using info", other);
                Level::INFO
            }
        }
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
