use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::HerdConfig;

/// Loads the Herd configuration and supports explicit reload.
pub struct ConfigLoader {
    config: Arc<RwLock<HerdConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > HERD_CONFIG env > ~/.herd/herd.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("HERD_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".herd")
            .join("herd.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> herd_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&raw, &config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            HerdConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(herd_core::Error::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    fn parse(raw: &str, path: &Path) -> herd_core::Result<HerdConfig> {
        toml::from_str::<HerdConfig>(raw).map_err(|e| {
            herd_core::Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> HerdConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<HerdConfig>> {
        Arc::clone(&self.config)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (HERD_MODEL, HERD_OLLAMA_URL, etc.)
    fn apply_env_overrides(mut config: HerdConfig) -> HerdConfig {
        if let Ok(v) = std::env::var("HERD_MODEL") {
            config.ollama.model = v;
        }
        if let Ok(v) = std::env::var("HERD_OLLAMA_URL") {
            config.ollama.base_url = v;
        }
        if let Ok(v) = std::env::var("HERD_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("HERD_MEMORY_BACKEND") {
            config.memory.backend = v;
        }
        // Connection URL: config file takes priority, env is the fallback
        if config.memory.url.is_none() {
            if let Ok(v) = std::env::var("HERD_MEMORY_URL") {
                config.memory.url = Some(v);
            }
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> herd_core::Result<()> {
        if !self.config_path.exists() {
            return Err(herd_core::Error::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.config_path)?;
        let new_config = Self::parse(&raw, &self.config_path)?;
        let new_config = Self::apply_env_overrides(new_config);
        let warnings = new_config.validate().map_err(herd_core::Error::Config)?;
        for w in &warnings {
            warn!("{}", w);
        }
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
