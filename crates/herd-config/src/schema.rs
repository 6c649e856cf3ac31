use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration — maps to `herd.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HerdConfig {
    pub ollama: OllamaConfig,
    pub agent: AgentConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

// ── Ollama ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Address of the Ollama server.
    pub base_url: String,
    /// Model identifier, e.g. "qwen2.5-coder:3b-instruct-q8_0".
    pub model: String,
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Per-request timeout in seconds. 0 = no timeout.
    pub request_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".into(),
            model: "qwen2.5-coder:3b-instruct-q8_0".into(),
            temperature: 0.7,
            max_tokens: 1024,
            request_timeout_secs: 120,
        }
    }
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent name — also the memory namespace.
    pub name: String,
    /// System instructions injected at the start of every conversation.
    pub instructions: String,
    /// Maximum think/act iterations per chat turn.
    pub max_tool_iterations: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "assistant".into(),
            instructions: "You are a helpful assistant.".into(),
            max_tool_iterations: 8,
        }
    }
}

// ── Memory ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Backend: "memory", "sqlite", "redis", or "postgres".
    pub backend: String,
    /// SQLite database path (sqlite backend only).
    pub path: PathBuf,
    /// Connection URL (redis and postgres backends).
    pub url: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".into(),
            path: PathBuf::from("herd.db"),
            url: None,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl HerdConfig {
    /// Validate the configuration. Returns warnings on success, an error
    /// message on hard failures.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if !(0.0..=2.0).contains(&self.ollama.temperature) {
            return Err(format!(
                "ollama.temperature must be between 0.0 and 2.0, got {}",
                self.ollama.temperature
            ));
        }

        match self.memory.backend.as_str() {
            "memory" | "sqlite" => {}
            "redis" | "postgres" => {
                if self.memory.url.is_none() {
                    return Err(format!(
                        "memory.url is required for the {} backend",
                        self.memory.backend
                    ));
                }
            }
            other => {
                return Err(format!(
                    "unknown memory backend '{other}' (expected memory, sqlite, redis, or postgres)"
                ));
            }
        }

        if self.agent.name.is_empty() {
            return Err("agent.name must not be empty".into());
        }

        if self.agent.max_tool_iterations == 0 {
            return Err("agent.max_tool_iterations must be at least 1".into());
        }

        if self.ollama.max_tokens < 64 {
            warnings.push(format!(
                "ollama.max_tokens is very low ({}), responses will be cut off",
                self.ollama.max_tokens
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            warnings.push(format!(
                "unknown logging.format '{}', falling back to pretty",
                self.logging.format
            ));
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HerdConfig::default();
        assert!(config.validate().unwrap().is_empty());
        assert_eq!(config.memory.backend, "sqlite");
        assert_eq!(config.ollama.base_url, "http://127.0.0.1:11434");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: HerdConfig = toml::from_str(
            r#"
            [agent]
            name = "researcher"

            [memory]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.name, "researcher");
        assert_eq!(config.memory.backend, "memory");
        // Untouched sections keep their defaults
        assert_eq!(config.ollama.temperature, 0.7);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_redis_requires_url() {
        let mut config = HerdConfig::default();
        config.memory.backend = "redis".into();
        assert!(config.validate().is_err());

        config.memory.url = Some("redis://127.0.0.1/".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_temperature_rejected() {
        let mut config = HerdConfig::default();
        config.ollama.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = HerdConfig::default();
        config.memory.backend = "cassandra".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_low_max_tokens_warns() {
        let mut config = HerdConfig::default();
        config.ollama.max_tokens = 16;
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("max_tokens"));
    }
}
