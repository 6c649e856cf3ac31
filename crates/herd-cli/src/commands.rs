use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use herd_config::{ConfigLoader, HerdConfig};
use herd_core::{MemoryEntry, Result};
use herd_llm::{LlmProvider, OllamaProvider};
use herd_memory::{InMemoryStore, MemoryStore, PostgresStore, RedisStore, SqliteStore};
use herd_runtime::{Agent, AgentBuilder};

/// Herd — local-first agents on Ollama with persistent memory
#[derive(Parser)]
#[command(name = "herd", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to herd.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat in the terminal
    Chat,
    /// Inspect and edit the agent's persistent memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
    /// Check that the Ollama server is reachable and list installed models
    Health,
    /// Show the resolved configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// List all remembered keys
    List,
    /// Show the value (and metadata) stored under a key
    Get { key: String },
    /// Store a value under a key (parsed as JSON, else stored as a string)
    Set { key: String, value: String },
    /// Delete a key
    Forget { key: String },
    /// Delete everything the agent remembered
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug".to_string()
        } else if self.quiet {
            "error".to_string()
        } else {
            self.log_level
                .clone()
                .unwrap_or_else(|| config.logging.level.clone())
        };

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
        if config.logging.format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }

        match self.command {
            Commands::Chat => Self::cmd_chat(config).await,
            Commands::Memory { action } => Self::cmd_memory(config, action).await,
            Commands::Health => Self::cmd_health(config).await,
            Commands::Config { json } => Self::cmd_config(config, json),
        }
    }

    /// Construct the memory backend named in the config.
    async fn build_store(config: &HerdConfig) -> Result<Arc<dyn MemoryStore>> {
        Ok(match config.memory.backend.as_str() {
            "memory" => Arc::new(InMemoryStore::new()),
            "redis" => {
                let url = config.memory.url.as_deref().unwrap_or("redis://127.0.0.1/");
                Arc::new(RedisStore::connect(url).await?)
            }
            "postgres" => {
                let url = config.memory.url.as_deref().unwrap_or_default();
                Arc::new(PostgresStore::connect(url).await?)
            }
            // validate() already rejected anything else
            _ => Arc::new(SqliteStore::open(&config.memory.path)?),
        })
    }

    async fn build_agent(config: &HerdConfig) -> Result<Arc<Agent>> {
        let provider = OllamaProvider::new(&config.ollama.base_url, &config.ollama.model);
        let builder = AgentBuilder::new(&config.agent.name)
            .instructions(&config.agent.instructions)
            .model(&config.ollama.model)
            .provider(Arc::new(provider))
            .temperature(config.ollama.temperature)
            .max_tokens(config.ollama.max_tokens)
            .max_tool_iterations(config.agent.max_tool_iterations);

        let builder = builder.memory(Self::build_store(config).await?);
        Ok(builder.build())
    }

    async fn cmd_chat(config: HerdConfig) -> Result<()> {
        println!("Herd v{}", env!("CARGO_PKG_VERSION"));
        println!("   Agent:  {}", config.agent.name);
        println!("   Model:  {}", config.ollama.model);
        println!("   Memory: {}", config.memory.backend);
        println!("   Type 'exit' or Ctrl+C to quit, '/stats' for counters, '/clear' to reset the conversation");
        println!();

        let agent = Self::build_agent(&config).await?;

        use tokio::io::AsyncBufReadExt;
        let stdin = tokio::io::stdin();
        let reader = tokio::io::BufReader::new(stdin);
        let mut lines = reader.lines();

        loop {
            eprint!("{} ", style("you>").cyan());
            use std::io::Write;
            std::io::stderr().flush().ok();

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                _ => break, // EOF
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match trimmed {
                "exit" | "quit" | "/exit" => {
                    println!("Goodbye!");
                    break;
                }
                "/stats" => {
                    println!("{}", agent.stats().summary());
                    continue;
                }
                "/clear" => {
                    agent.clear_history();
                    println!("conversation cleared");
                    continue;
                }
                _ => {}
            }

            match agent.chat(trimmed).await {
                Ok(response) => {
                    println!("{} {}", style("herd>").green(), response.content);
                    if response.tool_calls > 0 {
                        eprintln!(
                            "{}",
                            style(format!(
                                "   [{} tool call(s), {} tokens]",
                                response.tool_calls,
                                response.usage.total_tokens()
                            ))
                            .dim()
                        );
                    }
                }
                Err(e) => {
                    println!("{} {}", style("error:").red(), e);
                }
            }
            println!();
        }

        Ok(())
    }

    async fn cmd_memory(config: HerdConfig, action: MemoryAction) -> Result<()> {
        let store = Self::build_store(&config).await?;
        let namespace = &config.agent.name;

        match action {
            MemoryAction::List => {
                let keys = store.keys(namespace).await?;
                if keys.is_empty() {
                    println!("No memories for agent '{namespace}'.");
                } else {
                    println!("{} memories for agent '{namespace}':", keys.len());
                    for key in keys {
                        println!("  {key}");
                    }
                }
            }
            MemoryAction::Get { key } => match store.get(namespace, &key).await? {
                Some(entry) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&entry.value).unwrap_or_default()
                    );
                    if let Some(ref meta) = entry.metadata {
                        println!(
                            "{} {}",
                            style("metadata:").dim(),
                            serde_json::to_string(&meta).unwrap_or_default()
                        );
                    }
                    if let Some(ttl) = entry.ttl_secs() {
                        println!("{} expires in {ttl}s", style("ttl:").dim());
                    }
                }
                None => println!("Key '{key}' not found."),
            },
            MemoryAction::Set { key, value } => {
                // A bare string like "blue" is stored as a JSON string
                let value = serde_json::from_str(&value)
                    .unwrap_or_else(|_| serde_json::Value::String(value));
                store.set(namespace, &key, MemoryEntry::new(value)).await?;
                println!("Stored '{key}'.");
            }
            MemoryAction::Forget { key } => {
                if store.delete(namespace, &key).await? {
                    println!("Forgot '{key}'.");
                } else {
                    println!("Key '{key}' not found.");
                }
            }
            MemoryAction::Clear { yes } => {
                if !yes {
                    println!(
                        "This deletes ALL memories for agent '{namespace}'. Re-run with --yes to confirm."
                    );
                    return Ok(());
                }
                let removed = store.clear(namespace).await?;
                println!("Cleared {removed} memories.");
            }
        }
        Ok(())
    }

    async fn cmd_health(config: HerdConfig) -> Result<()> {
        let provider = OllamaProvider::new(&config.ollama.base_url, &config.ollama.model);
        print!("Checking Ollama at {} ... ", config.ollama.base_url);

        match provider.health_check().await {
            Ok(()) => {
                println!("{}", style("ok").green());
                let models = provider.list_models().await?;
                if models.is_empty() {
                    println!("No models installed. Pull one with: ollama pull {}", config.ollama.model);
                } else {
                    println!("Installed models:");
                    for model in &models {
                        let marker = if *model == config.ollama.model {
                            style(" (configured)").green().to_string()
                        } else {
                            String::new()
                        };
                        println!("  {model}{marker}");
                    }
                    if !models.iter().any(|m| *m == config.ollama.model) {
                        println!(
                            "{} configured model '{}' is not installed",
                            style("warning:").yellow(),
                            config.ollama.model
                        );
                    }
                }
                Ok(())
            }
            Err(e) => {
                println!("{}", style("unreachable").red());
                Err(e)
            }
        }
    }

    fn cmd_config(config: HerdConfig, json: bool) -> Result<()> {
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&config)
                    .map_err(|e| herd_core::Error::Config(e.to_string()))?
            );
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| herd_core::Error::Config(e.to_string()))?
            );
        }
        Ok(())
    }
}
