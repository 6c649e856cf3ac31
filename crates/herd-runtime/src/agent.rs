//! The [`Agent`]: a named persona with instructions, a model, tools, and
//! optional persistent memory.
//!
//! `chat` runs the think/act loop: send the conversation to the LLM, execute
//! any tool calls it requests, feed the results back, and repeat until the
//! model produces a final text answer or the iteration cap is hit.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use herd_core::{Error, MemoryEntry, Message, Result, ToolExecutor, ToolResult};
use herd_llm::{LlmProvider, LlmRequest, OllamaProvider, Usage};
use herd_memory::MemoryStore;

use crate::handoff::handoff_tool;
use crate::stats::AgentStats;
use crate::tools::{FunctionTool, ToolRegistry};

/// Default model — small enough to run locally, supports tool calling.
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:3b-instruct-q8_0";

// Cap on memory entries surfaced in the system prompt
const MEMORY_PROMPT_MAX: usize = 100;

/// Generation and loop settings for an agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Cap on think/act iterations per chat turn.
    pub max_tool_iterations: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            max_tool_iterations: 8,
        }
    }
}

/// The final answer from one chat turn.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant's text answer.
    pub content: String,
    /// Token usage across every LLM call in this turn.
    pub usage: Usage,
    /// Think/act iterations taken.
    pub iterations: u32,
    /// Tool executions performed.
    pub tool_calls: u32,
}

pub struct Agent {
    name: String,
    instructions: String,
    model: String,
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    memory: Option<Arc<dyn MemoryStore>>,
    settings: AgentSettings,
    history: Mutex<Vec<Message>>,
    stats: Mutex<AgentStats>,
}

impl Agent {
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_memory(&self) -> bool {
        self.memory.is_some()
    }

    /// Snapshot of cumulative counters.
    pub fn stats(&self) -> AgentStats {
        *self.stats.lock()
    }

    /// Zero the cumulative counters.
    pub fn reset_stats(&self) {
        self.stats.lock().reset();
    }

    /// Conversation so far, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.history.lock().clone()
    }

    /// Drop the conversation. Memory is unaffected.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    // ─── Memory facade ─────────────────────────────────────────────────

    fn store(&self) -> Result<&Arc<dyn MemoryStore>> {
        self.memory
            .as_ref()
            .ok_or_else(|| Error::Memory(format!("memory is not enabled for agent '{}'", self.name)))
    }

    /// Store a value under `key`, replacing any existing entry.
    pub async fn remember(&self, key: &str, value: Value) -> Result<()> {
        self.store()?
            .set(&self.name, key, MemoryEntry::new(value))
            .await
    }

    /// Store a value with optional metadata and time-to-live.
    pub async fn remember_with(
        &self,
        key: &str,
        value: Value,
        metadata: Option<Map<String, Value>>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let mut entry = MemoryEntry::new(value);
        if let Some(meta) = metadata {
            entry = entry.with_metadata(meta);
        }
        if let Some(ttl) = expires_in {
            entry = entry.expires_in(ttl);
        }
        self.store()?.set(&self.name, key, entry).await
    }

    /// Retrieve a value, or `None` if absent or expired.
    pub async fn recall(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .store()?
            .get(&self.name, key)
            .await?
            .map(|entry| entry.value))
    }

    /// Delete a key. Returns whether a live entry existed.
    pub async fn forget(&self, key: &str) -> Result<bool> {
        self.store()?.delete(&self.name, key).await
    }

    /// All live keys for this agent, sorted.
    pub async fn memory_keys(&self) -> Result<Vec<String>> {
        self.store()?.keys(&self.name).await
    }

    /// Metadata for a key, or `None` if the entry is absent, expired, or has
    /// no metadata.
    pub async fn memory_metadata(&self, key: &str) -> Result<Option<Map<String, Value>>> {
        Ok(self
            .store()?
            .get(&self.name, key)
            .await?
            .and_then(|entry| entry.metadata))
    }

    /// Delete everything this agent remembered. Other agents sharing the
    /// store are untouched.
    pub async fn clear_memory(&self) -> Result<usize> {
        self.store()?.clear(&self.name).await
    }

    // ─── Chat loop ─────────────────────────────────────────────────────

    /// Instructions plus a `<memory>` block of everything currently
    /// remembered, so the model can draw on past sessions.
    async fn build_system_prompt(&self) -> Result<String> {
        let mut prompt = self.instructions.clone();

        if let Some(store) = &self.memory {
            let keys = store.keys(&self.name).await?;
            let mut lines = Vec::with_capacity(keys.len());
            for key in &keys {
                if let Some(entry) = store.get(&self.name, key).await? {
                    lines.push(format!("- {key}: {}", entry.value));
                }
            }
            lines.truncate(MEMORY_PROMPT_MAX);
            if !lines.is_empty() {
                prompt.push_str("\n\n<memory>\n");
                prompt.push_str(&lines.join("\n"));
                prompt.push_str("\n</memory>");
            }
        }

        Ok(prompt)
    }

    /// Send a user message and run the loop to a final answer.
    pub async fn chat(&self, query: &str) -> Result<ChatResponse> {
        let system = self.build_system_prompt().await?;
        self.history.lock().push(Message::user(query));

        let tools = self.tools.tools();
        let mut usage = Usage::default();
        let mut tool_calls_made = 0u32;
        let mut iteration = 0u32;
        let max_iterations = self.settings.max_tool_iterations;

        loop {
            iteration += 1;
            if iteration > max_iterations {
                warn!(agent = %self.name, max_iterations, "tool iteration cap reached");
                return Err(Error::IterationLimit(max_iterations));
            }

            let messages = self.history.lock().clone();
            let request = LlmRequest {
                model: self.model.clone(),
                messages,
                tools: tools.clone(),
                system: Some(system.clone()),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                stream: false,
            };

            let response = self.provider.complete(&request).await?;
            self.stats.lock().llm_calls += 1;
            usage.merge(&response.usage);

            self.history.lock().push(response.message.clone());

            if !response.has_tool_calls {
                let mut stats = self.stats.lock();
                stats.chats += 1;
                stats.usage.merge(&usage);
                drop(stats);
                info!(
                    agent = %self.name,
                    iterations = iteration,
                    tool_calls = tool_calls_made,
                    "chat turn complete"
                );
                return Ok(ChatResponse {
                    content: response.message.content,
                    usage,
                    iterations: iteration,
                    tool_calls: tool_calls_made,
                });
            }

            for call in &response.message.tool_calls {
                debug!(agent = %self.name, tool = %call.tool_name, "dispatching tool call");
                let result = match self.tools.execute(call).await {
                    Ok(r) => r,
                    // Unknown tool — tell the model instead of aborting the turn
                    Err(e) => ToolResult::error(call, e.to_string()),
                };
                tool_calls_made += 1;
                self.stats.lock().tool_calls += 1;
                self.history
                    .lock()
                    .push(Message::tool(&call.tool_name, &result.content));
            }
        }
    }
}

/// Builder for [`Agent`]. Returns `Arc<Agent>` so the agent can be shared
/// with handoff tools and concurrent callers.
pub struct AgentBuilder {
    name: String,
    instructions: String,
    model: String,
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    memory: Option<Arc<dyn MemoryStore>>,
    settings: AgentSettings,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: String::new(),
            model: DEFAULT_MODEL.to_string(),
            provider: None,
            tools: ToolRegistry::new(),
            memory: None,
            settings: AgentSettings::default(),
        }
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool(mut self, tool: FunctionTool) -> Self {
        self.tools.register(tool);
        self
    }

    /// Expose another agent as a routing tool. Its full answer is returned
    /// verbatim as the tool result.
    pub fn handoff(mut self, agent: Arc<Agent>, description: impl Into<String>) -> Self {
        self.tools.register(handoff_tool(agent, description));
        self
    }

    /// Enable persistent memory, namespaced by agent name.
    pub fn memory(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(store);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.settings.max_tokens = max_tokens;
        self
    }

    pub fn max_tool_iterations(mut self, max: u32) -> Self {
        self.settings.max_tool_iterations = max;
        self
    }

    pub fn build(self) -> Arc<Agent> {
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(OllamaProvider::local(&self.model)));
        Arc::new(Agent {
            name: self.name,
            instructions: self.instructions,
            model: self.model,
            provider,
            tools: self.tools,
            memory: self.memory,
            settings: self.settings,
            history: Mutex::new(Vec::new()),
            stats: Mutex::new(AgentStats::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herd_llm::MockProvider;
    use herd_memory::InMemoryStore;
    use serde_json::json;

    fn mock_agent(provider: MockProvider) -> Arc<Agent> {
        Agent::builder("assistant")
            .instructions("You are a helpful assistant.")
            .provider(Arc::new(provider))
            .build()
    }

    #[tokio::test]
    async fn test_plain_chat() {
        let agent = mock_agent(MockProvider::new("mock").with_response("Hi there!"));
        let response = agent.chat("hello").await.unwrap();
        assert_eq!(response.content, "Hi there!");
        assert_eq!(response.iterations, 1);
        assert_eq!(response.tool_calls, 0);
    }

    #[tokio::test]
    async fn test_history_accumulates_across_turns() {
        let agent = mock_agent(
            MockProvider::new("mock")
                .with_response("first answer")
                .with_response("second answer"),
        );
        agent.chat("one").await.unwrap();
        agent.chat("two").await.unwrap();
        // user, assistant, user, assistant
        assert_eq!(agent.history().len(), 4);

        agent.clear_history();
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_tool_loop() {
        let provider = MockProvider::new("mock")
            .with_tool_call("get_info", json!({"query": "Rust"}))
            .with_response("Rust is a systems language.");

        let agent = Agent::builder("assistant")
            .provider(Arc::new(provider))
            .tool(FunctionTool::new(
                "get_info",
                "Look up a topic",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
                |args| async move {
                    Ok(format!("info: {}", args["query"].as_str().unwrap_or("")))
                },
            ))
            .build();

        let response = agent.chat("tell me about Rust").await.unwrap();
        assert_eq!(response.content, "Rust is a systems language.");
        assert_eq!(response.iterations, 2);
        assert_eq!(response.tool_calls, 1);

        // The tool result landed in history as a tool message
        let history = agent.history();
        assert!(history
            .iter()
            .any(|m| m.role == herd_core::Role::Tool && m.content == "info: Rust"));
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        // Model keeps calling tools forever
        let provider = MockProvider::new("mock")
            .with_tool_call("spin", json!({}))
            .with_tool_call("spin", json!({}))
            .with_tool_call("spin", json!({}));

        let agent = Agent::builder("assistant")
            .provider(Arc::new(provider))
            .max_tool_iterations(2)
            .tool(FunctionTool::new(
                "spin",
                "Do nothing",
                json!({"type": "object", "properties": {}}),
                |_| async move { Ok(String::new()) },
            ))
            .build();

        assert!(matches!(
            agent.chat("go").await,
            Err(Error::IterationLimit(2))
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_call_is_fed_back() {
        let provider = MockProvider::new("mock")
            .with_tool_call("nonexistent", json!({}))
            .with_response("recovered");

        let agent = mock_agent(provider);
        let response = agent.chat("go").await.unwrap();
        assert_eq!(response.content, "recovered");
    }

    #[tokio::test]
    async fn test_memory_facade_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        let agent = Agent::builder("assistant")
            .provider(Arc::new(MockProvider::new("mock")))
            .memory(store)
            .build();

        agent.remember("language", json!("Rust")).await.unwrap();
        assert_eq!(agent.recall("language").await.unwrap(), Some(json!("Rust")));
        assert_eq!(agent.memory_keys().await.unwrap(), vec!["language"]);

        assert!(agent.forget("language").await.unwrap());
        assert_eq!(agent.recall("language").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_metadata() {
        let store = Arc::new(InMemoryStore::new());
        let agent = Agent::builder("assistant")
            .provider(Arc::new(MockProvider::new("mock")))
            .memory(store)
            .build();

        let mut meta = Map::new();
        meta.insert("source".into(), json!("user"));
        agent
            .remember_with("fav", json!("espresso"), Some(meta), None)
            .await
            .unwrap();

        let fetched = agent.memory_metadata("fav").await.unwrap().unwrap();
        assert_eq!(fetched["source"], json!("user"));

        // Plain remember has no metadata
        agent.remember("other", json!(1)).await.unwrap();
        assert_eq!(agent.memory_metadata("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_disabled_errors() {
        let agent = mock_agent(MockProvider::new("mock"));
        assert!(!agent.has_memory());
        assert!(matches!(
            agent.remember("k", json!(1)).await,
            Err(Error::Memory(_))
        ));
        assert!(matches!(agent.recall("k").await, Err(Error::Memory(_))));
        assert!(matches!(agent.memory_keys().await, Err(Error::Memory(_))));
        assert!(matches!(agent.clear_memory().await, Err(Error::Memory(_))));
    }

    #[tokio::test]
    async fn test_agents_share_store_but_not_memory() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());

        let alpha = Agent::builder("alpha")
            .provider(Arc::new(MockProvider::new("mock")))
            .memory(store.clone())
            .build();
        let beta = Agent::builder("beta")
            .provider(Arc::new(MockProvider::new("mock")))
            .memory(store)
            .build();

        alpha.remember("secret", json!("a")).await.unwrap();
        assert_eq!(beta.recall("secret").await.unwrap(), None);

        beta.remember("secret", json!("b")).await.unwrap();
        alpha.clear_memory().await.unwrap();
        assert_eq!(beta.recall("secret").await.unwrap(), Some(json!("b")));
    }

    #[tokio::test]
    async fn test_memory_block_in_system_prompt() {
        let store = Arc::new(InMemoryStore::new());
        let provider = MockProvider::new("mock").with_response("ok");
        let requests = provider.recorded_requests();

        let agent = Agent::builder("assistant")
            .instructions("Be helpful.")
            .provider(Arc::new(provider))
            .memory(store)
            .build();

        agent.remember("name", json!("Sam")).await.unwrap();
        agent.chat("who am I?").await.unwrap();

        let recorded = requests.lock();
        let system = recorded[0].system.as_deref().unwrap();
        assert!(system.starts_with("Be helpful."));
        assert!(system.contains("<memory>"));
        assert!(system.contains("name: \"Sam\""));
    }

    #[tokio::test]
    async fn test_stats_accumulate() {
        let provider = MockProvider::new("mock")
            .with_tool_call("spin", json!({}))
            .with_response("done")
            .with_response("again");

        let agent = Agent::builder("assistant")
            .provider(Arc::new(provider))
            .tool(FunctionTool::new(
                "spin",
                "Do nothing",
                json!({"type": "object", "properties": {}}),
                |_| async move { Ok(String::new()) },
            ))
            .build();

        agent.chat("one").await.unwrap();
        agent.chat("two").await.unwrap();

        let stats = agent.stats();
        assert_eq!(stats.chats, 2);
        assert_eq!(stats.llm_calls, 3);
        assert_eq!(stats.tool_calls, 1);
        assert!(stats.usage.total_tokens() > 0);

        agent.reset_stats();
        let stats = agent.stats();
        assert_eq!(stats.chats, 0);
        assert_eq!(stats.llm_calls, 0);
        assert_eq!(stats.usage.total_tokens(), 0);
    }
}
