use herd_llm::Usage;
use serde::{Deserialize, Serialize};

/// Cumulative counters for one agent, since construction or the last
/// [`reset`](AgentStats::reset).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgentStats {
    /// Completed chat turns.
    pub chats: u64,
    /// LLM round trips (a single chat may take several).
    pub llm_calls: u64,
    /// Tool executions, including handoffs.
    pub tool_calls: u64,
    /// Token usage summed across all LLM calls.
    pub usage: Usage,
}

impl AgentStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One-line summary for logs and CLI output.
    pub fn summary(&self) -> String {
        format!(
            "chats={} llm_calls={} tool_calls={} tokens={}",
            self.chats,
            self.llm_calls,
            self.tool_calls,
            self.usage.total_tokens()
        )
    }
}
