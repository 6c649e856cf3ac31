//! Agent-to-agent handoff.
//!
//! Exposes a specialist agent as a tool on another agent. When the model
//! routes a query to the tool, the specialist runs its own full chat loop and
//! its final answer is returned verbatim as the tool result. A triage agent
//! is just an agent whose only tools are handoffs.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use herd_core::{Error, Tool};

use crate::agent::Agent;
use crate::tools::FunctionTool;

/// Tool name for routing to an agent, derived from its name.
/// "Code Helper" becomes "route_to_code_helper". Names with no ASCII
/// alphanumerics hash to a stable slug so two such agents never collide.
pub fn route_tool_name(agent_name: &str) -> String {
    let slug: String = agent_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        let mut hasher = DefaultHasher::new();
        agent_name.hash(&mut hasher);
        return format!("route_to_agent_{:08x}", hasher.finish() as u32);
    }
    format!("route_to_{slug}")
}

/// Wrap an agent as a routing tool.
///
/// The handler returns a boxed future because it re-enters a chat loop:
/// chat → execute → handoff handler → chat would otherwise form an async
/// type cycle.
pub fn handoff_tool(agent: Arc<Agent>, description: impl Into<String>) -> FunctionTool {
    let definition = Tool {
        name: route_tool_name(agent.name()),
        description: description.into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to forward to the specialist"
                }
            },
            "required": ["query"]
        }),
    };

    FunctionTool::from_boxed(definition, move |args| {
        let agent = Arc::clone(&agent);
        Box::pin(async move {
            let query = args["query"]
                .as_str()
                .ok_or_else(|| Error::Agent("handoff call missing 'query' argument".into()))?
                .to_string();
            info!(specialist = %agent.name(), "handing off query");
            let response = agent.chat(&query).await?;
            Ok(response.content)
        })
    })
}
