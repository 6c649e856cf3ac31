//! Tool registration and dispatch.
//!
//! A [`FunctionTool`] pairs a JSON-schema definition with an async handler.
//! The [`ToolRegistry`] collects them and dispatches incoming tool calls.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use herd_core::{Error, Result, Tool, ToolCall, ToolExecutor, ToolResult};

/// Boxed future returned by tool handlers. Boxing breaks the async type
/// recursion cycle when a handler routes back into an agent's chat loop.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

type Handler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A callable tool: definition plus handler.
#[derive(Clone)]
pub struct FunctionTool {
    definition: Tool,
    handler: Handler,
}

impl FunctionTool {
    /// Create a tool from a name, description, JSON-schema parameters, and an
    /// async handler taking the parsed arguments.
    ///
    /// # Example
    /// ```
    /// use herd_runtime::FunctionTool;
    /// use serde_json::json;
    ///
    /// let tool = FunctionTool::new(
    ///     "get_info",
    ///     "Look up information on a topic",
    ///     json!({
    ///         "type": "object",
    ///         "properties": {"query": {"type": "string"}},
    ///         "required": ["query"]
    ///     }),
    ///     |args| async move {
    ///         let query = args["query"].as_str().unwrap_or_default().to_string();
    ///         Ok(format!("info about {query}"))
    ///     },
    /// );
    /// assert_eq!(tool.name(), "get_info");
    /// ```
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            definition: Tool {
                name: name.into(),
                description: description.into(),
                parameters,
            },
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Create a tool whose handler already returns a boxed future. Used for
    /// handlers that would otherwise form an async type cycle.
    pub fn from_boxed(
        definition: Tool,
        handler: impl Fn(Value) -> ToolFuture + Send + Sync + 'static,
    ) -> Self {
        Self {
            definition,
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &Tool {
        &self.definition
    }

    pub async fn call(&self, args: Value) -> Result<String> {
        (self.handler)(args).await
    }
}

/// Registry of tools available to an agent.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, FunctionTool>,
    // Registration order, so schemas are presented deterministically
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration with the same name replaces the
    /// earlier one.
    pub fn register(&mut self, tool: FunctionTool) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        } else {
            warn!(tool = %name, "replacing previously registered tool");
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionTool> {
        self.tools.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn tools(&self) -> Vec<Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.definition.clone())
            .collect()
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .tools
            .get(&call.tool_name)
            .ok_or_else(|| Error::ToolNotFound(call.tool_name.clone()))?;

        debug!(tool = %call.tool_name, id = %call.id, "executing tool");

        match tool.call(call.arguments.clone()).await {
            Ok(content) => Ok(ToolResult::ok(call, content)),
            Err(e) => Ok(ToolResult::error(call, e.to_string())),
        }
    }
}
