use async_trait::async_trait;
use herd_core::{Error, Message, Result, Role, ToolCall};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::provider::*;

/// Ollama provider — speaks the native chat API at `/api/chat`, including
/// tool calling and NDJSON streaming.
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Address of the Ollama server (e.g. "http://127.0.0.1:11434")
    base_url: String,
    default_model: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            default_model: default_model.into(),
        }
    }

    /// Default local Ollama instance.
    pub fn local(model: &str) -> Self {
        Self::new("http://127.0.0.1:11434", model)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List model names installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let data: Value = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| Error::LlmProvider(format!("ollama: {e}")))?
            .json()
            .await
            .map_err(|e| Error::LlmProvider(e.to_string()))?;

        Ok(data["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Build the `/api/chat` request body for a request.
fn build_chat_body(request: &LlmRequest, stream: bool) -> Value {
    let mut messages = Vec::new();

    if let Some(ref system) = request.system {
        messages.push(json!({
            "role": "system",
            "content": system,
        }));
    }

    for msg in &request.messages {
        let mut entry = json!({
            "role": msg.role.as_str(),
            "content": msg.content,
        });
        // Assistant turns that requested tools must replay those calls
        if !msg.tool_calls.is_empty() {
            entry["tool_calls"] = Value::Array(
                msg.tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "function": {
                                "name": tc.tool_name,
                                "arguments": tc.arguments,
                            }
                        })
                    })
                    .collect(),
            );
        }
        if msg.role == Role::Tool
            && let Some(ref name) = msg.tool_name
        {
            entry["tool_name"] = json!(name);
        }
        messages.push(entry);
    }

    let mut body = json!({
        "model": &request.model,
        "messages": messages,
        "stream": stream,
        "options": {
            "temperature": request.temperature,
            "num_predict": request.max_tokens,
        }
    });

    if !request.tools.is_empty() {
        body["tools"] = Value::Array(
            request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        );
    }

    body
}

/// Extract tool calls from a response message. The wire format carries no
/// call ids, so fresh UUIDs are minted for correlation.
fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let name = call["function"]["name"].as_str()?;
                    Some(ToolCall {
                        id: format!("call_{}", Uuid::new_v4()),
                        tool_name: name.to_string(),
                        arguments: call["function"]["arguments"].clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_usage(data: &Value) -> Usage {
    Usage {
        input_tokens: data["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
        output_tokens: data["eval_count"].as_u64().unwrap_or(0) as u32,
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn models(&self) -> Vec<String> {
        vec![self.default_model.clone()]
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = build_chat_body(request, false);

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::LlmProvider(format!("ollama: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::ModelNotFound(request.model.clone()));
            }
            return Err(Error::LlmProvider(format!("ollama error: {text}")));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| Error::LlmProvider(e.to_string()))?;

        let content = data["message"]["content"].as_str().unwrap_or("").to_string();
        let tool_calls = parse_tool_calls(&data["message"]);
        let has_tool_calls = !tool_calls.is_empty();

        let stop_reason = if has_tool_calls {
            StopReason::ToolUse
        } else if data["done_reason"].as_str() == Some("length") {
            StopReason::MaxTokens
        } else {
            StopReason::EndTurn
        };

        let mut message = Message::assistant(content);
        message.tool_calls = tool_calls;

        Ok(LlmResponse {
            message,
            usage: parse_usage(&data),
            has_tool_calls,
            stop_reason,
        })
    }

    async fn stream(
        &self,
        request: &LlmRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<StreamChunk>> {
        let (tx, rx) = tokio::sync::mpsc::channel(256);

        let body = build_chat_body(request, true);
        let client = self.client.clone();
        let base_url = self.base_url.clone();

        tokio::spawn(async move {
            let resp = client
                .post(format!("{base_url}/api/chat"))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(resp) if resp.status().is_success() => {
                    use futures::StreamExt;
                    let mut stream = resp.bytes_stream();
                    let mut buffer = String::new();
                    let mut saw_tool_calls = false;

                    while let Some(chunk_result) = stream.next().await {
                        match chunk_result {
                            Ok(bytes) => {
                                buffer.push_str(&String::from_utf8_lossy(&bytes));
                                // Ollama sends newline-delimited JSON
                                while let Some(newline_pos) = buffer.find('\n') {
                                    let line = buffer[..newline_pos].trim().to_string();
                                    buffer = buffer[newline_pos + 1..].to_string();
                                    if line.is_empty() {
                                        continue;
                                    }
                                    let Ok(event) = serde_json::from_str::<Value>(&line) else {
                                        continue;
                                    };

                                    if let Some(content) = event["message"]["content"].as_str()
                                        && !content.is_empty()
                                    {
                                        let _ = tx
                                            .send(StreamChunk::TextDelta(content.to_string()))
                                            .await;
                                    }
                                    for tc in parse_tool_calls(&event["message"]) {
                                        saw_tool_calls = true;
                                        let _ = tx.send(StreamChunk::ToolCall(tc)).await;
                                    }
                                    // Final message has "done": true
                                    if event["done"].as_bool() == Some(true) {
                                        let _ =
                                            tx.send(StreamChunk::Usage(parse_usage(&event))).await;
                                        let reason = if saw_tool_calls {
                                            StopReason::ToolUse
                                        } else if event["done_reason"].as_str() == Some("length") {
                                            StopReason::MaxTokens
                                        } else {
                                            StopReason::EndTurn
                                        };
                                        let _ = tx.send(StreamChunk::Done(reason)).await;
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                let _ = tx.send(StreamChunk::Error(e.to_string())).await;
                                return;
                            }
                        }
                    }
                    let _ = tx.send(StreamChunk::Done(StopReason::EndTurn)).await;
                }
                Ok(resp) => {
                    let text = resp.text().await.unwrap_or_default();
                    let _ = tx.send(StreamChunk::Error(text)).await;
                }
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("ollama: {e}"))).await;
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> Result<()> {
        info!(base_url = %self.base_url, "checking ollama health");
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| Error::LlmProvider(format!("ollama unreachable: {e}")))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::LlmProvider("ollama server unhealthy".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herd_core::Tool;

    fn request_with(messages: Vec<Message>, tools: Vec<Tool>) -> LlmRequest {
        LlmRequest {
            model: "qwen2.5-coder:3b-instruct-q8_0".into(),
            messages,
            tools,
            system: Some("Use test_tool when asked.".into()),
            max_tokens: 512,
            temperature: 0.7,
            stream: false,
        }
    }

    #[test]
    fn test_body_includes_system_and_options() {
        let body = build_chat_body(&request_with(vec![Message::user("hello")], vec![]), false);
        assert_eq!(body["model"], "qwen2.5-coder:3b-instruct-q8_0");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["options"]["num_predict"], 512);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_body_carries_tool_schemas() {
        let tool = Tool {
            name: "test_tool".into(),
            description: "Test tool".into(),
            parameters: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        };
        let body = build_chat_body(&request_with(vec![Message::user("use it")], vec![tool]), false);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "test_tool");
        assert_eq!(
            body["tools"][0]["function"]["parameters"]["required"][0],
            "query"
        );
    }

    #[test]
    fn test_body_replays_assistant_tool_calls_and_results() {
        let mut assistant = Message::assistant("");
        assistant.tool_calls = vec![ToolCall {
            id: "call_1".into(),
            tool_name: "test_tool".into(),
            arguments: json!({"query": "hello"}),
        }];
        let result = Message::tool("test_tool", "Result: hello");
        let body = build_chat_body(&request_with(vec![assistant, result], vec![]), false);

        assert_eq!(
            body["messages"][1]["tool_calls"][0]["function"]["name"],
            "test_tool"
        );
        assert_eq!(body["messages"][2]["role"], "tool");
        assert_eq!(body["messages"][2]["tool_name"], "test_tool");
    }

    #[test]
    fn test_parse_tool_calls_mints_ids() {
        let message = json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [
                {"function": {"name": "get_info", "arguments": {"query": "Python"}}},
                {"function": {"name": "route_to_info", "arguments": {"query": "rust"}}}
            ]
        });
        let calls = parse_tool_calls(&message);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].tool_name, "get_info");
        assert_eq!(calls[0].arguments["query"], "Python");
        assert!(calls[0].id.starts_with("call_"));
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn test_parse_usage_reads_eval_counts() {
        let data = json!({"prompt_eval_count": 37, "eval_count": 12});
        let usage = parse_usage(&data);
        assert_eq!(usage.input_tokens, 37);
        assert_eq!(usage.output_tokens, 12);
        assert_eq!(usage.total_tokens(), 49);
    }
}
