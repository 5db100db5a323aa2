//! OpenAI 兼容 API 网关
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。
//! 工具调用使用自带的请求/响应线格式（byot），保证 tool / tool_calls 消息形状稳定。

use async_openai::config::OpenAIConfig;
use async_openai::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{GatewayReply, LlmError, ModelGateway, ToolRequest};
use crate::memory::{Message, Role};
use crate::tools::ToolSpec;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

fn to_wire(message: &Message) -> WireMessage {
    let tool_calls = message.tool_call.as_ref().map(|req| {
        vec![WireToolCall {
            id: req.id.clone(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: req.name.clone(),
                arguments: req.arguments.clone(),
            },
        }]
    });
    let content = if tool_calls.is_some() && message.content.is_empty() {
        None
    } else {
        Some(message.content.clone())
    };
    WireMessage {
        role: message.role.as_str(),
        content,
        tool_calls,
        tool_call_id: match message.role {
            Role::Tool => message.tool_call_id.clone(),
            _ => None,
        },
    }
}

/// 从响应中取首条 choice：优先工具调用，其次文本
fn interpret(response: ChatResponse) -> Result<GatewayReply, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;

    let mut calls = choice.message.tool_calls.unwrap_or_default().into_iter();
    if let Some(first) = calls.next() {
        let dropped: Vec<String> = calls.map(|c| c.function.name).collect();
        if !dropped.is_empty() {
            tracing::warn!(honored = %first.function.name, ?dropped, "model requested several tools; only the first is honored");
        }
        return Ok(GatewayReply::ToolRequest(ToolRequest {
            id: first.id,
            name: first.function.name,
            arguments: first.function.arguments,
        }));
    }

    Ok(GatewayReply::Text(choice.message.content.unwrap_or_default()))
}

/// OpenAI 兼容网关：持有 Client、model 名与采样温度
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiGateway {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>, temperature: f32) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<GatewayReply, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(to_wire).collect(),
            temperature: self.temperature,
            tools: tools
                .iter()
                .map(|spec| WireTool {
                    kind: "function",
                    function: spec,
                })
                .collect(),
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
        };

        let response: ChatResponse = self
            .client
            .chat()
            .create_byot(request)
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        interpret(response)
    }
}
