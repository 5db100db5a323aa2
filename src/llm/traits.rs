//! Model Gateway 抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 ModelGateway：generate（可携带工具声明）与 complete（无工具模式）。
//! 网关本身不重试，重试预算由回合流水线的闸门循环统一控制。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::Message;
use crate::tools::ToolSpec;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("model call timed out after {0}s")]
    Timeout(u64),

    #[error("model returned no choices")]
    EmptyResponse,

    /// 无工具模式下模型仍返回了工具调用
    #[error("unexpected tool call: {0}")]
    UnexpectedToolCall(String),
}

/// 模型发出的工具调用请求（原始形态：名称与 JSON 参数字符串尚未校验）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// 一次模型调用的结果：完成文本或工具调用意图
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReply {
    Text(String),
    ToolRequest(ToolRequest),
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// 发送消息序列；tools 非空时由模型自行决定是否调用工具（auto）
    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<GatewayReply, LlmError>;

    /// 无工具模式：用于工具结果后的收尾生成与闸门重生成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self.generate(messages, &[]).await? {
            GatewayReply::Text(text) => Ok(text),
            GatewayReply::ToolRequest(req) => Err(LlmError::UnexpectedToolCall(req.name)),
        }
    }
}
