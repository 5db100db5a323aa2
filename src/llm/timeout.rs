//! 超时装饰器：任何模型调用或嵌入调用都不能无限阻塞，超时即视为服务不可用

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{EmbeddingProvider, GatewayReply, LlmError, ModelGateway};
use crate::memory::Message;
use crate::tools::ToolSpec;

pub struct TimeoutGateway {
    inner: Arc<dyn ModelGateway>,
    timeout: Duration,
}

impl TimeoutGateway {
    pub fn new(inner: Arc<dyn ModelGateway>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl ModelGateway for TimeoutGateway {
    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<GatewayReply, LlmError> {
        match tokio::time::timeout(self.timeout, self.inner.generate(messages, tools)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "model gateway timed out");
                Err(LlmError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}

/// 嵌入调用的超时装饰；超时后相关性闸门按分类服务出错处理
pub struct TimeoutEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl TimeoutEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl EmbeddingProvider for TimeoutEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        match tokio::time::timeout(self.timeout, self.inner.embed(text)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "embedding call timed out");
                Err(LlmError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
