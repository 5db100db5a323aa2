//! Mock 网关与离线嵌入（无 API Key 时使用，也便于本地跑通整条流水线）

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::llm::{EmbeddingProvider, GatewayReply, LlmError, ModelGateway};
use crate::memory::{Message, Role};
use crate::tools::ToolSpec;

/// Mock 网关：从不调用工具，简短复述用户最后一条消息
///
/// 回复只比用户原话多一个词，离线嵌入下的相似度始终高于默认相关性阈值。
#[derive(Debug, Default)]
pub struct MockGateway;

#[async_trait]
impl ModelGateway for MockGateway {
    async fn generate(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<GatewayReply, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(GatewayReply::Text(format!("Understood: \"{}\"", last_user)))
    }
}

const MOCK_DIMENSIONS: usize = 64;

/// 离线嵌入：词袋哈希到固定维度，词汇重叠越多相似度越高
#[derive(Debug, Default)]
pub struct MockEmbedder;

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vec = vec![0.0f32; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vec[(hasher.finish() as usize) % MOCK_DIMENSIONS] += 1.0;
        }
        Ok(vec)
    }
}
