//! 相关性闸门：用户消息与草稿嵌入的余弦相似度低于阈值即失败

use std::sync::Arc;

use async_trait::async_trait;

use crate::gates::{Gate, GateError, GateInput, GateKind, GateVerdict};
use crate::llm::{cosine_similarity, EmbeddingProvider};

pub struct RelevanceGate {
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f32,
}

impl RelevanceGate {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, threshold: f32) -> Self {
        Self { embedder, threshold }
    }

    pub async fn similarity(&self, user_text: &str, draft: &str) -> Result<f32, GateError> {
        let u = self.embedder.embed(user_text).await?;
        let r = self.embedder.embed(draft).await?;
        Ok(cosine_similarity(&u, &r))
    }
}

#[async_trait]
impl Gate for RelevanceGate {
    fn kind(&self) -> GateKind {
        GateKind::Relevance
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<GateVerdict, GateError> {
        let score = self.similarity(input.user_text, input.draft).await?;
        if score >= self.threshold {
            Ok(GateVerdict::Pass)
        } else {
            Ok(GateVerdict::Fail(format!(
                "similarity {score:.2} below threshold {:.2}",
                self.threshold
            )))
        }
    }
}
