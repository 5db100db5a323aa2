//! 闸门链：按固定顺序评估，遇到第一个失败即返回
//!
//! 外部分类服务出错时该闸门按「通过」处理并记录 warn（fail open），
//! 保证回合总能产出回复。审核服务例外：审核不可用时按拒绝处理（fail closed）。

use std::sync::Arc;

use crate::gates::{
    EmpathyGate, Gate, GateInput, GateKind, GateVerdict, ModerationGate, Moderator,
    PlaceholderGate, RelevanceGate, ToneClassifier, ToolConsistencyGate,
};
use crate::llm::EmbeddingProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerdict {
    Passed,
    Failed { gate: GateKind, reason: String },
}

pub struct GateChain {
    gates: Vec<Box<dyn Gate>>,
}

impl GateChain {
    /// moderation → placeholder → relevance → empathy → tool-consistency
    pub fn new(
        moderator: Arc<dyn Moderator>,
        embedder: Arc<dyn EmbeddingProvider>,
        tone: Arc<dyn ToneClassifier>,
        relevance_threshold: f32,
    ) -> Result<Self, regex::Error> {
        let gates: Vec<Box<dyn Gate>> = vec![
            Box::new(ModerationGate::new(moderator)),
            Box::new(PlaceholderGate::new()?),
            Box::new(RelevanceGate::new(embedder, relevance_threshold)),
            Box::new(EmpathyGate::new(tone)),
            Box::new(ToolConsistencyGate),
        ];
        Ok(Self { gates })
    }

    pub fn kinds(&self) -> Vec<GateKind> {
        self.gates.iter().map(|g| g.kind()).collect()
    }

    pub async fn evaluate(&self, input: &GateInput<'_>) -> ChainVerdict {
        for gate in &self.gates {
            match gate.check(input).await {
                Ok(GateVerdict::Pass) => {}
                Ok(GateVerdict::Fail(reason)) => {
                    tracing::info!(gate = gate.kind().as_str(), %reason, "gate rejected draft");
                    return ChainVerdict::Failed {
                        gate: gate.kind(),
                        reason,
                    };
                }
                Err(e) if gate.kind() == GateKind::Moderation => {
                    tracing::warn!(error = %e, "moderation unavailable, treating as flagged");
                    return ChainVerdict::Failed {
                        gate: GateKind::Moderation,
                        reason: e.to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!(gate = gate.kind().as_str(), error = %e, "gate unavailable, treating as pass");
                }
            }
        }
        ChainVerdict::Passed
    }
}
