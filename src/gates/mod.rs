//! 质量闸门：对草稿逐个做独立的通过/拒绝判定
//!
//! 固定顺序：moderation → placeholder → relevance → empathy → tool-consistency。
//! 闸门从不修改草稿，只报告失败原因，由编排器选择对应的纠正指令。

pub mod chain;
pub mod consistency;
pub mod empathy;
pub mod moderation;
pub mod placeholder;
pub mod relevance;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolOutcome;

pub use chain::{ChainVerdict, GateChain};
pub use consistency::ToolConsistencyGate;
pub use empathy::{EmpathyGate, FixedToneClassifier, LlmToneClassifier, Tone, ToneClassifier};
pub use moderation::{ModerationGate, Moderator, OpenAiModerator, PermissiveModerator};
pub use placeholder::PlaceholderGate;
pub use relevance::RelevanceGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    Moderation,
    Placeholder,
    Relevance,
    Empathy,
    ToolConsistency,
}

impl GateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::Moderation => "moderation",
            GateKind::Placeholder => "placeholder",
            GateKind::Relevance => "relevance",
            GateKind::Empathy => "empathy",
            GateKind::ToolConsistency => "tool_consistency",
        }
    }
}

#[derive(Error, Debug)]
pub enum GateError {
    /// 外部分类服务（审核 / 嵌入 / 语气）失败
    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("unrecognized tone label: {0}")]
    UnknownLabel(String),
}

impl From<LlmError> for GateError {
    fn from(e: LlmError) -> Self {
        GateError::Classifier(e.to_string())
    }
}

/// 闸门输入：(user_text, draft, 工具及其结果)
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub user_text: &'a str,
    pub draft: &'a str,
    pub tool: Option<&'a ToolOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Pass,
    Fail(String),
}

#[async_trait]
pub trait Gate: Send + Sync {
    fn kind(&self) -> GateKind;

    async fn check(&self, input: &GateInput<'_>) -> Result<GateVerdict, GateError>;
}
