//! 回合错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 TurnError 决定致歉结束（Apologize）或无工具继续（ProceedUngrounded）。

use thiserror::Error;

use crate::llm::LlmError;

/// 一个回合中可能出现的错误（网关、工具）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("Model gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 模型请求了未注册的工具
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidToolArguments { tool: String, reason: String },
}

impl From<LlmError> for TurnError {
    fn from(e: LlmError) -> Self {
        TurnError::GatewayUnavailable(e.to_string())
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 以固定致歉结束本回合（仍然记录回合）
    Apologize(String),
    /// 丢弃工具结果，按无工具上下文收尾
    ProceedUngrounded,
}
