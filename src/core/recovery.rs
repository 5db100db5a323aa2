//! 错误恢复引擎
//!
//! 根据 TurnError 类型返回 RecoveryAction，供编排器决定致歉结束还是无工具继续。

use crate::core::{RecoveryAction, TurnError};
use crate::prompts::GATEWAY_APOLOGY;

/// 语义化错误恢复：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &TurnError) -> RecoveryAction {
        match err {
            TurnError::UnknownTool(_)
            | TurnError::InvalidToolArguments { .. }
            | TurnError::ToolExecutionFailed(_)
            | TurnError::ToolTimeout(_) => RecoveryAction::ProceedUngrounded,
            TurnError::GatewayUnavailable(_) => {
                RecoveryAction::Apologize(GATEWAY_APOLOGY.to_string())
            }
        }
    }
}
