//! 回合状态：阶段、重生成计数与结束原因
//!
//! 状态机：Generating → (ToolPending → ToolDone)? → Checking ⇄ Regenerating → Done。
//! 回合状态只在一次 process_turn 内存在，不跨回合保留。

use serde::Serialize;

/// 回合阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Generating,
    ToolPending,
    ToolDone,
    Checking,
    Regenerating,
    Done,
}

/// 回合结束原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    /// 所有闸门通过
    AllPassed,
    /// 审核拒绝，返回固定安全回复
    ModerationRejected,
    /// 重生成次数用尽，接受最后一稿
    BudgetExhausted,
    /// 重生成调用失败，保留上一稿
    RegenerationFailed,
    /// 模型网关不可用，返回致歉
    GatewayUnavailable,
}

/// 单回合内部状态
#[derive(Clone, Debug)]
pub struct TurnState {
    phase: TurnPhase,
    regenerations: usize,
    max_regenerations: usize,
}

impl TurnState {
    pub fn new(max_regenerations: usize) -> Self {
        Self {
            phase: TurnPhase::Generating,
            regenerations: 0,
            max_regenerations,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn regenerations(&self) -> usize {
        self.regenerations
    }

    pub fn advance(&mut self, phase: TurnPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "turn phase");
        self.phase = phase;
    }

    pub fn can_regenerate(&self) -> bool {
        self.regenerations < self.max_regenerations
    }

    /// 进入 Regenerating 并计数；预算用尽时返回 false 且不改变状态
    pub fn begin_regeneration(&mut self) -> bool {
        if !self.can_regenerate() {
            return false;
        }
        self.regenerations += 1;
        self.advance(TurnPhase::Regenerating);
        true
    }
}
