//! 回合编排器：一次 用户输入 → 助手回复 的完整流水线
//!
//! 读取历史 → 构建上下文 → 生成（可选一次工具调用 + 收尾生成）→ 闸门重试循环 → 写回历史。
//! process_turn 不会失败：任何错误都被转换为回复（致歉 / 安全兜底 / 上一稿）。

use std::sync::Arc;

use serde::Serialize;

use crate::core::{DoneReason, RecoveryAction, RecoveryEngine, TurnError, TurnPhase, TurnState};
use crate::gates::{ChainVerdict, GateChain, GateInput, GateKind};
use crate::llm::{GatewayReply, ModelGateway, ToolRequest};
use crate::memory::{HistoryStore, Message};
use crate::prompts::{
    corrective_instruction, entry_greeting, stage_injection, EntrySource, GATEWAY_APOLOGY,
    SAFETY_FALLBACK,
};
use crate::tools::{tool_specs, ToolDispatcher, ToolInvocation, ToolName, ToolOutcome, ToolSpec};

/// [pipeline] 段在运行期使用的参数
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// 构建上下文时读取的历史条数
    pub history_limit: usize,
    pub max_regenerations: usize,
    /// 模型与请求都未给出地点时的兜底地点
    pub default_location: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            max_regenerations: 2,
            default_location: "Tel Aviv".to_string(),
        }
    }
}

/// 回合结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    /// 实际执行成功的工具
    pub tool: Option<ToolName>,
    pub regenerations: usize,
    pub reason: DoneReason,
}

pub struct TurnOrchestrator {
    history: Arc<dyn HistoryStore>,
    gateway: Arc<dyn ModelGateway>,
    tools: ToolDispatcher,
    gates: GateChain,
    recovery: RecoveryEngine,
    settings: PipelineSettings,
    system_prompt: String,
    specs: Vec<ToolSpec>,
}

impl TurnOrchestrator {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        gateway: Arc<dyn ModelGateway>,
        tools: ToolDispatcher,
        gates: GateChain,
        settings: PipelineSettings,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            history,
            gateway,
            tools,
            gates,
            recovery: RecoveryEngine::new(),
            settings,
            system_prompt: system_prompt.into(),
            specs: tool_specs(),
        }
    }

    /// 新会话：生成会话 id
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// 打开会话：按入口来源生成问候，并作为会话第一条助手消息写入
    pub async fn open_session(
        &self,
        session_id: &str,
        source: EntrySource,
        statement: Option<&str>,
    ) -> String {
        let greeting = entry_greeting(source, statement);
        if let Err(e) = self
            .history
            .append(session_id, Message::assistant(greeting.as_str()))
            .await
        {
            tracing::error!(session = %session_id, error = %e, "failed to record greeting");
        }
        tracing::info!(session = %session_id, ?source, "session opened");
        greeting
    }

    /// 处理一个回合，总是返回回复
    pub async fn process_turn(
        &self,
        session_id: &str,
        user_text: &str,
        location: Option<&str>,
    ) -> TurnOutcome {
        tracing::info!(session = %session_id, "turn started");
        let mut state = TurnState::new(self.settings.max_regenerations);
        let mut context = self.build_context(session_id, user_text).await;

        let (mut draft, tool) = match self.first_draft(&mut state, &mut context, location).await {
            Ok(v) => v,
            Err(e) => {
                return self
                    .finish(session_id, user_text, self.apologize(&e), None, state, DoneReason::GatewayUnavailable)
                    .await;
            }
        };

        state.advance(TurnPhase::Checking);
        let reason = loop {
            let input = GateInput {
                user_text,
                draft: &draft,
                tool: tool.as_ref(),
            };
            let (gate, why) = match self.gates.evaluate(&input).await {
                ChainVerdict::Passed => break DoneReason::AllPassed,
                ChainVerdict::Failed { gate: GateKind::Moderation, .. } => {
                    draft = SAFETY_FALLBACK.to_string();
                    break DoneReason::ModerationRejected;
                }
                ChainVerdict::Failed { gate, reason } => (gate, reason),
            };

            if !state.begin_regeneration() {
                tracing::warn!(
                    session = %session_id,
                    gate = gate.as_str(),
                    reason = %why,
                    regenerations = state.regenerations(),
                    "RetryBudgetExhausted: accepting last draft"
                );
                break DoneReason::BudgetExhausted;
            }

            let mut retry = context.clone();
            retry.push(Message::system(corrective_instruction(
                gate,
                tool.as_ref().map(|t| t.invocation.name()),
            )));
            match self.gateway.complete(&retry).await {
                Ok(text) => {
                    draft = text;
                    state.advance(TurnPhase::Checking);
                }
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "regeneration failed, keeping last draft");
                    break DoneReason::RegenerationFailed;
                }
            }
        };

        let tool_name = tool.as_ref().map(|t| t.invocation.name());
        self.finish(session_id, user_text, draft, tool_name, state, reason).await
    }

    /// 系统提示 + 最近历史 + 阶段提示（可选）+ 本轮用户消息
    async fn build_context(&self, session_id: &str, user_text: &str) -> Vec<Message> {
        let history = self
            .history
            .get_recent(session_id, self.settings.history_limit)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(session = %session_id, error = %e, "history unavailable, continuing without it");
                Vec::new()
            });

        let mut context = Vec::with_capacity(history.len() + 3);
        context.push(Message::system(self.system_prompt.as_str()));
        context.extend(history);
        if let Some(stage) = stage_injection(user_text) {
            tracing::debug!(session = %session_id, "denial marker detected, injecting stage prompt");
            context.push(Message::assistant(stage));
        }
        context.push(Message::user(user_text));
        context
    }

    /// 第一次生成；若模型请求工具则执行并收尾生成。
    /// 工具成功时 context 追加工具调用与工具结果两条消息，后续重生成沿用。
    async fn first_draft(
        &self,
        state: &mut TurnState,
        context: &mut Vec<Message>,
        location: Option<&str>,
    ) -> Result<(String, Option<ToolOutcome>), TurnError> {
        let request = match self.gateway.generate(context.as_slice(), &self.specs).await? {
            GatewayReply::Text(text) => return Ok((text, None)),
            GatewayReply::ToolRequest(request) => request,
        };

        state.advance(TurnPhase::ToolPending);
        match self.run_tool(&request, location).await {
            Ok(outcome) => {
                context.push(Message::assistant_tool_call(request.clone()));
                context.push(Message::tool_result(
                    request.id.as_str(),
                    outcome.invocation.name().as_str(),
                    outcome.result.to_json(),
                ));
                state.advance(TurnPhase::ToolDone);
                let draft = self.gateway.complete(context.as_slice()).await?;
                Ok((draft, Some(outcome)))
            }
            Err(e) => match self.recovery.handle(&e) {
                RecoveryAction::ProceedUngrounded => {
                    tracing::warn!(tool = %request.name, error = %e, "tool failed, finalizing without it");
                    let draft = self.gateway.complete(context.as_slice()).await?;
                    Ok((draft, None))
                }
                RecoveryAction::Apologize(_) => Err(e),
            },
        }
    }

    async fn run_tool(&self, request: &ToolRequest, location: Option<&str>) -> Result<ToolOutcome, TurnError> {
        let fallback = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.settings.default_location.as_str());
        let invocation = ToolInvocation::parse(request)?.with_fallback_location(fallback);
        let result = self.tools.invoke(&invocation).await?;
        Ok(ToolOutcome { invocation, result })
    }

    fn apologize(&self, err: &TurnError) -> String {
        tracing::error!(error = %err, "model gateway unavailable");
        match self.recovery.handle(err) {
            RecoveryAction::Apologize(msg) => msg,
            RecoveryAction::ProceedUngrounded => GATEWAY_APOLOGY.to_string(),
        }
    }

    /// 写回本回合的 user + assistant 两条消息；写入失败只记录日志
    async fn finish(
        &self,
        session_id: &str,
        user_text: &str,
        reply: String,
        tool: Option<ToolName>,
        mut state: TurnState,
        reason: DoneReason,
    ) -> TurnOutcome {
        state.advance(TurnPhase::Done);
        if let Err(e) = self
            .history
            .append_turn(session_id, Message::user(user_text), Message::assistant(reply.as_str()))
            .await
        {
            tracing::error!(session = %session_id, error = %e, "failed to record turn");
        }
        tracing::info!(
            session = %session_id,
            tool = tool.map(|t| t.as_str()).unwrap_or("none"),
            regenerations = state.regenerations(),
            ?reason,
            "turn finished"
        );
        TurnOutcome {
            reply,
            tool,
            regenerations: state.regenerations(),
            reason,
        }
    }
}
