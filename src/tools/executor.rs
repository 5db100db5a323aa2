//! 工具分派器
//!
//! 持有资源索引、报告存储与单次调用超时；invoke 按 ToolInvocation 穷尽分派，
//! 失败或超时转为 TurnError（ToolExecutionFailed / ToolTimeout），每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::TurnError;
use crate::tools::{
    diagnose_risk, save_report, ReportStore, ResourceIndex, ToolInvocation, ToolResult,
};

pub struct ToolDispatcher {
    resources: ResourceIndex,
    reports: Arc<dyn ReportStore>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(resources: ResourceIndex, reports: Arc<dyn ReportStore>, timeout_secs: u64) -> Self {
        Self {
            resources,
            reports,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行一次工具调用；超时返回 ToolTimeout，其余失败返回 ToolExecutionFailed
    pub async fn invoke(&self, invocation: &ToolInvocation) -> Result<ToolResult, TurnError> {
        let start = Instant::now();
        let tool = invocation.name();
        let result = timeout(self.timeout, self.run(invocation)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool.as_str(),
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": invocation.audit_preview(),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(r) => r,
            Err(_) => Err(TurnError::ToolTimeout(tool.to_string())),
        }
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolResult, TurnError> {
        match invocation {
            ToolInvocation::DiagnoseRisk { text } => Ok(ToolResult::Risk(diagnose_risk(text))),
            ToolInvocation::FindLocalResources { location } => {
                Ok(ToolResult::Resources(self.resources.lookup(location)))
            }
            ToolInvocation::SaveReport { report } => save_report(self.reports.as_ref(), report)
                .await
                .map(ToolResult::Report)
                .map_err(|e| TurnError::ToolExecutionFailed(e.to_string())),
        }
    }
}
