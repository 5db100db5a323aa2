//! 工具一致性闸门：用了工具时，草稿必须在文字上体现结构化结果

use async_trait::async_trait;

use crate::gates::{Gate, GateError, GateInput, GateKind, GateVerdict};
use crate::tools::ToolResult;

#[derive(Debug, Default)]
pub struct ToolConsistencyGate;

/// 不满足时返回原因
pub fn inconsistency(draft: &str, result: &ToolResult) -> Option<String> {
    match result {
        ToolResult::Risk(r) => {
            let level = r.risk_level.as_str();
            let score = r.score.to_string();
            let digits: String = score.chars().take(2).collect();
            if !draft.to_lowercase().contains(level) {
                Some(format!("risk level '{level}' not stated"))
            } else if !draft.contains(&digits) {
                Some(format!("risk score {score} not stated"))
            } else {
                None
            }
        }
        ToolResult::Resources(r) => {
            let hotline = r.hotline.split_whitespace().next().unwrap_or(&r.hotline);
            (!draft.contains(hotline)).then(|| format!("hotline {hotline} not mentioned"))
        }
        ToolResult::Report(r) => {
            (!draft.contains(&r.report_id)).then(|| format!("report id {} not mentioned", r.report_id))
        }
    }
}

#[async_trait]
impl Gate for ToolConsistencyGate {
    fn kind(&self) -> GateKind {
        GateKind::ToolConsistency
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<GateVerdict, GateError> {
        let Some(outcome) = input.tool else {
            return Ok(GateVerdict::Pass);
        };
        Ok(match inconsistency(input.draft, &outcome.result) {
            Some(reason) => GateVerdict::Fail(reason),
            None => GateVerdict::Pass,
        })
    }
}
