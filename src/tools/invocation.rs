//! 工具调用的强类型表示
//!
//! 模型给出的原始 ToolRequest（名称字符串 + JSON 参数）在这里解析为穷尽的 ToolInvocation 枚举；
//! 未知工具或参数错误直接转为 TurnError，由编排器降级为无工具收尾。

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::core::TurnError;
use crate::llm::ToolRequest;
use crate::tools::{
    DiagnoseRiskArgs, LocalResources, ReportReceipt, RiskAssessment, SaveReportArgs,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    DiagnoseRisk,
    FindLocalResources,
    SaveReport,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::DiagnoseRisk,
        ToolName::FindLocalResources,
        ToolName::SaveReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::DiagnoseRisk => "diagnose_risk",
            ToolName::FindLocalResources => "find_local_resources",
            ToolName::SaveReport => "save_report",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = TurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| TurnError::UnknownTool(s.to_string()))
    }
}

/// 已校验的工具调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    DiagnoseRisk { text: String },
    FindLocalResources { location: String },
    SaveReport { report: String },
}

fn invalid(name: ToolName, reason: impl ToString) -> TurnError {
    TurnError::InvalidToolArguments {
        tool: name.to_string(),
        reason: reason.to_string(),
    }
}

impl ToolInvocation {
    pub fn parse(request: &ToolRequest) -> Result<Self, TurnError> {
        let name: ToolName = request.name.parse()?;
        let raw = request.arguments.trim();
        let args: Value = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw).map_err(|e| invalid(name, e))?
        };

        match name {
            ToolName::DiagnoseRisk => {
                let a: DiagnoseRiskArgs = serde_json::from_value(args).map_err(|e| invalid(name, e))?;
                Ok(Self::DiagnoseRisk { text: a.text })
            }
            // location 允许缺省：随后由 with_fallback_location 补齐
            ToolName::FindLocalResources => Ok(Self::FindLocalResources {
                location: args
                    .get("location")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            }),
            ToolName::SaveReport => {
                let a: SaveReportArgs = serde_json::from_value(args).map_err(|e| invalid(name, e))?;
                Ok(Self::SaveReport { report: a.report })
            }
        }
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::DiagnoseRisk { .. } => ToolName::DiagnoseRisk,
            Self::FindLocalResources { .. } => ToolName::FindLocalResources,
            Self::SaveReport { .. } => ToolName::SaveReport,
        }
    }

    /// 模型未给出地点时，使用回合携带的地点
    pub fn with_fallback_location(self, fallback: &str) -> Self {
        match self {
            Self::FindLocalResources { location } if location.trim().is_empty() => {
                Self::FindLocalResources {
                    location: fallback.to_string(),
                }
            }
            other => other,
        }
    }

    /// 审计日志用的参数预览；报告正文不落日志
    pub fn audit_preview(&self) -> String {
        match self {
            Self::DiagnoseRisk { text } => preview(text),
            Self::FindLocalResources { location } => location.clone(),
            Self::SaveReport { report } => format!("<{} chars>", report.chars().count()),
        }
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// 工具结果：仅附着于当前回合
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    Risk(RiskAssessment),
    Resources(LocalResources),
    Report(ReportReceipt),
}

impl ToolResult {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// 回合内实际执行过的工具及其结果（供 tool-consistency 闸门使用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub invocation: ToolInvocation,
    pub result: ToolResult,
}
