//! 工具声明（名称 / 描述 / 参数 Schema）：对 Model Gateway 保持稳定
//!
//! 参数 Schema 由 schemars 从参数结构体自动生成，保证声明与解析使用同一份定义。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolName;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagnoseRiskArgs {
    /// What the user described, in her own words.
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindLocalResourcesArgs {
    /// City or district the user mentioned.
    pub location: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SaveReportArgs {
    /// The account to store confidentially, without names.
    pub report: String,
}

/// 单个工具的声明（序列化后即 OpenAI function 定义）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

fn parameters_for<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| {
        serde_json::json!({"type": "object", "properties": {}, "required": []})
    });
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

fn description(name: ToolName) -> &'static str {
    match name {
        ToolName::DiagnoseRisk => {
            "Call this when the user's message describes violence, fear, or potential danger. \
             Use it to assess how severe or urgent the abuse situation is based on what the woman says. \
             For example, if she mentions being hit, threatened, scared, or unsafe at home."
        }
        ToolName::FindLocalResources => {
            "Call this when the user mentions a city, district, or location OR asks for help near her. \
             Use it to suggest nearby hotlines or shelters. Trigger if she says 'I live in...', \
             'Is there somewhere safe near...', or if she sounds ready to take action or escape."
        }
        ToolName::SaveReport => {
            "Call this when the woman explicitly says she wants to report the abuse, file a complaint, \
             or tell her story confidentially. Use this to store what she described in a secure place \
             (without needing her name). Trigger if she says 'I want to report this', \
             'This needs to be saved', or 'Don't let him get away with it'."
        }
    }
}

pub fn tool_spec(name: ToolName) -> ToolSpec {
    let parameters = match name {
        ToolName::DiagnoseRisk => parameters_for::<DiagnoseRiskArgs>(),
        ToolName::FindLocalResources => parameters_for::<FindLocalResourcesArgs>(),
        ToolName::SaveReport => parameters_for::<SaveReportArgs>(),
    };
    ToolSpec {
        name: name.as_str().to_string(),
        description: description(name).to_string(),
        parameters,
    }
}

/// 全部工具声明，顺序固定
pub fn tool_specs() -> Vec<ToolSpec> {
    ToolName::ALL.iter().copied().map(tool_spec).collect()
}
