//! 内置提示词库：种子 system prompt、阶段提示、纠正指令、兜底回复与入口问候

use serde::Deserialize;

use crate::gates::GateKind;
use crate::tools::ToolName;

pub const SEED_SYSTEM: &str = "You are MirrorMe, an empathetic, trauma-informed assistant. \
You understand the cycle of abuse (tension → incident → reconciliation → calm) and \
that denial is a natural stage. Always validate feelings, ask open questions, \
and choose among tools: diagnose_risk, find_local_resources, or save_report.";

/// 审核拒绝时的固定安全回复（含紧急联系方式）
pub const SAFETY_FALLBACK: &str =
    "I’m sorry, I can’t continue that topic. If you’re in danger, call 100 or 118.";

/// 模型网关不可用时返回给用户的通用致歉
pub const GATEWAY_APOLOGY: &str = "I’m sorry, I’m having trouble responding right now. \
Please try again in a moment. If you’re in danger, call 100 or 118.";

pub const OPENING: &[&str] = &[
    "Hi, I’m here to listen whenever you feel ready 💜",
    "Thank you for reaching out. How are you feeling today?",
];

pub const REFLECTION: &[&str] = &[
    "Sometimes it helps to look at specific moments. Can we talk about a recent incident?",
    "May I ask you a few gentle questions so we can reflect together?",
];

pub const DANGER_CHECK: &[&str] = &[
    "Do you feel physically unsafe right now?",
    "Has your partner ever threatened or harmed you or someone you love?",
];

pub const DENIAL_STAGE: &[&str] = &[
    "Many people in your situation doubt the seriousness. Do you ever find yourself minimizing what happened?",
    "It’s common to second-guess your own experiences. Do you sometimes worry you’re overreacting?",
];

/// 表示怀疑 / 不确定的标记词
const DENIAL_MARKERS: &[&str] = &["doubt", "not sure"];

/// 用户消息含怀疑标记时，返回需要注入上下文的阶段提示
pub fn stage_injection(user_text: &str) -> Option<&'static str> {
    let lowered = user_text.to_lowercase();
    DENIAL_MARKERS
        .iter()
        .any(|m| lowered.contains(m))
        .then_some(DENIAL_STAGE[0])
}

/// 闸门失败后重生成时追加的 system 纠正指令
pub fn corrective_instruction(gate: GateKind, tool: Option<ToolName>) -> &'static str {
    match gate {
        GateKind::Placeholder => "Remove placeholders and answer clearly.",
        GateKind::Relevance => "Stay on topic: respond to her safety concerns.",
        GateKind::Empathy => "Rewrite warmly and validate her feelings.",
        GateKind::ToolConsistency => match tool {
            Some(ToolName::FindLocalResources) => {
                "Ensure you share the hotline and shelter exactly as provided."
            }
            Some(ToolName::SaveReport) => "Ensure you give her the report ID exactly as provided.",
            _ => "Ensure you state the risk level correctly.",
        },
        // 审核失败不重生成，这里仅为穷尽匹配
        GateKind::Moderation => "Respond safely and supportively.",
    }
}

/// 会话入口来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    #[default]
    Direct,
    Ad,
}

const AD_ENTRY_PROMPT: &str = "I notice you found us through a statement that resonated with you: \"{entry_statement}\". \
Many women have connected with this same thought. I'd like to understand more about how this relates to your experiences, if you're comfortable sharing.";

const DIRECT_ENTRY_PROMPT: &str = "Welcome to MirrorMe. This is a safe space where you can reflect on your relationship dynamics without judgment. \
I'm here to listen and offer support. Would you like to share a bit about what brought you here today?";

/// 入口问候：广告入口且带有触发语句时引用该语句，否则使用直接访问问候
pub fn entry_greeting(source: EntrySource, statement: Option<&str>) -> String {
    match (source, statement.map(str::trim).filter(|s| !s.is_empty())) {
        (EntrySource::Ad, Some(statement)) => AD_ENTRY_PROMPT.replace("{entry_statement}", statement),
        _ => DIRECT_ENTRY_PROMPT.to_string(),
    }
}

/// 按顺序查找 system prompt 文件，找不到时使用内置种子
pub fn load_system_prompt(path: Option<&str>) -> String {
    path.into_iter()
        .chain(["config/prompts/system.txt", "../config/prompts/system.txt"])
        .find_map(|p| std::fs::read_to_string(p).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SEED_SYSTEM.to_string())
}
