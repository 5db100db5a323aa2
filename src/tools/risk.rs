//! diagnose_risk：按关键词分级的风险评估（确定性，无外部调用）

use serde::{Deserialize, Serialize};

/// 严重伤害类关键词 → high
const SEVERE_HARM_TERMS: &[&str] = &["hit", "kick", "choke", "knife"];
/// 恐惧 / 威胁类关键词 → medium
const FEAR_TERMS: &[&str] = &["afraid", "scared", "threaten"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// 各等级对应的固定分数（0-100）
    pub fn score(&self) -> u8 {
        match self {
            RiskLevel::Low => 25,
            RiskLevel::Medium => 60,
            RiskLevel::High => 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub score: u8,
}

/// 小写后做子串匹配；先查严重伤害，再查恐惧威胁，否则为 low
pub fn diagnose_risk(text: &str) -> RiskAssessment {
    let lowered = text.to_lowercase();
    let contains_any = |terms: &[&str]| terms.iter().any(|t| lowered.contains(t));

    let risk_level = if contains_any(SEVERE_HARM_TERMS) {
        RiskLevel::High
    } else if contains_any(FEAR_TERMS) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskAssessment {
        risk_level,
        score: risk_level.score(),
    }
}
