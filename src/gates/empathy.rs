//! 共情闸门：将草稿语气分类为 empathetic / neutral / cold / judgmental，前两类通过

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::gates::{Gate, GateError, GateInput, GateKind, GateVerdict};
use crate::llm::ModelGateway;
use crate::memory::Message;

const TONE_LABEL_PROMPT: &str = "Label this reply: empathetic / neutral / cold / judgmental.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Empathetic,
    Neutral,
    Cold,
    Judgmental,
}

impl Tone {
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Tone::Empathetic | Tone::Neutral)
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tone::Empathetic => "empathetic",
            Tone::Neutral => "neutral",
            Tone::Cold => "cold",
            Tone::Judgmental => "judgmental",
        })
    }
}

impl FromStr for Tone {
    type Err = GateError;

    /// 容忍大小写、首尾空白与标点（如 "Empathetic."）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().trim_matches(|c: char| !c.is_alphabetic()).to_lowercase();
        match label.as_str() {
            "empathetic" => Ok(Tone::Empathetic),
            "neutral" => Ok(Tone::Neutral),
            "cold" => Ok(Tone::Cold),
            "judgmental" | "judgemental" => Ok(Tone::Judgmental),
            _ => Err(GateError::UnknownLabel(s.trim().to_string())),
        }
    }
}

#[async_trait]
pub trait ToneClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Tone, GateError>;
}

/// 用（温度为 0 的）模型做少样本标注
pub struct LlmToneClassifier {
    gateway: Arc<dyn ModelGateway>,
}

impl LlmToneClassifier {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ToneClassifier for LlmToneClassifier {
    async fn classify(&self, text: &str) -> Result<Tone, GateError> {
        let messages = [Message::system(TONE_LABEL_PROMPT), Message::user(text)];
        let label = self.gateway.complete(&messages).await?;
        label.parse()
    }
}

/// 固定返回某个语气（离线模式）
#[derive(Debug, Clone, Copy)]
pub struct FixedToneClassifier(pub Tone);

#[async_trait]
impl ToneClassifier for FixedToneClassifier {
    async fn classify(&self, _text: &str) -> Result<Tone, GateError> {
        Ok(self.0)
    }
}

pub struct EmpathyGate {
    classifier: Arc<dyn ToneClassifier>,
}

impl EmpathyGate {
    pub fn new(classifier: Arc<dyn ToneClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Gate for EmpathyGate {
    fn kind(&self) -> GateKind {
        GateKind::Empathy
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<GateVerdict, GateError> {
        let tone = self.classifier.classify(input.draft).await?;
        if tone.is_acceptable() {
            Ok(GateVerdict::Pass)
        } else {
            Ok(GateVerdict::Fail(format!("tone classified as {tone}")))
        }
    }
}
