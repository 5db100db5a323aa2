//! 占位符检测：未解析的模板标记、字面错误词等不完整生成的痕迹（大小写不敏感）

use async_trait::async_trait;
use regex::{RegexSet, RegexSetBuilder};

use crate::gates::{Gate, GateError, GateInput, GateKind, GateVerdict};

const PATTERNS: &[&str] = &[r"ERROR", r"\{.*?\}", r"undefined", r"\bnonsense\b"];

pub struct PlaceholderGate {
    patterns: RegexSet,
}

impl PlaceholderGate {
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = RegexSetBuilder::new(PATTERNS).case_insensitive(true).build()?;
        Ok(Self { patterns })
    }

    /// 返回首个命中的模式
    pub fn find(&self, text: &str) -> Option<&'static str> {
        self.patterns.matches(text).iter().next().map(|i| PATTERNS[i])
    }
}

#[async_trait]
impl Gate for PlaceholderGate {
    fn kind(&self) -> GateKind {
        GateKind::Placeholder
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<GateVerdict, GateError> {
        Ok(match self.find(input.draft) {
            Some(pattern) => GateVerdict::Fail(format!("draft matches placeholder pattern {pattern}")),
            None => GateVerdict::Pass,
        })
    }
}
