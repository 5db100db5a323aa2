//! 审核闸门：委托外部内容审核服务，草稿被标记即失败（失败时编排器直接返回安全兜底回复）

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::gates::{Gate, GateError, GateInput, GateKind, GateVerdict};

const DEFAULT_MODERATION_URL: &str = "https://api.openai.com/v1/moderations";

/// 内容审核服务
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn is_flagged(&self, text: &str) -> Result<bool, GateError>;
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    #[serde(default)]
    flagged: bool,
}

/// OpenAI /moderations 端点
pub struct OpenAiModerator {
    client: Client,
    url: String,
    api_key: String,
}

impl OpenAiModerator {
    pub fn new(url: Option<&str>, api_key: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.unwrap_or(DEFAULT_MODERATION_URL).to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Moderator for OpenAiModerator {
    async fn is_flagged(&self, text: &str) -> Result<bool, GateError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "input": text }))
            .send()
            .await
            .map_err(|e| GateError::Classifier(e.to_string()))?
            .error_for_status()
            .map_err(|e| GateError::Classifier(e.to_string()))?;
        let body: ModerationResponse = response
            .json()
            .await
            .map_err(|e| GateError::Classifier(e.to_string()))?;
        Ok(body.results.iter().any(|r| r.flagged))
    }
}

/// 离线模式：从不标记
#[derive(Debug, Default)]
pub struct PermissiveModerator;

#[async_trait]
impl Moderator for PermissiveModerator {
    async fn is_flagged(&self, _text: &str) -> Result<bool, GateError> {
        Ok(false)
    }
}

pub struct ModerationGate {
    moderator: Arc<dyn Moderator>,
}

impl ModerationGate {
    pub fn new(moderator: Arc<dyn Moderator>) -> Self {
        Self { moderator }
    }
}

#[async_trait]
impl Gate for ModerationGate {
    fn kind(&self) -> GateKind {
        GateKind::Moderation
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<GateVerdict, GateError> {
        if self.moderator.is_flagged(input.draft).await? {
            Ok(GateVerdict::Fail("draft flagged by moderation".to_string()))
        } else {
            Ok(GateVerdict::Pass)
        }
    }
}
