//! 编排器构建器：统一 CLI 与 Web 的初始化逻辑
//!
//! 未显式注入的组件按配置创建（见 crate::agent），测试可逐个替换为假实现。

use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::{
    create_embedding_provider, create_gateway_from_config, create_moderator_from_config,
    create_tone_classifier,
};
use crate::config::{load_config_or_default, AppConfig};
use crate::core::TurnOrchestrator;
use crate::gates::{GateChain, Moderator, ToneClassifier};
use crate::llm::{EmbeddingProvider, ModelGateway};
use crate::memory::{HistoryStore, InMemoryHistoryStore};
use crate::prompts::load_system_prompt;
use crate::tools::{InMemoryReportStore, ReportStore, ResourceIndex, ToolDispatcher};

pub struct OrchestratorBuilder {
    config: AppConfig,
    system_prompt: Option<String>,
    history: Option<Arc<dyn HistoryStore>>,
    gateway: Option<Arc<dyn ModelGateway>>,
    moderator: Option<Arc<dyn Moderator>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    tone: Option<Arc<dyn ToneClassifier>>,
    reports: Option<Arc<dyn ReportStore>>,
    resources: ResourceIndex,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            system_prompt: None,
            history: None,
            gateway: None,
            moderator: None,
            embedder: None,
            tone: None,
            reports: None,
            resources: ResourceIndex::default(),
        }
    }

    /// 从默认路径加载配置后创建构建器
    pub fn from_config_path(config_path: Option<PathBuf>) -> Self {
        Self::new(load_config_or_default(config_path))
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_moderator(mut self, moderator: Arc<dyn Moderator>) -> Self {
        self.moderator = Some(moderator);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_tone_classifier(mut self, tone: Arc<dyn ToneClassifier>) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn with_report_store(mut self, reports: Arc<dyn ReportStore>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn with_resources(mut self, resources: ResourceIndex) -> Self {
        self.resources = resources;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build(self) -> Result<TurnOrchestrator, regex::Error> {
        let cfg = &self.config;
        let gates = GateChain::new(
            self.moderator
                .unwrap_or_else(|| create_moderator_from_config(cfg)),
            self.embedder
                .unwrap_or_else(|| create_embedding_provider(cfg)),
            self.tone.unwrap_or_else(|| create_tone_classifier(cfg)),
            cfg.pipeline.relevance_threshold,
        )?;
        let tools = ToolDispatcher::new(
            self.resources,
            self.reports
                .unwrap_or_else(|| Arc::new(InMemoryReportStore::new())),
            cfg.tools.tool_timeout_secs,
        );
        let system_prompt = self
            .system_prompt
            .unwrap_or_else(|| load_system_prompt(cfg.app.system_prompt_path.as_deref()));

        Ok(TurnOrchestrator::new(
            self.history
                .unwrap_or_else(|| Arc::new(InMemoryHistoryStore::new())),
            self.gateway
                .unwrap_or_else(|| create_gateway_from_config(cfg)),
            tools,
            gates,
            cfg.pipeline.settings(),
            system_prompt,
        ))
    }
}
