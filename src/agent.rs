//! 运行时组件工厂
//!
//! 根据配置与环境变量选择后端：设置了 OPENAI_API_KEY 时使用 OpenAI 兼容网关与分类服务，
//! 否则退回 Mock 网关与离线分类器，保证整条流水线在本地可跑通。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::gates::{
    FixedToneClassifier, LlmToneClassifier, Moderator, OpenAiModerator, PermissiveModerator, Tone,
    ToneClassifier,
};
use crate::llm::{
    create_embedder_from_config, EmbeddingProvider, MockEmbedder, MockGateway, ModelGateway,
    OpenAiGateway, TimeoutEmbedder, TimeoutGateway,
};

/// 非空的 OPENAI_API_KEY
pub fn api_key_from_env() -> Option<String> {
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}

fn with_timeout(cfg: &AppConfig, inner: Arc<dyn ModelGateway>) -> Arc<dyn ModelGateway> {
    Arc::new(TimeoutGateway::new(
        inner,
        Duration::from_secs(cfg.llm.timeouts.request),
    ))
}

/// 对话网关（已套超时装饰）
pub fn create_gateway_from_config(cfg: &AppConfig) -> Arc<dyn ModelGateway> {
    let inner: Arc<dyn ModelGateway> = match api_key_from_env() {
        Some(key) => {
            tracing::info!("Using OpenAI-compatible gateway ({})", cfg.llm.model);
            Arc::new(OpenAiGateway::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(&key),
                cfg.llm.temperature,
            ))
        }
        None => {
            tracing::warn!("No OPENAI_API_KEY set, using Mock gateway");
            Arc::new(MockGateway)
        }
    };
    with_timeout(cfg, inner)
}

pub fn create_moderator_from_config(cfg: &AppConfig) -> Arc<dyn Moderator> {
    match api_key_from_env() {
        Some(key) => Arc::new(OpenAiModerator::new(
            cfg.classifiers.moderation_url.as_deref(),
            &key,
            cfg.llm.timeouts.request,
        )),
        None => Arc::new(PermissiveModerator),
    }
}

/// 嵌入服务（已套超时装饰）
pub fn create_embedding_provider(cfg: &AppConfig) -> Arc<dyn EmbeddingProvider> {
    let key = api_key_from_env();
    let inner = create_embedder_from_config(
        cfg.llm.base_url.as_deref(),
        &cfg.classifiers.embedding_model,
        key.as_deref(),
    )
    .unwrap_or_else(|| Arc::new(MockEmbedder));
    Arc::new(TimeoutEmbedder::new(
        inner,
        Duration::from_secs(cfg.llm.timeouts.request),
    ))
}

/// 语气分类：温度 0 的独立模型；离线时固定为 empathetic
pub fn create_tone_classifier(cfg: &AppConfig) -> Arc<dyn ToneClassifier> {
    match api_key_from_env() {
        Some(key) => {
            let gateway: Arc<dyn ModelGateway> = Arc::new(OpenAiGateway::new(
                cfg.llm.base_url.as_deref(),
                &cfg.classifiers.tone_model,
                Some(&key),
                0.0,
            ));
            Arc::new(LlmToneClassifier::new(with_timeout(cfg, gateway)))
        }
        None => Arc::new(FixedToneClassifier(Tone::Empathetic)),
    }
}
