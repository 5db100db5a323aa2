//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MIRROR__*` 覆盖（双下划线表示嵌套，如 `MIRROR__PIPELINE__MAX_REGENERATIONS=1`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::PipelineSettings;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub classifiers: ClassifiersSection,
    pub pipeline: PipelineSection,
    pub tools: ToolsSection,
    pub server: ServerSection,
}

/// [app] 段：system prompt 文件
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    /// 未设置或读取失败时使用内置种子提示词
    pub system_prompt_path: Option<String>,
}

/// [llm] 段：模型、端点、采样温度与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [classifiers] 段：闸门使用的外部分类服务
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifiersSection {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_tone_model")]
    pub tone_model: String,
    /// 覆盖默认的 /v1/moderations 地址
    pub moderation_url: Option<String>,
}

impl Default for ClassifiersSection {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            tone_model: default_tone_model(),
            moderation_url: None,
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_tone_model() -> String {
    "gpt-3.5-turbo".to_string()
}

/// [pipeline] 段：历史窗口、重生成预算、相关性阈值、默认地点
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_max_regenerations")]
    pub max_regenerations: usize,
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
    #[serde(default = "default_location")]
    pub default_location: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_regenerations: default_max_regenerations(),
            relevance_threshold: default_relevance_threshold(),
            default_location: default_location(),
        }
    }
}

impl PipelineSection {
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            history_limit: self.history_limit,
            max_regenerations: self.max_regenerations,
            default_location: self.default_location.clone(),
        }
    }
}

fn default_history_limit() -> usize {
    20
}

fn default_max_regenerations() -> usize {
    2
}

fn default_relevance_threshold() -> f32 {
    0.6
}

fn default_location() -> String {
    "Tel Aviv".to_string()
}

/// [tools] 段：单次工具调用超时（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [server] 段：Web 传输层监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// 从 config 目录加载配置，环境变量 MIRROR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MIRROR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MIRROR")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 加载失败时记录 warn 并回退到默认配置
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}
