//! MirrorBot - 家暴支持对话机器人的回合流水线
//!
//! 模块划分：
//! - **agent**: 按配置 / 环境变量创建网关与分类服务（OpenAI 兼容或离线 Mock）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 回合编排器、状态机、错误与恢复、构建器
//! - **gates**: 质量闸门（审核、占位符、相关性、共情、工具一致性）
//! - **llm**: Model Gateway 抽象与实现、嵌入、超时装饰
//! - **memory**: 消息模型与会话历史存储
//! - **prompts**: 系统提示、阶段提示、纠正指令与入口问候
//! - **tools**: diagnose_risk / find_local_resources / save_report 与分派器

pub mod agent;
pub mod config;
pub mod core;
pub mod gates;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod prompts;
pub mod tools;

pub use crate::core::{OrchestratorBuilder, TurnOrchestrator, TurnOutcome};
