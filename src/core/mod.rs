//! 核心编排层：回合错误与恢复、回合状态机、编排器与构建器

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod state;

pub use builder::OrchestratorBuilder;
pub use error::{RecoveryAction, TurnError};
pub use orchestrator::{PipelineSettings, TurnOrchestrator, TurnOutcome};
pub use recovery::RecoveryEngine;
pub use state::{DoneReason, TurnPhase, TurnState};
