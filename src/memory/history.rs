//! 会话历史存储抽象层
//!
//! History Store 由编排器的调用方持有并注入；核心只依赖 get_recent / append 两个契约。
//! 同一会话的追加必须串行，不能在一条消息中途与另一回合交错。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::memory::Message;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history backend unavailable: {0}")]
    Unavailable(String),
}

/// 会话历史存储接口（只追加）
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 按插入顺序返回最近 limit 条消息；会话不存在时返回空
    async fn get_recent(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, HistoryError>;

    /// 追加一条消息；会话不存在时创建
    async fn append(&self, session_id: &str, message: Message) -> Result<(), HistoryError>;

    /// 追加一整个回合（user + assistant）。默认逐条追加，实现可覆盖为原子写入
    async fn append_turn(
        &self,
        session_id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<(), HistoryError> {
        self.append(session_id, user).await?;
        self.append(session_id, assistant).await
    }
}

type SessionLog = Arc<Mutex<Vec<Message>>>;

/// 内存会话存储：外层 RwLock 只保护会话表，每个会话一把 Mutex 串行化追加
#[derive(Default)]
pub struct InMemoryHistoryStore {
    sessions: RwLock<HashMap<String, SessionLog>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn log(&self, session_id: &str) -> Option<SessionLog> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn log_or_create(&self, session_id: &str) -> SessionLog {
        if let Some(log) = self.log(session_id).await {
            return log;
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session = %session_id, "session created");
                Arc::new(Mutex::new(Vec::new()))
            })
            .clone()
    }

    /// 会话内消息总数（测试与诊断用）
    pub async fn len(&self, session_id: &str) -> usize {
        match self.log(session_id).await {
            Some(log) => log.lock().await.len(),
            None => 0,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get_recent(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, HistoryError> {
        let Some(log) = self.log(session_id).await else {
            return Ok(Vec::new());
        };
        let messages = log.lock().await;
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn append(&self, session_id: &str, message: Message) -> Result<(), HistoryError> {
        let log = self.log_or_create(session_id).await;
        log.lock().await.push(message);
        Ok(())
    }

    async fn append_turn(
        &self,
        session_id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<(), HistoryError> {
        let log = self.log_or_create(session_id).await;
        let mut messages = log.lock().await;
        messages.push(user);
        messages.push(assistant);
        Ok(())
    }
}
