//! save_report：以新生成的短 ID 保存报告，只新增不覆盖，返回值不含任何用户身份信息

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// 生成 ID 碰撞时的最大尝试次数
const MAX_ID_ATTEMPTS: usize = 8;
const REPORT_ID_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum ReportStoreError {
    #[error("report store unavailable: {0}")]
    Unavailable(String),

    #[error("could not allocate a unique report id after {0} attempts")]
    IdExhausted(usize),
}

#[derive(Debug, Clone)]
pub struct StoredReport {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Saved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportReceipt {
    pub status: ReportStatus,
    pub report_id: String,
}

/// 报告存储：只提供「仅当 ID 不存在时插入」
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// 插入成功返回 true；ID 已存在返回 false 且不做任何修改
    async fn insert_new(&self, id: &str, report: StoredReport) -> Result<bool, ReportStoreError>;
}

/// 内存报告存储
#[derive(Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<String, StoredReport>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<StoredReport> {
        self.reports.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert_new(&self, id: &str, report: StoredReport) -> Result<bool, ReportStoreError> {
        let mut reports = self.reports.write().await;
        if reports.contains_key(id) {
            return Ok(false);
        }
        reports.insert(id.to_string(), report);
        Ok(true)
    }
}

fn new_report_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..REPORT_ID_LEN].to_string()
}

pub async fn save_report(store: &dyn ReportStore, text: &str) -> Result<ReportReceipt, ReportStoreError> {
    let created_at = Utc::now();
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = new_report_id();
        let report = StoredReport {
            text: text.to_string(),
            created_at,
        };
        if store.insert_new(&id, report).await? {
            return Ok(ReportReceipt {
                status: ReportStatus::Saved,
                report_id: id,
            });
        }
        tracing::debug!("report id collision, regenerating");
    }
    Err(ReportStoreError::IdExhausted(MAX_ID_ATTEMPTS))
}
