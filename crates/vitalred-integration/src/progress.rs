//! 文档提取进度轮询
//!
//! 按固定间隔查询提取任务，遇到终态或持有者取消/释放句柄时停止。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vitalred_core::Result;

use crate::api::ApiClient;

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// 提取任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ExtractionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExtractionStatus::Completed | ExtractionStatus::Failed | ExtractionStatus::Cancelled
        )
    }
}

/// 提取进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionProgress {
    pub job_id: String,
    pub status: ExtractionStatus,
    pub progress: u8,
    pub message: Option<String>,
}

/// 进度来源
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn fetch_progress(&self, job_id: &str) -> Result<ExtractionProgress>;
}

#[async_trait]
impl ProgressSource for ApiClient {
    async fn fetch_progress(&self, job_id: &str) -> Result<ExtractionProgress> {
        self.get(&format!("extractor/jobs/{}/progress", job_id)).await
    }
}

/// 进度轮询器
#[derive(Clone)]
pub struct ProgressPoller {
    source: Arc<dyn ProgressSource>,
    interval: Duration,
    max_consecutive_failures: u32,
}

impl ProgressPoller {
    pub fn new(source: Arc<dyn ProgressSource>) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: 5,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_failures(mut self, max_consecutive_failures: u32) -> Self {
        self.max_consecutive_failures = max_consecutive_failures;
        self
    }

    /// 开始轮询，每次取得进度都调用 `on_update`
    ///
    /// 句柄被释放或调用 `cancel` 后不再回调。
    pub fn start<F>(&self, job_id: impl Into<String>, on_update: F) -> PollHandle
    where
        F: Fn(&ExtractionProgress) + Send + Sync + 'static,
    {
        let job_id = job_id.into();
        let mounted = Arc::new(AtomicBool::new(true));
        let source = self.source.clone();
        let interval = self.interval;
        let max_failures = self.max_consecutive_failures;

        let task = {
            let mounted = mounted.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                let mut failures = 0u32;

                loop {
                    ticker.tick().await;
                    if !mounted.load(Ordering::SeqCst) {
                        debug!("Polling for job {} cancelled", job_id);
                        return None;
                    }

                    match source.fetch_progress(&job_id).await {
                        Ok(progress) => {
                            failures = 0;
                            if !mounted.load(Ordering::SeqCst) {
                                return None;
                            }
                            on_update(&progress);

                            if progress.status.is_terminal() {
                                info!("Extraction job {} finished: {:?}", job_id, progress.status);
                                return Some(progress);
                            }
                        }
                        Err(e) => {
                            failures += 1;
                            warn!(
                                "Failed to fetch progress for job {} ({}/{}): {}",
                                job_id, failures, max_failures, e
                            );
                            if failures >= max_failures {
                                return None;
                            }
                        }
                    }
                }
            })
        };

        PollHandle {
            mounted,
            task: Some(task),
        }
    }
}

/// 轮询句柄
pub struct PollHandle {
    mounted: Arc<AtomicBool>,
    task: Option<JoinHandle<Option<ExtractionProgress>>>,
}

impl PollHandle {
    /// 停止轮询，之后不会再有回调
    pub fn cancel(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
            && self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// 等待轮询结束，返回终态进度；被取消或连续失败时返回 `None`
    pub async fn wait(mut self) -> Option<ExtractionProgress> {
        let task = self.task.take()?;
        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Progress polling task failed: {}", e);
                None
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}
