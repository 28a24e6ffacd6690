//! # VITAL RED 集成模块
//!
//! 与后端服务的交互：
//! - API客户端：解析 `{success, data, error}` 响应信封，并把结果写入数据存储
//! - 提取进度轮询：定时查询文档提取任务，直到终态或被取消

pub mod api;
pub mod progress;

pub use api::{ApiClient, ApiClientConfig, ApiEnvelope};
pub use progress::{
    ExtractionProgress, ExtractionStatus, PollHandle, ProgressPoller, ProgressSource,
};
