//! # VITAL RED 管理模块
//!
//! 运行环境的管理功能：
//! - 配置管理：默认值、配置文件与环境变量的分层加载和验证
//! - 日志初始化：纯文本或JSON输出
//! - 数据备份：备份计划、写入与恢复

pub mod backup;
pub mod config;
pub mod logging;

pub use backup::{latest_backup, restore_backup, write_backup, BackupFrequency, BackupSchedule};
pub use config::{
    BackupConfig, ConfigManager, ConfigValidator, IntegrationConfig, LogFormat, LoggingConfig,
    StorageConfig, StorageKind, VitalRedConfig,
};
pub use logging::init_logging;
