//! 配置管理
//!
//! 默认值 -> 配置文件 -> `VITALRED_` 前缀环境变量，逐层覆盖

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};
use vitalred_integration::ApiClientConfig;
use vitalred_store::{
    FileStorage, MemoryStorage, StorageBackend, GLOBAL_DATA_KEY, REFERRAL_FORM_KEY,
};

use crate::backup::BackupSchedule;

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<VitalRedConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 系统完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalRedConfig {
    /// 存储配置
    pub storage: StorageConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 后端集成配置
    pub integration: IntegrationConfig,
    /// 备份配置
    pub backup: BackupConfig,
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    File,
}

/// 存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 后端类型
    pub backend: StorageKind,
    /// 文件存储目录
    pub data_dir: String,
    /// 数据文档的存储键
    pub global_key: String,
    /// 转诊表单的存储键
    pub referral_form_key: String,
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别或过滤表达式
    pub level: String,
    /// 输出格式
    pub format: LogFormat,
}

/// 后端集成配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// API基础地址
    pub api_base_url: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
    /// 认证令牌
    pub auth_token: Option<String>,
    /// 提取进度轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 连续失败多少次后停止轮询
    pub max_poll_failures: u32,
}

/// 备份配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// 是否启用自动备份
    pub enabled: bool,
    /// 备份文件目录
    pub directory: String,
    /// 备份计划
    pub schedule: BackupSchedule,
}

/// 配置验证规则
struct ValidationRule {
    field_path: &'static str,
    validator: fn(&VitalRedConfig) -> Result<()>,
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("field_path", &self.field_path)
            .finish()
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

impl ConfigManager {
    /// 创建新的配置管理器，`config_path` 为空时只使用默认值和环境变量
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 加载配置
    fn load_config(config_path: Option<&str>) -> Result<VitalRedConfig> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&VitalRedConfig::default())
                .context("Failed to build default configuration")?,
        );

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("VITALRED")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration sources")?;

        let config: VitalRedConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取当前配置
    pub async fn get_config(&self) -> VitalRedConfig {
        self.config.read().await.clone()
    }

    /// 更新配置
    pub async fn update_config(&self, new_config: VitalRedConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 保存配置到文件
    pub async fn save_config(&self) -> Result<()> {
        let path = self
            .config_path
            .as_deref()
            .context("No configuration file path to save to")?;

        let config = self.config.read().await;
        let config_str =
            toml::to_string_pretty(&*config).context("Failed to serialize configuration")?;

        tokio::fs::write(path, config_str)
            .await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path);
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.update_config(new_config).await
    }

    /// 按点分路径读取配置值，例如 `integration.poll_interval_ms`
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.read().await;
        let config_json =
            serde_json::to_value(&*config).context("Failed to serialize config to JSON")?;

        let mut current = &config_json;
        for part in path.split('.') {
            match current {
                serde_json::Value::Object(map) => {
                    current = map
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
                }
                _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
            }
        }

        serde_json::from_value(current.clone())
            .with_context(|| format!("Failed to deserialize configuration value at {}", path))
    }

    /// 验证配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

impl VitalRedConfig {
    /// 按配置创建存储后端
    pub fn open_backend(&self) -> Result<Arc<dyn StorageBackend>> {
        match self.storage.backend {
            StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageKind::File => {
                let storage = FileStorage::new(&self.storage.data_dir).with_context(|| {
                    format!("Failed to open data directory {}", self.storage.data_dir)
                })?;
                Ok(Arc::new(storage))
            }
        }
    }

    pub fn api_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.integration.api_base_url.clone(),
            timeout: Duration::from_secs(self.integration.timeout_secs),
            auth_token: self.integration.auth_token.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.integration.poll_interval_ms)
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "storage.global_key",
                validator: |config| {
                    if config.storage.global_key.trim().is_empty() {
                        Err(anyhow::anyhow!("Global data key cannot be empty"))
                    } else if config.storage.global_key == config.storage.referral_form_key {
                        Err(anyhow::anyhow!("Global data key and referral form key must differ"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "storage.data_dir",
                validator: |config| {
                    if config.storage.backend == StorageKind::File
                        && config.storage.data_dir.trim().is_empty()
                    {
                        Err(anyhow::anyhow!("File storage requires a data directory"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "integration.poll_interval_ms",
                validator: |config| {
                    if config.integration.poll_interval_ms == 0 {
                        Err(anyhow::anyhow!("Poll interval cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "integration.api_base_url",
                validator: |config| {
                    let url = &config.integration.api_base_url;
                    if url.starts_with("http://") || url.starts_with("https://") {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!("API base URL must be http(s): {}", url))
                    }
                },
            },
            ValidationRule {
                field_path: "backup.schedule",
                validator: |config| config.backup.schedule.validate().map_err(Into::into),
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &VitalRedConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid {}: {}", rule.field_path, e));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::File,
            data_dir: "./data".to_string(),
            global_key: GLOBAL_DATA_KEY.to_string(),
            referral_form_key: REFERRAL_FORM_KEY.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            auth_token: None,
            poll_interval_ms: 2000,
            max_poll_failures: 5,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: "./backups".to_string(),
            schedule: BackupSchedule::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupFrequency;

    #[test]
    fn test_default_config_is_valid() {
        let config = VitalRedConfig::default();
        ConfigValidator::new().validate(&config).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.storage.global_key, GLOBAL_DATA_KEY);
    }

    #[test]
    fn test_validator_rejects_bad_values() {
        let validator = ConfigValidator::new();

        let mut config = VitalRedConfig::default();
        config.integration.poll_interval_ms = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = VitalRedConfig::default();
        config.storage.referral_form_key = config.storage.global_key.clone();
        assert!(validator.validate(&config).is_err());

        let mut config = VitalRedConfig::default();
        config.backup.schedule.hour = 24;
        assert!(validator.validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vitalred.toml");
        std::fs::write(
            &path,
            r#"
[storage]
backend = "memory"

[integration]
poll_interval_ms = 500

[backup.schedule]
frequency = "weekly"
weekday = 3
"#,
        )
        .unwrap();

        let path_str = path.to_str().unwrap();
        let manager = ConfigManager::new(Some(path_str)).unwrap();
        let config = manager.get_config().await;
        assert_eq!(config.storage.backend, StorageKind::Memory);
        assert_eq!(config.integration.poll_interval_ms, 500);
        assert_eq!(config.integration.timeout_secs, 30);
        assert_eq!(config.backup.schedule.frequency, BackupFrequency::Weekly);

        let interval: u64 = manager.get_value("integration.poll_interval_ms").await.unwrap();
        assert_eq!(interval, 500);
        assert!(manager.get_value::<u64>("integration.missing").await.is_err());

        let mut updated = config.clone();
        updated.logging.level = "debug".to_string();
        manager.update_config(updated).await.unwrap();
        manager.save_config().await.unwrap();

        let reloaded = ConfigManager::new(Some(path_str)).unwrap();
        assert_eq!(reloaded.get_config().await.logging.level, "debug");
    }
}
