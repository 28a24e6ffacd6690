//! 持久化适配器
//!
//! `StorageBackend` 抽象了浏览器 localStorage 式的字符串键值存储，
//! `PersistenceAdapter` 在其上完成固定键的JSON序列化与反序列化。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};
use vitalred_core::{Result, VitalRedError};

/// 全局数据文档的存储键
pub const GLOBAL_DATA_KEY: &str = "vital-red-global-data";
/// 已提交转诊表单的存储键
pub const REFERRAL_FORM_KEY: &str = "vital-red-referral-form";
/// 界面语言偏好的存储键
pub const LANGUAGE_KEY: &str = "vital-red-language";

/// 键值存储后端
pub trait StorageBackend: Send + Sync {
    /// 读取键对应的值，不存在时返回 `None`
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// 写入键值
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// 删除键
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// 内存存储
///
/// 可选配额用于模拟存储空间不足。
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带配额的内存存储，所有值的总字节数不得超过配额
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if used + value.len() > quota {
                return Err(VitalRedError::storage(format!(
                    "Quota exceeded writing '{}': {} bytes requested, {} of {} bytes in use",
                    key,
                    value.len(),
                    used,
                    quota
                )));
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// 文件存储，每个键对应目录下的一个 `.json` 文件
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// 创建文件存储，目录不存在时自动创建
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            || key.starts_with('.')
        {
            return Err(VitalRedError::storage(format!("Invalid storage key: '{}'", key)));
        }
        Ok(self.base_path.join(format!("{}.json", key)))
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // 先写临时文件再重命名，避免留下半截文件
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, &path)?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// 固定键的JSON持久化适配器
#[derive(Clone)]
pub struct PersistenceAdapter {
    backend: Arc<dyn StorageBackend>,
    key: String,
}

impl PersistenceAdapter {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// 序列化并写入
    ///
    /// 失败时记录日志并返回错误，由调用方决定如何标记数据完整性。
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|e| {
            error!("Failed to serialize value for '{}': {}", self.key, e);
            VitalRedError::from(e)
        })?;

        self.backend.set_item(&self.key, &json).map_err(|e| {
            error!("Failed to persist '{}': {}", self.key, e);
            e
        })
    }

    /// 读取并反序列化，不存在返回 `Ok(None)`，格式错误返回 `Err`
    pub fn load_checked<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let raw = match self.backend.get_item(&self.key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let value = serde_json::from_str(&raw)?;
        Ok(Some(value))
    }

    /// 读取并反序列化，不存在或格式错误都返回 `None`
    pub fn load<T: DeserializeOwned>(&self) -> Option<T> {
        match self.load_checked() {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unreadable value under '{}': {}", self.key, e);
                None
            }
        }
    }

    /// 删除存储的值
    pub fn clear(&self) -> Result<()> {
        self.backend.remove_item(&self.key)
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .finish()
    }
}
