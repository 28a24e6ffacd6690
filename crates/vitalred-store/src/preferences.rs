//! 界面语言偏好
//!
//! 以纯字符串形式保存在独立的存储键下，与数据文档无版本关联。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vitalred_core::{Result, VitalRedError};

use crate::persistence::{StorageBackend, LANGUAGE_KEY};

/// 界面语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = VitalRedError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            other => Err(VitalRedError::validation(format!("Unsupported language: {}", other))),
        }
    }
}

/// 语言偏好存取
#[derive(Clone)]
pub struct LanguagePreference {
    backend: Arc<dyn StorageBackend>,
}

impl LanguagePreference {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// 当前语言，未设置或无法识别时为西班牙语
    pub fn get(&self) -> Language {
        match self.backend.get_item(LANGUAGE_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                warn!("Ignoring stored language preference: {}", e);
                Language::default()
            }),
            Ok(None) => Language::default(),
            Err(e) => {
                warn!("Failed to read language preference: {}", e);
                Language::default()
            }
        }
    }

    pub fn set(&self, language: Language) -> Result<()> {
        self.backend.set_item(LANGUAGE_KEY, language.code())?;
        info!("Language preference set to {}", language);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    #[test]
    fn test_language_preference() {
        let backend = Arc::new(MemoryStorage::new());
        let preference = LanguagePreference::new(backend.clone());
        assert_eq!(preference.get(), Language::Es);

        preference.set(Language::En).unwrap();
        assert_eq!(preference.get(), Language::En);
        assert_eq!(backend.get_item(LANGUAGE_KEY).unwrap().as_deref(), Some("en"));

        backend.set_item(LANGUAGE_KEY, "fr").unwrap();
        assert_eq!(preference.get(), Language::Es);
    }
}
