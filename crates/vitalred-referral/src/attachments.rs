//! 表单附件
//!
//! 附件内容只保存在内存中，序列化时只保留引用信息。

use serde::{Deserialize, Serialize};
use vitalred_core::{Result, VitalRedError};

/// 单个附件大小上限 (10 MB)
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// 允许的附件类型
pub const ALLOWED_MEDIA_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

/// 内存中的附件
#[derive(Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    /// 创建附件并检查类型与大小
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let media_type = media_type.into();

        if name.trim().is_empty() {
            return Err(VitalRedError::validation("Attachment name is required"));
        }
        if !ALLOWED_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(VitalRedError::validation(format!(
                "Unsupported attachment type '{}' for {}",
                media_type, name
            )));
        }
        if content.len() > MAX_ATTACHMENT_BYTES {
            return Err(VitalRedError::validation(format!(
                "Attachment {} is {} bytes, limit is {}",
                name,
                content.len(),
                MAX_ATTACHMENT_BYTES
            )));
        }

        Ok(Self {
            name,
            media_type,
            content,
        })
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn to_ref(&self) -> AttachmentRef {
        AttachmentRef {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
            size: self.size(),
        }
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.content.len())
            .finish()
    }
}

/// 提交载荷中的附件引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub name: String,
    pub media_type: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_validation() {
        let pdf = Attachment::new("historia.pdf", "application/pdf", vec![1, 2, 3]).unwrap();
        assert_eq!(pdf.to_ref().size, 3);

        assert!(Attachment::new("macro.exe", "application/octet-stream", vec![]).is_err());
        assert!(Attachment::new(" ", "image/png", vec![]).is_err());
        assert!(Attachment::new("big.png", "image/png", vec![0; MAX_ATTACHMENT_BYTES + 1]).is_err());
    }
}
