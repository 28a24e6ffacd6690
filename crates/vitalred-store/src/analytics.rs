//! 存储统计

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitalred_core::ViewName;

use crate::document::Document;

/// 存储统计信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_records: usize,
    /// 视图 -> 最后访问时间
    pub view_activity_summary: BTreeMap<ViewName, DateTime<Utc>>,
    pub data_integrity: bool,
    pub last_updated: DateTime<Utc>,
}

impl Analytics {
    pub fn from_document(document: &Document) -> Self {
        Self {
            total_records: document.count_records(),
            view_activity_summary: document.metadata.views_last_accessed.clone(),
            data_integrity: document.metadata.data_integrity,
            last_updated: document.metadata.last_updated,
        }
    }

    /// 最近访问的视图
    pub fn most_recent_view(&self) -> Option<(ViewName, DateTime<Utc>)> {
        self.view_activity_summary
            .iter()
            .max_by_key(|(_, at)| **at)
            .map(|(view, at)| (*view, *at))
    }
}
