//! # VITAL RED 数据存储模块
//!
//! 聚合所有临床集合与视图切片的JSON文档存储：
//! - 持久化适配器：基于键值存储后端的JSON读写
//! - 数据存储：读写、订阅、搜索、统计、导入导出
//! - 订阅层：每次变更后同步通知订阅者
//! - 语言偏好：独立存储键的界面语言设置

pub mod analytics;
pub mod document;
pub mod persistence;
pub mod preferences;
pub mod records;
pub mod search;
pub mod store;
pub mod subscription;

pub use analytics::Analytics;
pub use document::{CoreCollection, CoreCollections, Document, Metadata, ViewData, SCHEMA_VERSION};
pub use persistence::{
    FileStorage, MemoryStorage, PersistenceAdapter, StorageBackend, GLOBAL_DATA_KEY, LANGUAGE_KEY,
    REFERRAL_FORM_KEY,
};
pub use preferences::{Language, LanguagePreference};
pub use records::{CoreRecord, ViewRecord};
pub use search::SearchResults;
pub use store::DataStore;
pub use subscription::{Listener, SubscriberRegistry, Subscription};
