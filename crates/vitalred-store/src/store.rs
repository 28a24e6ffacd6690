//! 数据存储
//!
//! 应用启动时构造一次，通过 `Arc<DataStore>` 注入所有使用方。
//! 每次变更：修改内存文档 -> 刷新元数据 -> 持久化 -> 同步通知订阅者。

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, error, info, warn};
use vitalred_core::{Result, ViewName};

use crate::analytics::Analytics;
use crate::document::Document;
use crate::persistence::{MemoryStorage, PersistenceAdapter, StorageBackend, GLOBAL_DATA_KEY};
use crate::records::{CoreRecord, ViewRecord};
use crate::search::{search_document, SearchResults};
use crate::subscription::{SubscriberRegistry, Subscription};

/// 全局临床数据存储
pub struct DataStore {
    document: RwLock<Document>,
    persistence: PersistenceAdapter,
    subscribers: Arc<SubscriberRegistry>,
}

impl DataStore {
    /// 以默认存储键打开存储
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::open(PersistenceAdapter::new(backend, GLOBAL_DATA_KEY))
    }

    /// 基于内存后端的存储
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// 从持久化适配器加载文档
    ///
    /// 存储中的值无法解码时回退到空文档，并将数据完整性标记为假。
    pub fn open(persistence: PersistenceAdapter) -> Self {
        let document = match persistence.load_checked::<Document>() {
            Ok(Some(mut document)) => {
                document.metadata.total_records = document.count_records();
                info!(
                    "Loaded data document from '{}' ({} records)",
                    persistence.key(),
                    document.metadata.total_records
                );
                document
            }
            Ok(None) => {
                info!("No stored data under '{}', starting empty", persistence.key());
                Document::empty()
            }
            Err(e) => {
                warn!(
                    "Stored data under '{}' is unreadable, starting empty: {}",
                    persistence.key(),
                    e
                );
                let mut document = Document::empty();
                document.metadata.data_integrity = false;
                document
            }
        };

        Self {
            document: RwLock::new(document),
            persistence,
            subscribers: SubscriberRegistry::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.document.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.document.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前文档的快照
    pub fn get_data(&self) -> Document {
        self.read().clone()
    }

    /// 读取视图切片
    pub fn get_view_data<T: ViewRecord>(&self) -> Vec<T> {
        T::slice(&self.read().view_data).clone()
    }

    /// 读取核心集合
    pub fn get_core_data<T: CoreRecord>(&self) -> Vec<T> {
        T::collection(&self.read().core).clone()
    }

    /// 整体替换视图切片
    pub fn update_view_data<T: ViewRecord>(&self, items: Vec<T>) {
        debug!("Replacing view '{}' with {} records", T::VIEW, items.len());
        self.mutate(|document| *T::slice_mut(&mut document.view_data) = items);
    }

    /// 向视图切片追加一条记录
    pub fn add_view_data<T: ViewRecord>(&self, item: T) {
        debug!("Appending record to view '{}'", T::VIEW);
        self.mutate(|document| T::slice_mut(&mut document.view_data).push(item));
    }

    /// 整体替换核心集合
    pub fn update_core_data<T: CoreRecord>(&self, items: Vec<T>) {
        debug!("Replacing collection '{}' with {} records", T::COLLECTION, items.len());
        self.mutate(|document| *T::collection_mut(&mut document.core) = items);
    }

    /// 记录视图访问时间
    ///
    /// 只持久化，不通知订阅者：访问记录不影响任何界面渲染。
    pub fn record_view_access(&self, view: ViewName) {
        let mut document = self.write();
        document.metadata.views_last_accessed.insert(view, Utc::now());
        self.persist(&mut document);
    }

    /// 全局搜索
    pub fn search(&self, query: &str) -> SearchResults {
        search_document(&self.read(), query)
    }

    /// 存储统计
    pub fn get_analytics(&self) -> Analytics {
        Analytics::from_document(&self.read())
    }

    /// 导出完整文档为JSON
    pub fn export_data(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(&*self.read())?;
        Ok(json)
    }

    /// 导入完整文档
    ///
    /// 先完整解码再替换，任何解码错误都不会改动当前文档。
    pub fn import_data(&self, json: &str) -> bool {
        let imported: Document = match serde_json::from_str(json) {
            Ok(document) => document,
            Err(e) => {
                error!("Rejected data import: {}", e);
                return false;
            }
        };

        self.mutate(|document| {
            *document = imported;
            document.metadata.data_integrity = true;
        });
        info!("Imported data document");
        true
    }

    /// 清空所有数据
    pub fn clear_all_data(&self) {
        self.mutate(|document| *document = Document::empty());
        info!("Cleared all data");
    }

    /// 订阅文档变更
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Document) + Send + Sync + 'static,
    {
        self.subscribers.register(Arc::new(callback))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 执行一次变更：写锁内修改、刷新元数据并持久化，释放锁后通知订阅者
    ///
    /// 修订号在写锁内分配，并发写入时通知可能乱序到达，订阅者以修订号为准。
    fn mutate<F>(&self, apply: F)
    where
        F: FnOnce(&mut Document),
    {
        let snapshot = {
            let mut document = self.write();
            let revision = document.metadata.revision + 1;
            apply(&mut document);
            document.metadata.revision = revision;
            document.refresh_metadata(Utc::now());
            self.persist(&mut document);
            document.clone()
        };

        self.subscribers.notify(&snapshot);
    }

    fn persist(&self, document: &mut Document) {
        if let Err(e) = self.persistence.save(&*document) {
            warn!("Data document not persisted, marking integrity as false: {}", e);
            document.metadata.data_integrity = false;
        }
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("persistence", &self.persistence)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CoreCollection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use vitalred_core::*;

    fn patient(id: &str, name: &str, number: &str) -> Patient {
        Patient {
            id: id.to_string(),
            identification_type: IdentificationType::CC,
            identification_number: number.to_string(),
            full_name: name.to_string(),
            birth_date: None,
            sex: None,
            phone: None,
            address: None,
            eps: "Nueva EPS".to_string(),
            priority: Priority::Medium,
            assigned_doctor: None,
            status: PatientStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn medication(id: &str, patient_id: &str, name: &str, instructions: &str) -> Medication {
        Medication {
            id: id.to_string(),
            patient_id: patient_id.to_string(),
            name: name.to_string(),
            dosage: "500 mg".to_string(),
            frequency: "cada 8 horas".to_string(),
            instructions: instructions.to_string(),
            prescribed_by: "Dra. Ramírez".to_string(),
            active: true,
            start_date: Utc::now().date_naive(),
        }
    }

    fn education(id: &str) -> EducationRecord {
        EducationRecord {
            id: id.to_string(),
            module_id: "mod_1".to_string(),
            title: "Triage".to_string(),
            progress_percent: 50,
        }
    }

    #[test]
    fn test_metadata_consistency() {
        let store = DataStore::in_memory();

        store.update_core_data(vec![
            patient("p1", "Juan Pérez", "12345678"),
            patient("p2", "Ana Gómez", "87654321"),
        ]);
        store.update_core_data(vec![medication("m1", "p1", "Amoxicilina", "con comida")]);
        store.update_view_data(vec![education("e1"), education("e2")]);
        store.add_view_data(education("e3"));

        let data = store.get_data();
        assert_eq!(data.metadata.total_records, 6);
        assert_eq!(data.metadata.total_records, data.count_records());
        assert_eq!(data.core.len_of(CoreCollection::Patients), 2);
        assert_eq!(store.get_view_data::<EducationRecord>().len(), 3);
        assert_eq!(store.get_analytics().total_records, 6);

        store.update_core_data::<Patient>(Vec::new());
        assert_eq!(store.get_data().metadata.total_records, 4);
    }

    #[test]
    fn test_revision_increases_across_clear_and_import() {
        let store = DataStore::in_memory();
        store.update_core_data(vec![patient("p1", "Juan Pérez", "12345678")]);
        let exported = store.export_data().unwrap();
        assert_eq!(store.get_data().metadata.revision, 1);

        store.record_view_access(ViewName::Education);
        assert_eq!(store.get_data().metadata.revision, 1);

        store.clear_all_data();
        assert_eq!(store.get_data().metadata.revision, 2);

        assert!(store.import_data(&exported));
        assert_eq!(store.get_data().metadata.revision, 3);
    }

    #[test]
    fn test_subscriber_fan_out_and_unsubscribe() {
        let store = DataStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen_totals = Arc::new(Mutex::new(Vec::new()));

        let mut subscriptions = Vec::new();
        for _ in 0..3 {
            let calls = calls.clone();
            let seen_totals = seen_totals.clone();
            subscriptions.push(store.subscribe(move |document| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen_totals.lock().unwrap().push(document.metadata.total_records);
            }));
        }

        store.add_view_data(education("e1"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*seen_totals.lock().unwrap(), vec![1, 1, 1]);

        subscriptions.remove(0).unsubscribe();
        store.add_view_data(education("e2"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(store.subscriber_count(), 2);
    }

    #[test]
    fn test_subscriber_can_read_store() {
        let store = Arc::new(DataStore::in_memory());
        let observed = Arc::new(AtomicUsize::new(0));

        let _subscription = {
            let store_ref = Arc::downgrade(&store);
            let observed = observed.clone();
            store.subscribe(move |_| {
                if let Some(store) = store_ref.upgrade() {
                    observed.store(store.get_data().count_records(), Ordering::SeqCst);
                }
            })
        };

        store.add_view_data(education("e1"));
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_record_view_access_does_not_notify() {
        let store = DataStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        let _subscription = {
            let calls = calls.clone();
            store.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        store.record_view_access(ViewName::Pharmacy);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store
            .get_analytics()
            .view_activity_summary
            .contains_key(&ViewName::Pharmacy));
    }

    #[test]
    fn test_idempotent_clear() {
        let store = DataStore::in_memory();
        store.update_core_data(vec![patient("p1", "Juan Pérez", "12345678")]);
        store.record_view_access(ViewName::IcuMonitoring);

        store.clear_all_data();
        let first = store.get_data();
        store.clear_all_data();
        let second = store.get_data();

        assert_eq!(first.core, second.core);
        assert_eq!(first.view_data, second.view_data);
        assert_eq!(first.metadata.views_last_accessed, second.metadata.views_last_accessed);
        assert_eq!(second.metadata.total_records, 0);
        assert!(second.metadata.views_last_accessed.is_empty());
    }

    #[test]
    fn test_search() {
        let store = DataStore::in_memory();
        store.update_core_data(vec![
            patient("p1", "Juan Pérez", "12345678"),
            patient("p2", "Ana Gómez", "87654321"),
        ]);
        store.update_core_data(vec![medication("m1", "p1", "Losartán", "Tomar en AYUNAS")]);

        let results = store.search("juan");
        assert_eq!(results.patients.len(), 1);
        assert_eq!(results.patients[0].id, "p1");

        let results = store.search("8765");
        assert_eq!(results.patients.len(), 1);
        assert_eq!(results.patients[0].id, "p2");

        let results = store.search("ayunas");
        assert!(results.patients.is_empty());
        assert_eq!(results.medications.len(), 1);

        assert!(store.search("   ").is_empty());
    }

    #[test]
    fn test_search_keeps_surrounding_whitespace() {
        let store = DataStore::in_memory();
        store.update_core_data(vec![patient("p1", "Juan Pérez", "12345678")]);

        assert_eq!(store.search("1234").patients.len(), 1);
        assert!(store.search(" 1234").is_empty());
        assert!(store.search("1234 ").is_empty());
        assert_eq!(store.search("juan pérez").patients.len(), 1);
        assert_eq!(store.search(" Pérez").patients.len(), 1);
    }

    #[test]
    fn test_import_invalid_json_leaves_document_unchanged() {
        let store = DataStore::in_memory();
        store.update_core_data(vec![patient("p1", "Juan Pérez", "12345678")]);
        let before = store.get_data();

        assert!(!store.import_data("not valid json"));
        assert!(!store.import_data(r#"{"core": {}}"#));
        assert_eq!(store.get_data(), before);
    }

    #[test]
    fn test_export_import_between_stores() {
        let source = DataStore::in_memory();
        source.update_core_data(vec![patient("p1", "Juan Pérez", "12345678")]);
        source.add_view_data(education("e1"));
        let exported = source.export_data().unwrap();

        let target = DataStore::in_memory();
        assert!(target.import_data(&exported));
        let data = target.get_data();
        assert_eq!(data.core, source.get_data().core);
        assert_eq!(data.metadata.total_records, 2);
        assert!(data.metadata.data_integrity);
    }

    #[test]
    fn test_hydrate_from_backend() {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        {
            let store = DataStore::new(backend.clone());
            store.update_core_data(vec![patient("p1", "Juan Pérez", "12345678")]);
        }

        let reopened = DataStore::new(backend);
        let data = reopened.get_data();
        assert_eq!(data.core.patients.len(), 1);
        assert_eq!(data.metadata.total_records, 1);
        assert!(data.metadata.data_integrity);
    }

    #[test]
    fn test_hydrate_from_corrupt_value() {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        backend.set_item(GLOBAL_DATA_KEY, "{\"core\": 42}").unwrap();

        let store = DataStore::new(backend);
        let data = store.get_data();
        assert_eq!(data.count_records(), 0);
        assert!(!data.metadata.data_integrity);
    }

    #[test]
    fn test_persist_failure_marks_integrity() {
        let store = DataStore::new(Arc::new(MemoryStorage::with_quota(64)));
        store.update_core_data(vec![patient("p1", "Juan Pérez", "12345678")]);

        let data = store.get_data();
        // 内存中的变更仍然生效
        assert_eq!(data.core.patients.len(), 1);
        assert!(!data.metadata.data_integrity);
        assert!(!store.get_analytics().data_integrity);
    }
}
