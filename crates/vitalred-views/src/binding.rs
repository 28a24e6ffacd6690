//! 单视图绑定

use std::sync::Arc;

use tracing::debug;
use vitalred_core::ViewName;
use vitalred_store::{DataStore, Subscription, ViewRecord};

use crate::snapshot::Snapshot;

/// 绑定到一个视图切片
///
/// 创建时记录一次视图访问并订阅存储，释放时自动取消订阅。
pub struct ViewBinding<T: ViewRecord> {
    store: Arc<DataStore>,
    snapshot: Arc<Snapshot<Vec<T>>>,
    _subscription: Subscription,
}

impl<T: ViewRecord> ViewBinding<T> {
    pub fn new(store: Arc<DataStore>) -> Self {
        store.record_view_access(T::VIEW);

        // 先订阅再读取，两者之间的变更不会丢失
        let snapshot = Arc::new(Snapshot::new(Vec::new()));
        let subscription = {
            let snapshot = snapshot.clone();
            store.subscribe(move |document| {
                let items = T::slice(&document.view_data).clone();
                if !snapshot.replace(document.metadata.revision, items) {
                    debug!("Dropped stale update for '{}'", T::VIEW);
                }
            })
        };
        let document = store.get_data();
        snapshot.replace(
            document.metadata.revision,
            T::slice(&document.view_data).clone(),
        );

        debug!("Mounted view binding for '{}'", T::VIEW);
        Self {
            store,
            snapshot,
            _subscription: subscription,
        }
    }

    pub fn view(&self) -> ViewName {
        T::VIEW
    }

    /// 当前快照
    pub fn data(&self) -> Vec<T> {
        self.snapshot.read().value.clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn update_data(&self, items: Vec<T>) {
        self.store.update_view_data(items);
    }

    pub fn add_data(&self, item: T) {
        self.store.add_view_data(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{mpsc, Mutex};
    use std::thread;
    use vitalred_core::{Priority, ReferralCaseRecord, ReferralStatus};

    fn referral(id: &str) -> ReferralCaseRecord {
        ReferralCaseRecord {
            id: id.to_string(),
            patient_id: "p1".to_string(),
            patient_name: "Juan Pérez".to_string(),
            eps: "Sanitas".to_string(),
            diagnosis: "Neumonía adquirida en la comunidad".to_string(),
            priority: Priority::High,
            status: ReferralStatus::Received,
            received_at: Utc::now(),
            assigned_evaluator: None,
        }
    }

    #[test]
    fn test_binding_records_access_and_tracks_updates() {
        let store = Arc::new(DataStore::in_memory());
        let binding = ViewBinding::<ReferralCaseRecord>::new(store.clone());

        assert!(binding.is_empty());
        assert!(store
            .get_analytics()
            .view_activity_summary
            .contains_key(&ViewName::ReferralCases));

        binding.add_data(referral("r1"));
        assert_eq!(binding.len(), 1);

        // 其他使用方的写入同样反映到快照
        store.add_view_data(referral("r2"));
        assert_eq!(binding.data().len(), 2);

        binding.update_data(vec![referral("r3")]);
        assert_eq!(binding.data()[0].id, "r3");
    }

    #[test]
    fn test_binding_ignores_out_of_order_notification() {
        let store = Arc::new(DataStore::in_memory());

        // 第一个订阅者在收到 "old" 时阻塞，使较早的写入最后送达
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        let _gate = store.subscribe(move |document| {
            let blocks = document
                .view_data
                .referral_cases
                .iter()
                .any(|r| r.id == "old");
            if blocks {
                entered_tx.lock().unwrap().send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
            }
        });
        let binding = ViewBinding::<ReferralCaseRecord>::new(store.clone());

        let writer = {
            let store = store.clone();
            thread::spawn(move || store.update_view_data(vec![referral("old")]))
        };
        entered_rx.recv().unwrap();

        store.update_view_data(vec![referral("new")]);
        release_tx.send(()).unwrap();
        writer.join().unwrap();

        let store_ids: Vec<String> = store
            .get_view_data::<ReferralCaseRecord>()
            .into_iter()
            .map(|r| r.id)
            .collect();
        let binding_ids: Vec<String> = binding.data().into_iter().map(|r| r.id).collect();
        assert_eq!(store_ids, vec!["new".to_string()]);
        assert_eq!(binding_ids, store_ids);
    }

    #[test]
    fn test_binding_unsubscribes_on_drop() {
        let store = Arc::new(DataStore::in_memory());
        let first = ViewBinding::<ReferralCaseRecord>::new(store.clone());
        let second = ViewBinding::<ReferralCaseRecord>::new(store.clone());
        assert_eq!(store.subscriber_count(), 2);

        drop(first);
        assert_eq!(store.subscriber_count(), 1);
        drop(second);
        assert_eq!(store.subscriber_count(), 0);
    }
}
