//! 临床数据视图
//!
//! 持有整份文档的快照，所有关联查询在每次读取时基于最新快照重新计算。

use std::sync::{Arc, RwLockReadGuard};

use chrono::{DateTime, Utc};
use tracing::debug;
use vitalred_core::{Appointment, InventoryItem, ViewName};
use vitalred_store::{CoreRecord, DataStore, Document, Subscription, ViewRecord};

use crate::queries::{self, ActiveEmergency, BedOccupancy, DataStats, PatientDetails, PriorityBreakdown};
use crate::snapshot::{Snapshot, Versioned};

pub struct MedicalDataView {
    store: Arc<DataStore>,
    snapshot: Arc<Snapshot<Document>>,
    _subscription: Subscription,
}

impl MedicalDataView {
    /// 挂载视图；`view` 用于记录访问时间
    pub fn new(store: Arc<DataStore>, view: ViewName) -> Self {
        store.record_view_access(view);

        let snapshot = Arc::new(Snapshot::new(Document::empty()));
        let subscription = {
            let snapshot = snapshot.clone();
            store.subscribe(move |document| {
                if !snapshot.replace(document.metadata.revision, document.clone()) {
                    debug!("Dropped stale document revision {}", document.metadata.revision);
                }
            })
        };
        let document = store.get_data();
        snapshot.replace(document.metadata.revision, document);

        debug!("Mounted medical data view for '{}'", view);
        Self {
            store,
            snapshot,
            _subscription: subscription,
        }
    }

    fn current(&self) -> RwLockReadGuard<'_, Versioned<Document>> {
        self.snapshot.read()
    }

    pub fn data(&self) -> Document {
        self.current().value.clone()
    }

    pub fn update_core<T: CoreRecord>(&self, items: Vec<T>) {
        self.store.update_core_data(items);
    }

    pub fn update_view<T: ViewRecord>(&self, items: Vec<T>) {
        self.store.update_view_data(items);
    }

    pub fn add_view<T: ViewRecord>(&self, item: T) {
        self.store.add_view_data(item);
    }

    pub fn patient_details(&self, patient_id: &str) -> Option<PatientDetails> {
        queries::patient_details(&self.current().value, patient_id)
    }

    pub fn bed_with_patient(&self, bed_id: &str) -> Option<BedOccupancy> {
        queries::bed_with_patient(&self.current().value, bed_id)
    }

    pub fn bed_occupancy(&self) -> Vec<BedOccupancy> {
        queries::bed_occupancy(&self.current().value)
    }

    pub fn active_emergencies(&self) -> Vec<ActiveEmergency> {
        queries::active_emergencies(&self.current().value)
    }

    pub fn low_stock_items(&self) -> Vec<InventoryItem> {
        queries::low_stock_items(&self.current().value)
    }

    pub fn patients_by_priority(&self) -> PriorityBreakdown {
        queries::patients_by_priority(&self.current().value)
    }

    pub fn upcoming_appointments(&self, doctor_id: &str, from: DateTime<Utc>) -> Vec<Appointment> {
        queries::upcoming_appointments(&self.current().value, doctor_id, from)
    }

    pub fn stats(&self) -> DataStats {
        queries::data_stats(&self.current().value)
    }
}
