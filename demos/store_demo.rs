//! 数据存储演示程序
//!
//! 展示临床集合写入、视图绑定、订阅通知、全局搜索、统计与导入导出

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use vitalred::core::{
    Bed, BedStatus, Emergency, EmergencyStatus, IcuMonitoringRecord, IdentificationType,
    Patient, PatientStatus, Priority, ViewName,
};
use vitalred::store::DataStore;
use vitalred::views::{MedicalDataView, ViewBinding};

fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🏥 VITAL RED 数据存储演示\n");

    let store = Arc::new(DataStore::in_memory());

    // 1. 订阅变更
    let notifications = Arc::new(AtomicUsize::new(0));
    let subscription = {
        let notifications = notifications.clone();
        store.subscribe(move |document| {
            notifications.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("文档更新，共 {} 条记录", document.metadata.total_records);
        })
    };
    println!("✅ 已注册订阅者 {}", subscription.id());

    // 2. 写入核心集合
    store.update_core_data(sample_patients());
    store.update_core_data(vec![
        Bed {
            id: "bed-101".to_string(),
            ward: "UCI".to_string(),
            number: "101".to_string(),
            patient_id: Some("p-001".to_string()),
            status: BedStatus::Occupied,
        },
        Bed {
            id: "bed-102".to_string(),
            ward: "UCI".to_string(),
            number: "102".to_string(),
            patient_id: None,
            status: BedStatus::Available,
        },
    ]);
    store.update_core_data(vec![Emergency {
        id: "em-1".to_string(),
        code: "CODE BLUE".to_string(),
        location: "UCI 101".to_string(),
        patient_id: Some("p-001".to_string()),
        severity: Priority::Critical,
        status: EmergencyStatus::Active,
        reported_at: Utc::now(),
    }]);
    println!("✅ 写入患者、床位与急诊数据");

    // 3. 视图绑定
    let icu = ViewBinding::<IcuMonitoringRecord>::new(store.clone());
    icu.add_data(IcuMonitoringRecord {
        id: "icu-1".to_string(),
        patient_id: "p-001".to_string(),
        patient_name: "Juan Pérez".to_string(),
        bed_number: "101".to_string(),
        heart_rate: Some(112),
        oxygen_saturation: Some(91),
        blood_pressure: Some("90/60".to_string()),
        alert_level: Priority::High,
        updated_at: Utc::now(),
    });
    println!("✅ 视图 {} 当前 {} 条记录", icu.view(), icu.len());

    // 4. 关联查询
    let medical = MedicalDataView::new(store.clone(), ViewName::BedManagement);
    for occupancy in medical.bed_occupancy() {
        let patient = occupancy
            .patient
            .map(|p| p.full_name)
            .unwrap_or_else(|| "空闲".to_string());
        println!("   🛏  {} {} -> {}", occupancy.bed.ward, occupancy.bed.number, patient);
    }
    for active in medical.active_emergencies() {
        println!("   🚨 {} @ {} ({:?})", active.emergency.code, active.emergency.location, active.emergency.severity);
    }

    // 5. 全局搜索
    for query in ["juan", "8765"] {
        let results = store.search(query);
        let names: Vec<&str> = results.patients.iter().map(|p| p.full_name.as_str()).collect();
        println!("🔍 搜索 '{}': {:?}", query, names);
    }

    // 6. 统计
    let analytics = store.get_analytics();
    println!("\n📊 统计:");
    println!("   总记录数: {}", analytics.total_records);
    println!("   数据完整: {}", analytics.data_integrity);
    if let Some((view, at)) = analytics.most_recent_view() {
        println!("   最近访问视图: {} ({})", view, at.to_rfc3339());
    }
    println!("   收到通知: {}", notifications.load(Ordering::SeqCst));

    // 7. 导出与导入
    let exported = store.export_data()?;
    let copy = DataStore::in_memory();
    println!("\n📦 导出 {} 字节，导入结果: {}", exported.len(), copy.import_data(&exported));
    println!("   无效导入结果: {}", copy.import_data("{\"core\": {}}"));

    subscription.unsubscribe();
    drop(icu);
    println!("\n✅ 剩余订阅者: {}", store.subscriber_count());

    Ok(())
}

fn sample_patients() -> Vec<Patient> {
    let now = Utc::now();
    vec![
        Patient {
            id: "p-001".to_string(),
            identification_type: IdentificationType::CC,
            identification_number: "12345678".to_string(),
            full_name: "Juan Pérez".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1980, 3, 2),
            sex: None,
            phone: None,
            address: None,
            eps: "Nueva EPS".to_string(),
            priority: Priority::Critical,
            assigned_doctor: None,
            status: PatientStatus::Admitted,
            created_at: now,
            updated_at: now,
        },
        Patient {
            id: "p-002".to_string(),
            identification_type: IdentificationType::CC,
            identification_number: "87654321".to_string(),
            full_name: "Ana Gómez".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1992, 11, 20),
            sex: None,
            phone: None,
            address: None,
            eps: "Sura".to_string(),
            priority: Priority::Medium,
            assigned_doctor: Some("Dra. Restrepo".to_string()),
            status: PatientStatus::Pending,
            created_at: now,
            updated_at: now,
        },
    ]
}
