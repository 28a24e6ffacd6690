//! 文档上的关联查询
//!
//! 纯函数，不做缓存。引用不存在的患者时返回空结果而不是报错。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitalred_core::*;
use vitalred_store::{CoreCollection, Document};

/// 患者及其全部关联记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub patient: Patient,
    /// 按记录时间倒序
    pub vital_signs: Vec<VitalSigns>,
    pub medications: Vec<Medication>,
    pub appointments: Vec<Appointment>,
    pub lab_tests: Vec<LabTest>,
    pub telemedicine_sessions: Vec<TelemedicineSession>,
}

impl PatientDetails {
    pub fn latest_vitals(&self) -> Option<&VitalSigns> {
        self.vital_signs.first()
    }

    pub fn active_medications(&self) -> impl Iterator<Item = &Medication> {
        self.medications.iter().filter(|m| m.active)
    }
}

/// 床位及占用患者
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedOccupancy {
    pub bed: Bed,
    pub patient: Option<Patient>,
}

/// 未解除的急诊事件及患者信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEmergency {
    pub emergency: Emergency,
    pub patient: Option<Patient>,
}

/// 按优先级统计患者数量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityBreakdown {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// 全部集合的汇总计数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStats {
    pub collection_counts: BTreeMap<CoreCollection, usize>,
    pub view_counts: BTreeMap<ViewName, usize>,
    pub total_records: usize,
    pub active_emergencies: usize,
    pub occupied_beds: usize,
    pub available_beds: usize,
    pub low_stock_items: usize,
    pub pending_admissions: usize,
    pub active_medications: usize,
}

pub fn find_patient<'a>(document: &'a Document, patient_id: &str) -> Option<&'a Patient> {
    document.core.patients.iter().find(|p| p.id == patient_id)
}

pub fn patient_details(document: &Document, patient_id: &str) -> Option<PatientDetails> {
    let patient = find_patient(document, patient_id)?.clone();
    let core = &document.core;

    let mut vital_signs: Vec<VitalSigns> = core
        .vital_signs
        .iter()
        .filter(|v| v.patient_id == patient_id)
        .cloned()
        .collect();
    vital_signs.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

    Some(PatientDetails {
        patient,
        vital_signs,
        medications: core
            .medications
            .iter()
            .filter(|m| m.patient_id == patient_id)
            .cloned()
            .collect(),
        appointments: core
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect(),
        lab_tests: core
            .lab_tests
            .iter()
            .filter(|t| t.patient_id == patient_id)
            .cloned()
            .collect(),
        telemedicine_sessions: core
            .telemedicine_sessions
            .iter()
            .filter(|s| s.patient_id == patient_id)
            .cloned()
            .collect(),
    })
}

fn occupancy_of(document: &Document, bed: &Bed) -> BedOccupancy {
    let patient = bed
        .patient_id
        .as_deref()
        .and_then(|id| find_patient(document, id))
        .cloned();

    BedOccupancy {
        bed: bed.clone(),
        patient,
    }
}

pub fn bed_with_patient(document: &Document, bed_id: &str) -> Option<BedOccupancy> {
    document
        .core
        .beds
        .iter()
        .find(|b| b.id == bed_id)
        .map(|bed| occupancy_of(document, bed))
}

pub fn bed_occupancy(document: &Document) -> Vec<BedOccupancy> {
    document
        .core
        .beds
        .iter()
        .map(|bed| occupancy_of(document, bed))
        .collect()
}

/// 未解除的急诊，严重程度从高到低，同级按上报时间先后
pub fn active_emergencies(document: &Document) -> Vec<ActiveEmergency> {
    let mut active: Vec<ActiveEmergency> = document
        .core
        .emergencies
        .iter()
        .filter(|e| e.status != EmergencyStatus::Resolved)
        .map(|emergency| ActiveEmergency {
            patient: emergency
                .patient_id
                .as_deref()
                .and_then(|id| find_patient(document, id))
                .cloned(),
            emergency: emergency.clone(),
        })
        .collect();

    active.sort_by(|a, b| {
        b.emergency
            .severity
            .cmp(&a.emergency.severity)
            .then(a.emergency.reported_at.cmp(&b.emergency.reported_at))
    });
    active
}

pub fn low_stock_items(document: &Document) -> Vec<InventoryItem> {
    document
        .core
        .inventory
        .iter()
        .filter(|item| item.is_low_stock())
        .cloned()
        .collect()
}

pub fn patients_by_priority(document: &Document) -> PriorityBreakdown {
    let mut breakdown = PriorityBreakdown::default();
    for patient in &document.core.patients {
        match patient.priority {
            Priority::Critical => breakdown.critical += 1,
            Priority::High => breakdown.high += 1,
            Priority::Medium => breakdown.medium += 1,
            Priority::Low => breakdown.low += 1,
        }
    }
    breakdown
}

/// 医生在 `from` 之后的有效预约，按时间排序
pub fn upcoming_appointments(
    document: &Document,
    doctor_id: &str,
    from: DateTime<Utc>,
) -> Vec<Appointment> {
    let mut appointments: Vec<Appointment> = document
        .core
        .appointments
        .iter()
        .filter(|a| a.doctor_id == doctor_id && a.scheduled_at >= from)
        .filter(|a| {
            matches!(
                a.status,
                AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
            )
        })
        .cloned()
        .collect();
    appointments.sort_by_key(|a| a.scheduled_at);
    appointments
}

pub fn data_stats(document: &Document) -> DataStats {
    let core = &document.core;

    DataStats {
        collection_counts: CoreCollection::ALL
            .iter()
            .map(|c| (*c, core.len_of(*c)))
            .collect(),
        view_counts: ViewName::ALL
            .iter()
            .map(|v| (*v, document.view_data.len_of(*v)))
            .collect(),
        total_records: document.count_records(),
        active_emergencies: core
            .emergencies
            .iter()
            .filter(|e| e.status != EmergencyStatus::Resolved)
            .count(),
        occupied_beds: core
            .beds
            .iter()
            .filter(|b| b.status == BedStatus::Occupied)
            .count(),
        available_beds: core
            .beds
            .iter()
            .filter(|b| b.status == BedStatus::Available)
            .count(),
        low_stock_items: core.inventory.iter().filter(|i| i.is_low_stock()).count(),
        pending_admissions: core
            .admission_requests
            .iter()
            .filter(|r| r.status == AdmissionStatus::Pending)
            .count(),
        active_medications: core.medications.iter().filter(|m| m.active).count(),
    }
}
