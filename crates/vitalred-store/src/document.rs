//! 数据文档定义
//!
//! 文档是存储持有的唯一根对象：核心集合、视图切片和元数据。

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitalred_core::*;

/// 文档结构版本，仅作记录，不做兼容性检查
pub const SCHEMA_VERSION: &str = "1.0.0";

/// 核心集合名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoreCollection {
    Patients,
    VitalSigns,
    Medications,
    Appointments,
    Surgeries,
    LabTests,
    Emergencies,
    Beds,
    MedicalReports,
    TeamMessages,
    TelemedicineSessions,
    Inventory,
    AdmissionRequests,
    EducationModules,
}

impl CoreCollection {
    pub const ALL: [CoreCollection; 14] = [
        CoreCollection::Patients,
        CoreCollection::VitalSigns,
        CoreCollection::Medications,
        CoreCollection::Appointments,
        CoreCollection::Surgeries,
        CoreCollection::LabTests,
        CoreCollection::Emergencies,
        CoreCollection::Beds,
        CoreCollection::MedicalReports,
        CoreCollection::TeamMessages,
        CoreCollection::TelemedicineSessions,
        CoreCollection::Inventory,
        CoreCollection::AdmissionRequests,
        CoreCollection::EducationModules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoreCollection::Patients => "patients",
            CoreCollection::VitalSigns => "vitalSigns",
            CoreCollection::Medications => "medications",
            CoreCollection::Appointments => "appointments",
            CoreCollection::Surgeries => "surgeries",
            CoreCollection::LabTests => "labTests",
            CoreCollection::Emergencies => "emergencies",
            CoreCollection::Beds => "beds",
            CoreCollection::MedicalReports => "medicalReports",
            CoreCollection::TeamMessages => "teamMessages",
            CoreCollection::TelemedicineSessions => "telemedicineSessions",
            CoreCollection::Inventory => "inventory",
            CoreCollection::AdmissionRequests => "admissionRequests",
            CoreCollection::EducationModules => "educationModules",
        }
    }
}

impl fmt::Display for CoreCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 核心临床集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreCollections {
    pub patients: Vec<Patient>,
    pub vital_signs: Vec<VitalSigns>,
    pub medications: Vec<Medication>,
    pub appointments: Vec<Appointment>,
    pub surgeries: Vec<Surgery>,
    pub lab_tests: Vec<LabTest>,
    pub emergencies: Vec<Emergency>,
    pub beds: Vec<Bed>,
    pub medical_reports: Vec<MedicalReport>,
    pub team_messages: Vec<TeamMessage>,
    pub telemedicine_sessions: Vec<TelemedicineSession>,
    pub inventory: Vec<InventoryItem>,
    pub admission_requests: Vec<AdmissionRequest>,
    pub education_modules: Vec<EducationModule>,
}

impl CoreCollections {
    /// 指定集合的记录数
    pub fn len_of(&self, collection: CoreCollection) -> usize {
        match collection {
            CoreCollection::Patients => self.patients.len(),
            CoreCollection::VitalSigns => self.vital_signs.len(),
            CoreCollection::Medications => self.medications.len(),
            CoreCollection::Appointments => self.appointments.len(),
            CoreCollection::Surgeries => self.surgeries.len(),
            CoreCollection::LabTests => self.lab_tests.len(),
            CoreCollection::Emergencies => self.emergencies.len(),
            CoreCollection::Beds => self.beds.len(),
            CoreCollection::MedicalReports => self.medical_reports.len(),
            CoreCollection::TeamMessages => self.team_messages.len(),
            CoreCollection::TelemedicineSessions => self.telemedicine_sessions.len(),
            CoreCollection::Inventory => self.inventory.len(),
            CoreCollection::AdmissionRequests => self.admission_requests.len(),
            CoreCollection::EducationModules => self.education_modules.len(),
        }
    }

    pub fn record_count(&self) -> usize {
        CoreCollection::ALL.iter().map(|c| self.len_of(*c)).sum()
    }
}

/// 十五个视图切片
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewData {
    pub icu_monitoring: Vec<IcuMonitoringRecord>,
    pub pharmacy: Vec<PharmacyRecord>,
    pub bed_management: Vec<BedManagementRecord>,
    pub emergency_room: Vec<EmergencyRoomRecord>,
    pub surgical_schedule: Vec<SurgicalScheduleRecord>,
    pub laboratory: Vec<LaboratoryRecord>,
    pub radiology: Vec<RadiologyRecord>,
    pub telemedicine: Vec<TelemedicineRecord>,
    pub inventory: Vec<InventoryRecord>,
    pub admissions: Vec<AdmissionRecord>,
    pub medical_reports: Vec<MedicalReportRecord>,
    pub team_communication: Vec<TeamCommunicationRecord>,
    pub education: Vec<EducationRecord>,
    pub referral_cases: Vec<ReferralCaseRecord>,
    pub evaluator_queue: Vec<EvaluatorQueueRecord>,
}

impl ViewData {
    pub fn len_of(&self, view: ViewName) -> usize {
        match view {
            ViewName::IcuMonitoring => self.icu_monitoring.len(),
            ViewName::Pharmacy => self.pharmacy.len(),
            ViewName::BedManagement => self.bed_management.len(),
            ViewName::EmergencyRoom => self.emergency_room.len(),
            ViewName::SurgicalSchedule => self.surgical_schedule.len(),
            ViewName::Laboratory => self.laboratory.len(),
            ViewName::Radiology => self.radiology.len(),
            ViewName::Telemedicine => self.telemedicine.len(),
            ViewName::Inventory => self.inventory.len(),
            ViewName::Admissions => self.admissions.len(),
            ViewName::MedicalReports => self.medical_reports.len(),
            ViewName::TeamCommunication => self.team_communication.len(),
            ViewName::Education => self.education.len(),
            ViewName::ReferralCases => self.referral_cases.len(),
            ViewName::EvaluatorQueue => self.evaluator_queue.len(),
        }
    }

    pub fn record_count(&self) -> usize {
        ViewName::ALL.iter().map(|v| self.len_of(*v)).sum()
    }
}

/// 文档元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub last_updated: DateTime<Utc>,
    pub version: String,
    pub data_integrity: bool,
    pub total_records: usize,
    pub views_last_accessed: BTreeMap<ViewName, DateTime<Utc>>,
    /// 每次变更递增，订阅者据此丢弃乱序到达的旧通知
    #[serde(default)]
    pub revision: u64,
}

/// 存储根文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub core: CoreCollections,
    pub view_data: ViewData,
    pub metadata: Metadata,
}

impl Document {
    /// 空文档：所有集合为空，完整性为真
    pub fn empty() -> Self {
        Self {
            core: CoreCollections::default(),
            view_data: ViewData::default(),
            metadata: Metadata {
                last_updated: Utc::now(),
                version: SCHEMA_VERSION.to_string(),
                data_integrity: true,
                total_records: 0,
                views_last_accessed: BTreeMap::new(),
                revision: 0,
            },
        }
    }

    /// 记录总数：核心集合与视图切片长度之和
    ///
    /// 变更后的元数据和统计接口都使用这一计算。
    pub fn count_records(&self) -> usize {
        self.core.record_count() + self.view_data.record_count()
    }

    /// 刷新最后更新时间与记录总数
    pub fn refresh_metadata(&mut self, now: DateTime<Utc>) {
        self.metadata.last_updated = now;
        self.metadata.total_records = self.count_records();
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let document = Document::empty();
        assert_eq!(document.count_records(), 0);
        assert_eq!(document.metadata.total_records, 0);
        assert!(document.metadata.data_integrity);
        assert_eq!(document.metadata.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_partial_document_rejected() {
        // 缺少 viewData 的文档必须解码失败，而不是静默清空切片
        let json = serde_json::json!({
            "core": serde_json::to_value(CoreCollections::default()).unwrap(),
            "metadata": serde_json::to_value(Document::empty().metadata).unwrap(),
        });
        assert!(serde_json::from_value::<Document>(json).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(Document::empty()).unwrap();
        assert!(value["core"]["vitalSigns"].is_array());
        assert!(value["viewData"]["icuMonitoring"].is_array());
        assert_eq!(value["metadata"]["totalRecords"], 0);
        assert_eq!(value["metadata"]["dataIntegrity"], true);
        assert_eq!(value["metadata"]["revision"], 0);
    }

    #[test]
    fn test_revision_defaults_when_absent() {
        let mut value = serde_json::to_value(Document::empty()).unwrap();
        value["metadata"].as_object_mut().unwrap().remove("revision");
        let document: Document = serde_json::from_value(value).unwrap();
        assert_eq!(document.metadata.revision, 0);
    }
}
