//! 视图切片模型
//!
//! 每个界面对应一个独立类型的切片，字段从核心实体冗余复制以便快速渲染。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VitalRedError;
use crate::models::{
    AdmissionStatus, BedStatus, EmergencyStatus, LabTestStatus, Priority, SessionStatus,
};

/// 视图名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewName {
    IcuMonitoring,
    Pharmacy,
    BedManagement,
    EmergencyRoom,
    SurgicalSchedule,
    Laboratory,
    Radiology,
    Telemedicine,
    Inventory,
    Admissions,
    MedicalReports,
    TeamCommunication,
    Education,
    ReferralCases,
    EvaluatorQueue,
}

impl ViewName {
    /// 全部视图，按文档中的顺序排列
    pub const ALL: [ViewName; 15] = [
        ViewName::IcuMonitoring,
        ViewName::Pharmacy,
        ViewName::BedManagement,
        ViewName::EmergencyRoom,
        ViewName::SurgicalSchedule,
        ViewName::Laboratory,
        ViewName::Radiology,
        ViewName::Telemedicine,
        ViewName::Inventory,
        ViewName::Admissions,
        ViewName::MedicalReports,
        ViewName::TeamCommunication,
        ViewName::Education,
        ViewName::ReferralCases,
        ViewName::EvaluatorQueue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewName::IcuMonitoring => "icuMonitoring",
            ViewName::Pharmacy => "pharmacy",
            ViewName::BedManagement => "bedManagement",
            ViewName::EmergencyRoom => "emergencyRoom",
            ViewName::SurgicalSchedule => "surgicalSchedule",
            ViewName::Laboratory => "laboratory",
            ViewName::Radiology => "radiology",
            ViewName::Telemedicine => "telemedicine",
            ViewName::Inventory => "inventory",
            ViewName::Admissions => "admissions",
            ViewName::MedicalReports => "medicalReports",
            ViewName::TeamCommunication => "teamCommunication",
            ViewName::Education => "education",
            ViewName::ReferralCases => "referralCases",
            ViewName::EvaluatorQueue => "evaluatorQueue",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewName {
    type Err = VitalRedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewName::ALL
            .iter()
            .copied()
            .find(|view| view.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| VitalRedError::NotFound(format!("Unknown view: {}", s)))
    }
}

/// ICU监护快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcuMonitoringRecord {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub bed_number: String,
    pub heart_rate: Option<u16>,
    pub oxygen_saturation: Option<u8>,
    pub blood_pressure: Option<String>, // "120/80"
    pub alert_level: Priority,
    pub updated_at: DateTime<Utc>,
}

/// 药房发药记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyRecord {
    pub id: String,
    pub patient_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub dispensed: bool,
    pub dispensed_at: Option<DateTime<Utc>>,
}

/// 床位管理记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedManagementRecord {
    pub id: String,
    pub bed_id: String,
    pub ward: String,
    pub patient_name: Option<String>,
    pub status: BedStatus,
    pub updated_at: DateTime<Utc>,
}

/// 急诊室记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRoomRecord {
    pub id: String,
    pub emergency_id: String,
    pub patient_name: Option<String>,
    pub triage_level: u8, // 1 (复苏) 到 5 (非紧急)
    pub arrived_at: DateTime<Utc>,
    pub status: EmergencyStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgicalScheduleRecord {
    pub id: String,
    pub surgery_id: String,
    pub patient_name: String,
    pub procedure: String,
    pub operating_room: String,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaboratoryRecord {
    pub id: String,
    pub lab_test_id: String,
    pub patient_name: String,
    pub test_type: String,
    pub status: LabTestStatus,
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiologyRecord {
    pub id: String,
    pub patient_id: String,
    pub study_type: String,
    pub requested_by: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemedicineRecord {
    pub id: String,
    pub session_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: String,
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    pub minimum_stock: u32,
    pub last_restocked: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRecord {
    pub id: String,
    pub request_id: String,
    pub patient_name: String,
    pub eps: String,
    pub status: AdmissionStatus,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReportRecord {
    pub id: String,
    pub report_id: String,
    pub patient_name: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// 团队沟通频道中的消息摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCommunicationRecord {
    pub id: String,
    pub channel: String,
    pub sender: String,
    pub preview: String,
    pub sent_at: DateTime<Utc>,
    pub unread: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationRecord {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub progress_percent: u8,
}

/// EPS转诊病例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCaseRecord {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub eps: String,
    pub diagnosis: String,
    pub priority: Priority,
    pub status: ReferralStatus,
    pub received_at: DateTime<Utc>,
    pub assigned_evaluator: Option<String>,
}

/// 转诊病例状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Received,
    InEvaluation,
    Accepted,
    Rejected,
}

/// 评估医生待办队列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorQueueRecord {
    pub id: String,
    pub evaluator: String,
    pub case_id: String,
    pub priority: Priority,
    pub assigned_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
}
