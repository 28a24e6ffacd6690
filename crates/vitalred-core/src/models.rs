//! 核心临床数据模型定义
//!
//! 所有模型序列化为驼峰命名的 JSON，记录之间通过不透明的字符串ID关联。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 患者基本信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub identification_type: IdentificationType,
    pub identification_number: String, // 证件号码
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub eps: String, // 所属保险机构
    pub priority: Priority,
    pub assigned_doctor: Option<String>,
    pub status: PatientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 证件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentificationType {
    /// 公民身份证
    CC,
    /// 未成年人身份证
    TI,
    /// 外国人身份证
    CE,
    /// 护照
    PA,
    /// 出生登记
    RC,
}

/// 性别枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// 优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// 患者当前状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Pending,         // 待评估
    UnderEvaluation, // 评估中
    Accepted,        // 已接收
    Rejected,        // 已拒绝
    Admitted,        // 已入院
    Discharged,      // 已出院
}

/// 生命体征
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    pub id: String,
    pub patient_id: String,
    pub recorded_at: DateTime<Utc>,
    pub heart_rate: Option<u16>,
    pub systolic_pressure: Option<u16>,
    pub diastolic_pressure: Option<u16>,
    pub respiratory_rate: Option<u16>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<u8>,
}

/// 处方用药
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub patient_id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: String,
    pub prescribed_by: String,
    pub active: bool,
    pub start_date: NaiveDate,
}

/// 预约
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub reason: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

/// 手术
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surgery {
    pub id: String,
    pub patient_id: String,
    pub procedure: String,
    pub surgeon: String,
    pub operating_room: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: SurgeryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeryStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// 实验室检查
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTest {
    pub id: String,
    pub patient_id: String,
    pub test_type: String,
    pub ordered_by: String,
    pub ordered_at: DateTime<Utc>,
    pub status: LabTestStatus,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabTestStatus {
    Ordered,
    InProgress,
    Completed,
    Cancelled,
}

/// 急诊事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emergency {
    pub id: String,
    pub code: String, // 急诊代码，例如 "CODE BLUE"
    pub location: String,
    pub patient_id: Option<String>,
    pub severity: Priority,
    pub status: EmergencyStatus,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyStatus {
    Active,
    Responding,
    Resolved,
}

/// 床位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bed {
    pub id: String,
    pub ward: String,
    pub number: String,
    pub patient_id: Option<String>,
    pub status: BedStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Cleaning,
    Maintenance,
}

/// 医疗报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    pub id: String,
    pub patient_id: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 团队消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMessage {
    pub id: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

/// 远程会诊
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemedicineSession {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub meeting_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

/// 库存物品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub minimum_stock: u32,
    pub unit: String,
}

impl InventoryItem {
    /// 库存是否低于最低水位
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.minimum_stock
    }
}

/// 入院申请（由EPS发起的转诊）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub id: String,
    pub patient_id: String,
    pub eps: String,
    pub diagnosis: String,
    pub requested_at: DateTime<Utc>,
    pub status: AdmissionStatus,
    pub evaluator: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Pending,
    Approved,
    Rejected,
}

/// 培训模块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationModule {
    pub id: String,
    pub title: String,
    pub category: String,
    pub duration_minutes: u32,
    pub completed_by: Vec<String>,
}
