//! 类型化集合访问
//!
//! 每种核心记录和视图记录都知道自己在文档中的位置，
//! 存储的泛型读写接口据此定位集合。

use serde::de::DeserializeOwned;
use serde::Serialize;
use vitalred_core::*;

use crate::document::{CoreCollection, CoreCollections, ViewData};

/// 核心集合中的记录类型
pub trait CoreRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: CoreCollection;

    fn collection(core: &CoreCollections) -> &Vec<Self>;

    fn collection_mut(core: &mut CoreCollections) -> &mut Vec<Self>;
}

/// 视图切片中的记录类型
pub trait ViewRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const VIEW: ViewName;

    fn slice(view_data: &ViewData) -> &Vec<Self>;

    fn slice_mut(view_data: &mut ViewData) -> &mut Vec<Self>;
}

macro_rules! core_record {
    ($($ty:ty => $variant:ident, $field:ident;)*) => {
        $(
            impl CoreRecord for $ty {
                const COLLECTION: CoreCollection = CoreCollection::$variant;

                fn collection(core: &CoreCollections) -> &Vec<Self> {
                    &core.$field
                }

                fn collection_mut(core: &mut CoreCollections) -> &mut Vec<Self> {
                    &mut core.$field
                }
            }
        )*
    };
}

macro_rules! view_record {
    ($($ty:ty => $variant:ident, $field:ident;)*) => {
        $(
            impl ViewRecord for $ty {
                const VIEW: ViewName = ViewName::$variant;

                fn slice(view_data: &ViewData) -> &Vec<Self> {
                    &view_data.$field
                }

                fn slice_mut(view_data: &mut ViewData) -> &mut Vec<Self> {
                    &mut view_data.$field
                }
            }
        )*
    };
}

core_record! {
    Patient => Patients, patients;
    VitalSigns => VitalSigns, vital_signs;
    Medication => Medications, medications;
    Appointment => Appointments, appointments;
    Surgery => Surgeries, surgeries;
    LabTest => LabTests, lab_tests;
    Emergency => Emergencies, emergencies;
    Bed => Beds, beds;
    MedicalReport => MedicalReports, medical_reports;
    TeamMessage => TeamMessages, team_messages;
    TelemedicineSession => TelemedicineSessions, telemedicine_sessions;
    InventoryItem => Inventory, inventory;
    AdmissionRequest => AdmissionRequests, admission_requests;
    EducationModule => EducationModules, education_modules;
}

view_record! {
    IcuMonitoringRecord => IcuMonitoring, icu_monitoring;
    PharmacyRecord => Pharmacy, pharmacy;
    BedManagementRecord => BedManagement, bed_management;
    EmergencyRoomRecord => EmergencyRoom, emergency_room;
    SurgicalScheduleRecord => SurgicalSchedule, surgical_schedule;
    LaboratoryRecord => Laboratory, laboratory;
    RadiologyRecord => Radiology, radiology;
    TelemedicineRecord => Telemedicine, telemedicine;
    InventoryRecord => Inventory, inventory;
    AdmissionRecord => Admissions, admissions;
    MedicalReportRecord => MedicalReports, medical_reports;
    TeamCommunicationRecord => TeamCommunication, team_communication;
    EducationRecord => Education, education;
    ReferralCaseRecord => ReferralCases, referral_cases;
    EvaluatorQueueRecord => EvaluatorQueue, evaluator_queue;
}
