//! 全局搜索
//!
//! 只有下面五个集合定义了匹配字段，其他集合不参与搜索。

use serde::{Deserialize, Serialize};
use vitalred_core::utils::contains_ignore_case;
use vitalred_core::{Appointment, Emergency, LabTest, Medication, Patient};

use crate::document::Document;

/// 搜索结果，按集合分组
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub patients: Vec<Patient>,
    pub medications: Vec<Medication>,
    pub appointments: Vec<Appointment>,
    pub lab_tests: Vec<LabTest>,
    pub emergencies: Vec<Emergency>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.patients.len()
            + self.medications.len()
            + self.appointments.len()
            + self.lab_tests.len()
            + self.emergencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// 大小写不敏感的子串搜索，空白查询不返回任何结果
///
/// 查询中的空白原样参与匹配，不做裁剪。
pub fn search_document(document: &Document, query: &str) -> SearchResults {
    let needle = query.to_lowercase();
    if needle.trim().is_empty() {
        return SearchResults::default();
    }

    let matches = |field: &str| contains_ignore_case(field, &needle);
    let core = &document.core;

    SearchResults {
        patients: core
            .patients
            .iter()
            .filter(|p| matches(&p.full_name) || matches(&p.identification_number))
            .cloned()
            .collect(),
        medications: core
            .medications
            .iter()
            .filter(|m| matches(&m.name) || matches(&m.instructions))
            .cloned()
            .collect(),
        appointments: core
            .appointments
            .iter()
            .filter(|a| matches(&a.doctor_name) || matches(&a.reason))
            .cloned()
            .collect(),
        lab_tests: core
            .lab_tests
            .iter()
            .filter(|t| matches(&t.test_type) || matches(&t.ordered_by))
            .cloned()
            .collect(),
        emergencies: core
            .emergencies
            .iter()
            .filter(|e| matches(&e.code) || matches(&e.location))
            .cloned()
            .collect(),
    }
}
