//! 表单提交
//!
//! 提交载荷只携带附件引用；原始文件内容不会进入存储。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use vitalred_core::utils::generate_id;
use vitalred_core::{Result, VitalRedError};
use vitalred_store::{PersistenceAdapter, StorageBackend, REFERRAL_FORM_KEY};

use crate::attachments::AttachmentRef;
use crate::form::{FormStep, PatientSection, ReferralForm, ReferralSection, VitalsSection};
use crate::validation::validate_form;

/// 已完成的转诊表单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSubmission {
    pub id: String,
    pub patient: PatientSection,
    pub referral: ReferralSection,
    pub vitals: VitalsSection,
    pub attachments: Vec<AttachmentRef>,
    pub notes: String,
    pub completed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// 已提交表单的存储
#[derive(Debug, Clone)]
pub struct FormRepository {
    adapter: PersistenceAdapter,
}

impl FormRepository {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_key(backend, REFERRAL_FORM_KEY)
    }

    /// 使用自定义存储键
    pub fn with_key(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            adapter: PersistenceAdapter::new(backend, key),
        }
    }

    pub fn key(&self) -> &str {
        self.adapter.key()
    }

    pub fn save(&self, submission: &ReferralSubmission) -> Result<()> {
        self.adapter.save(submission)
    }

    /// 最近一次提交
    pub fn load(&self) -> Option<ReferralSubmission> {
        self.adapter.load()
    }

    pub fn clear(&self) -> Result<()> {
        self.adapter.clear()
    }
}

impl ReferralForm {
    /// 在最后一步提交表单
    ///
    /// 全部步骤验证通过后组装载荷并写入存储，表单随即标记为完成。
    pub fn submit(&mut self, repository: &FormRepository) -> Result<ReferralSubmission> {
        if self.completed {
            return Err(VitalRedError::validation("Referral form already submitted"));
        }
        if self.current_step != FormStep::Documents {
            return Err(VitalRedError::validation(format!(
                "Referral form can only be submitted from the final step, current step is {:?}",
                self.current_step
            )));
        }

        let errors = validate_form(self);
        if !errors.is_empty() {
            let summary: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(VitalRedError::validation(summary.join("; ")));
        }

        let submitted_at = Utc::now();
        let submission = ReferralSubmission {
            id: generate_id("ref"),
            patient: self.patient.clone(),
            referral: self.referral.clone(),
            vitals: self.vitals.clone(),
            attachments: self.documents.attachments.iter().map(|a| a.to_ref()).collect(),
            notes: self.documents.notes.clone(),
            completed: true,
            submitted_at,
        };

        repository.save(&submission)?;

        self.completed = true;
        self.submitted_at = Some(submitted_at);
        info!(
            "Submitted referral {} for {} ({} attachments)",
            submission.id,
            submission.patient.full_name(),
            submission.attachments.len()
        );
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::Attachment;
    use crate::form::{FormAction, PatientUpdate, ReferralUpdate, VitalsUpdate};
    use chrono::NaiveDate;
    use vitalred_core::{IdentificationType, Priority};
    use vitalred_store::{MemoryStorage, GLOBAL_DATA_KEY};

    fn filled_form() -> ReferralForm {
        let mut form = ReferralForm::new();
        form.dispatch(FormAction::UpdatePatient(PatientUpdate {
            identification_type: Some(Some(IdentificationType::CC)),
            identification_number: Some("12345678".to_string()),
            first_name: Some("Juan".to_string()),
            last_name: Some("Pérez".to_string()),
            birth_date: Some(NaiveDate::from_ymd_opt(1980, 3, 2)),
            eps: Some("Nueva EPS".to_string()),
            ..Default::default()
        }))
        .unwrap();
        form.dispatch(FormAction::NextStep).unwrap();

        form.dispatch(FormAction::UpdateReferral(ReferralUpdate {
            referring_institution: Some("Hospital de Cartago".to_string()),
            specialty: Some("Cardiología".to_string()),
            diagnosis: Some("Infarto agudo de miocardio".to_string()),
            reason: Some("Requiere cateterismo".to_string()),
            priority: Some(Some(Priority::Critical)),
            ..Default::default()
        }))
        .unwrap();
        form.dispatch(FormAction::NextStep).unwrap();

        form.dispatch(FormAction::UpdateVitals(VitalsUpdate {
            heart_rate: Some(Some(104)),
            weight_kg: Some(Some(70.0)),
            height_cm: Some(Some(175.0)),
            ..Default::default()
        }))
        .unwrap();
        form.dispatch(FormAction::NextStep).unwrap();
        form
    }

    #[test]
    fn test_submit_persists_references_only() {
        let backend = Arc::new(MemoryStorage::new());
        let repository = FormRepository::new(backend.clone());
        let mut form = filled_form();
        assert_eq!(form.current_step, FormStep::Documents);

        // 没有附件时无法提交
        assert!(form.submit(&repository).is_err());

        form.dispatch(FormAction::AddAttachment(
            Attachment::new("ecg.pdf", "application/pdf", vec![7; 2048]).unwrap(),
        ))
        .unwrap();
        let submission = form.submit(&repository).unwrap();

        assert!(form.completed);
        assert!(submission.completed);
        assert_eq!(submission.attachments[0].size, 2048);
        assert_eq!(repository.load().unwrap(), submission);

        // 与全局数据文档使用不同的键
        assert!(backend.get_item(GLOBAL_DATA_KEY).unwrap().is_none());
        let raw = backend.get_item(REFERRAL_FORM_KEY).unwrap().unwrap();
        assert!(!raw.contains("content"));

        assert!(form.submit(&repository).is_err());
        assert!(form.dispatch(FormAction::SetNotes("tarde".to_string())).is_err());
        form.dispatch(FormAction::Reset).unwrap();
        assert!(!form.completed);
    }

    #[test]
    fn test_repository_with_custom_key() {
        let backend = Arc::new(MemoryStorage::new());
        let repository = FormRepository::with_key(backend.clone(), "hospital-b-referral-form");
        assert_eq!(repository.key(), "hospital-b-referral-form");

        let mut form = filled_form();
        form.dispatch(FormAction::AddAttachment(
            Attachment::new("rx.png", "image/png", vec![1; 64]).unwrap(),
        ))
        .unwrap();
        let submission = form.submit(&repository).unwrap();

        assert!(backend.get_item(REFERRAL_FORM_KEY).unwrap().is_none());
        assert!(backend.get_item("hospital-b-referral-form").unwrap().is_some());
        assert_eq!(FormRepository::new(backend).load(), None);
        assert_eq!(repository.load().unwrap(), submission);
    }

    #[test]
    fn test_submit_requires_final_step() {
        let repository = FormRepository::new(Arc::new(MemoryStorage::new()));
        let mut form = ReferralForm::new();
        assert!(form.submit(&repository).is_err());
        assert!(repository.load().is_none());
    }
}
