//! 转诊表单状态
//!
//! 每个动作把局部数据合并进对应步骤，派生字段（年龄、BMI）在合并时重新计算。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vitalred_core::utils::{calculate_age, calculate_bmi, round2, BmiCategory};
use vitalred_core::{IdentificationType, Priority, Result, Sex, VitalRedError};

use crate::attachments::Attachment;
use crate::validation::validate_step;

/// 表单步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    #[default]
    Patient,
    Referral,
    Vitals,
    Documents,
}

impl FormStep {
    pub const ALL: [FormStep; 4] = [
        FormStep::Patient,
        FormStep::Referral,
        FormStep::Vitals,
        FormStep::Documents,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<FormStep> {
        FormStep::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<FormStep> {
        self.index().checked_sub(1).map(|i| FormStep::ALL[i])
    }

    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }
}

/// 患者信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSection {
    pub identification_type: Option<IdentificationType>,
    pub identification_number: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    /// 由出生日期派生
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub phone: String,
    pub address: String,
    pub eps: String,
}

impl PatientSection {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// 转诊信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSection {
    pub referring_institution: String,
    pub referring_doctor: String,
    pub specialty: String,
    pub diagnosis: String,
    pub cie10_code: String,
    pub reason: String,
    pub priority: Option<Priority>,
    pub clinical_summary: String,
}

/// 生命体征
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSection {
    pub heart_rate: Option<u16>,
    pub respiratory_rate: Option<u16>,
    pub systolic_pressure: Option<u16>,
    pub diastolic_pressure: Option<u16>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<u8>,
    pub glasgow_score: Option<u8>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    /// 由体重和身高派生，保留两位小数
    pub bmi: Option<f64>,
}

impl VitalsSection {
    pub fn bmi_category(&self) -> Option<BmiCategory> {
        self.bmi.map(BmiCategory::from_bmi)
    }
}

/// 文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsSection {
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
    pub notes: String,
}

/// 患者信息的局部更新
///
/// 字段为 `None` 表示不变；可选字段用 `Some(None)` 清空。
#[derive(Debug, Clone, Default)]
pub struct PatientUpdate {
    pub identification_type: Option<Option<IdentificationType>>,
    pub identification_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub sex: Option<Option<Sex>>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub eps: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReferralUpdate {
    pub referring_institution: Option<String>,
    pub referring_doctor: Option<String>,
    pub specialty: Option<String>,
    pub diagnosis: Option<String>,
    pub cie10_code: Option<String>,
    pub reason: Option<String>,
    pub priority: Option<Option<Priority>>,
    pub clinical_summary: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VitalsUpdate {
    pub heart_rate: Option<Option<u16>>,
    pub respiratory_rate: Option<Option<u16>>,
    pub systolic_pressure: Option<Option<u16>>,
    pub diastolic_pressure: Option<Option<u16>>,
    pub temperature: Option<Option<f64>>,
    pub oxygen_saturation: Option<Option<u8>>,
    pub glasgow_score: Option<Option<u8>>,
    pub weight_kg: Option<Option<f64>>,
    pub height_cm: Option<Option<f64>>,
}

/// 表单动作
#[derive(Debug, Clone)]
pub enum FormAction {
    UpdatePatient(PatientUpdate),
    UpdateReferral(ReferralUpdate),
    UpdateVitals(VitalsUpdate),
    AddAttachment(Attachment),
    RemoveAttachment(String),
    SetNotes(String),
    NextStep,
    PreviousStep,
    GoToStep(FormStep),
    Reset,
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// 转诊表单
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralForm {
    pub current_step: FormStep,
    pub patient: PatientSection,
    pub referral: ReferralSection,
    pub vitals: VitalsSection,
    pub documents: DocumentsSection,
    pub completed: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ReferralForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以当前日期执行动作
    pub fn dispatch(&mut self, action: FormAction) -> Result<()> {
        self.dispatch_at(action, Utc::now().date_naive())
    }

    /// 以指定的"今天"执行动作，年龄据此计算
    pub fn dispatch_at(&mut self, action: FormAction, today: NaiveDate) -> Result<()> {
        if self.completed && !matches!(action, FormAction::Reset) {
            return Err(VitalRedError::validation("Referral form already submitted"));
        }

        match action {
            FormAction::UpdatePatient(update) => self.apply_patient(update, today),
            FormAction::UpdateReferral(update) => self.apply_referral(update),
            FormAction::UpdateVitals(update) => self.apply_vitals(update),
            FormAction::AddAttachment(attachment) => {
                // 同名附件替换旧的
                self.documents.attachments.retain(|a| a.name != attachment.name);
                debug!("Attached {} ({} bytes)", attachment.name, attachment.size());
                self.documents.attachments.push(attachment);
            }
            FormAction::RemoveAttachment(name) => {
                self.documents.attachments.retain(|a| a.name != name);
            }
            FormAction::SetNotes(notes) => self.documents.notes = notes,
            FormAction::NextStep => return self.advance(),
            FormAction::PreviousStep => {
                if let Some(previous) = self.current_step.previous() {
                    self.current_step = previous;
                }
            }
            FormAction::GoToStep(step) => return self.go_to(step),
            FormAction::Reset => {
                *self = Self::default();
                info!("Referral form reset");
            }
        }
        Ok(())
    }

    fn apply_patient(&mut self, update: PatientUpdate, today: NaiveDate) {
        let patient = &mut self.patient;
        merge(&mut patient.identification_type, update.identification_type);
        merge(&mut patient.identification_number, update.identification_number);
        merge(&mut patient.first_name, update.first_name);
        merge(&mut patient.last_name, update.last_name);
        merge(&mut patient.birth_date, update.birth_date);
        merge(&mut patient.sex, update.sex);
        merge(&mut patient.phone, update.phone);
        merge(&mut patient.address, update.address);
        merge(&mut patient.eps, update.eps);

        patient.age = patient.birth_date.map(|birth| calculate_age(birth, today));
    }

    fn apply_referral(&mut self, update: ReferralUpdate) {
        let referral = &mut self.referral;
        merge(&mut referral.referring_institution, update.referring_institution);
        merge(&mut referral.referring_doctor, update.referring_doctor);
        merge(&mut referral.specialty, update.specialty);
        merge(&mut referral.diagnosis, update.diagnosis);
        merge(&mut referral.cie10_code, update.cie10_code);
        merge(&mut referral.reason, update.reason);
        merge(&mut referral.priority, update.priority);
        merge(&mut referral.clinical_summary, update.clinical_summary);
    }

    fn apply_vitals(&mut self, update: VitalsUpdate) {
        let vitals = &mut self.vitals;
        merge(&mut vitals.heart_rate, update.heart_rate);
        merge(&mut vitals.respiratory_rate, update.respiratory_rate);
        merge(&mut vitals.systolic_pressure, update.systolic_pressure);
        merge(&mut vitals.diastolic_pressure, update.diastolic_pressure);
        merge(&mut vitals.temperature, update.temperature);
        merge(&mut vitals.oxygen_saturation, update.oxygen_saturation);
        merge(&mut vitals.glasgow_score, update.glasgow_score);
        merge(&mut vitals.weight_kg, update.weight_kg);
        merge(&mut vitals.height_cm, update.height_cm);

        vitals.bmi = match (vitals.weight_kg, vitals.height_cm) {
            (Some(weight), Some(height)) => calculate_bmi(weight, height).map(round2),
            _ => None,
        };
    }

    /// 验证当前步骤后前进一步
    fn advance(&mut self) -> Result<()> {
        let errors = validate_step(self, self.current_step);
        if !errors.is_empty() {
            let summary: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(VitalRedError::validation(summary.join("; ")));
        }

        if let Some(next) = self.current_step.next() {
            self.current_step = next;
        }
        Ok(())
    }

    /// 跳转步骤：向后随时可以，向前需要中间步骤全部有效
    fn go_to(&mut self, step: FormStep) -> Result<()> {
        if step > self.current_step {
            for pending in FormStep::ALL[..step.index()].iter() {
                let errors = validate_step(self, *pending);
                if let Some(first) = errors.first() {
                    return Err(VitalRedError::validation(first.to_string()));
                }
            }
        }
        self.current_step = step;
        Ok(())
    }

    /// 进度百分比
    pub fn progress(&self) -> u8 {
        ((self.current_step.index() + 1) * 100 / FormStep::ALL.len()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_derived_from_birth_date() {
        let mut form = ReferralForm::new();
        let update = PatientUpdate {
            birth_date: Some(Some(date(2000, 6, 15))),
            ..Default::default()
        };

        form.dispatch_at(FormAction::UpdatePatient(update.clone()), date(2024, 6, 14))
            .unwrap();
        assert_eq!(form.patient.age, Some(23));

        form.dispatch_at(FormAction::UpdatePatient(update), date(2024, 6, 15))
            .unwrap();
        assert_eq!(form.patient.age, Some(24));
    }

    #[test]
    fn test_partial_merge_keeps_other_fields() {
        let mut form = ReferralForm::new();
        form.dispatch(FormAction::UpdatePatient(PatientUpdate {
            first_name: Some("Juan".to_string()),
            last_name: Some("Pérez".to_string()),
            ..Default::default()
        }))
        .unwrap();
        form.dispatch(FormAction::UpdatePatient(PatientUpdate {
            eps: Some("Sura".to_string()),
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(form.patient.full_name(), "Juan Pérez");
        assert_eq!(form.patient.eps, "Sura");
        assert_eq!(form.patient.age, None);
    }

    #[test]
    fn test_bmi_derived_from_weight_and_height() {
        let mut form = ReferralForm::new();
        form.dispatch(FormAction::UpdateVitals(VitalsUpdate {
            weight_kg: Some(Some(70.0)),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(form.vitals.bmi, None);

        form.dispatch(FormAction::UpdateVitals(VitalsUpdate {
            height_cm: Some(Some(175.0)),
            ..Default::default()
        }))
        .unwrap();
        let bmi = form.vitals.bmi.unwrap();
        assert!((bmi - 22.86).abs() < 0.01);
        assert_eq!(form.vitals.bmi_category(), Some(BmiCategory::Normal));
    }

    #[test]
    fn test_clearing_fields_clears_derived_values() {
        let mut form = ReferralForm::new();
        form.dispatch_at(
            FormAction::UpdatePatient(PatientUpdate {
                birth_date: Some(Some(date(2000, 6, 15))),
                sex: Some(Some(Sex::Male)),
                ..Default::default()
            }),
            date(2024, 6, 15),
        )
        .unwrap();
        form.dispatch(FormAction::UpdateVitals(VitalsUpdate {
            weight_kg: Some(Some(70.0)),
            height_cm: Some(Some(175.0)),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(form.patient.age, Some(24));
        assert!(form.vitals.bmi.is_some());

        form.dispatch(FormAction::UpdatePatient(PatientUpdate {
            birth_date: Some(None),
            ..Default::default()
        }))
        .unwrap();
        form.dispatch(FormAction::UpdateVitals(VitalsUpdate {
            height_cm: Some(None),
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(form.patient.birth_date, None);
        assert_eq!(form.patient.age, None);
        assert_eq!(form.patient.sex, Some(Sex::Male));
        assert_eq!(form.vitals.height_cm, None);
        assert_eq!(form.vitals.weight_kg, Some(70.0));
        assert_eq!(form.vitals.bmi, None);
        assert_eq!(form.vitals.bmi_category(), None);
    }

    #[test]
    fn test_next_step_requires_valid_step() {
        let mut form = ReferralForm::new();
        assert!(form.dispatch(FormAction::NextStep).is_err());
        assert_eq!(form.current_step, FormStep::Patient);

        form.dispatch(FormAction::PreviousStep).unwrap();
        assert_eq!(form.current_step, FormStep::Patient);
        assert!(form.dispatch(FormAction::GoToStep(FormStep::Vitals)).is_err());
    }

    #[test]
    fn test_attachments_replace_and_remove() {
        let mut form = ReferralForm::new();
        let first = Attachment::new("epicrisis.pdf", "application/pdf", vec![1]).unwrap();
        let second = Attachment::new("epicrisis.pdf", "application/pdf", vec![1, 2]).unwrap();

        form.dispatch(FormAction::AddAttachment(first)).unwrap();
        form.dispatch(FormAction::AddAttachment(second)).unwrap();
        assert_eq!(form.documents.attachments.len(), 1);
        assert_eq!(form.documents.attachments[0].size(), 2);

        form.dispatch(FormAction::RemoveAttachment("epicrisis.pdf".to_string()))
            .unwrap();
        assert!(form.documents.attachments.is_empty());
    }

    #[test]
    fn test_attachments_not_serialized() {
        let mut form = ReferralForm::new();
        form.dispatch(FormAction::AddAttachment(
            Attachment::new("rx.png", "image/png", vec![0; 8]).unwrap(),
        ))
        .unwrap();

        let value = serde_json::to_value(&form).unwrap();
        assert!(value["documents"].get("attachments").is_none());
    }

    #[test]
    fn test_step_navigation_helpers() {
        assert_eq!(FormStep::Patient.next(), Some(FormStep::Referral));
        assert_eq!(FormStep::Patient.previous(), None);
        assert!(FormStep::Documents.is_last());
        assert_eq!(ReferralForm::new().progress(), 25);
    }
}
