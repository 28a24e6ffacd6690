//! 分步验证

use std::fmt;

use serde::Serialize;

use crate::form::{FormStep, ReferralForm};

/// 字段错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn required(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

fn in_range<T: PartialOrd + fmt::Display + Copy>(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<T>,
    min: T,
    max: T,
) {
    if let Some(value) = value {
        if value < min || value > max {
            errors.push(FieldError::new(
                field,
                format!("{} is outside {}..={}", value, min, max),
            ));
        }
    }
}

/// 验证单个步骤
pub fn validate_step(form: &ReferralForm, step: FormStep) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match step {
        FormStep::Patient => {
            let patient = &form.patient;
            if patient.identification_type.is_none() {
                errors.push(FieldError::new("identificationType", "is required"));
            }
            required(&mut errors, "identificationNumber", &patient.identification_number);
            if !patient
                .identification_number
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
            {
                errors.push(FieldError::new("identificationNumber", "must be alphanumeric"));
            }
            required(&mut errors, "firstName", &patient.first_name);
            required(&mut errors, "lastName", &patient.last_name);
            if patient.birth_date.is_none() {
                errors.push(FieldError::new("birthDate", "is required"));
            }
            in_range(&mut errors, "age", patient.age, 0, 120);
            required(&mut errors, "eps", &patient.eps);
        }
        FormStep::Referral => {
            let referral = &form.referral;
            required(&mut errors, "referringInstitution", &referral.referring_institution);
            required(&mut errors, "specialty", &referral.specialty);
            required(&mut errors, "diagnosis", &referral.diagnosis);
            required(&mut errors, "reason", &referral.reason);
            if referral.priority.is_none() {
                errors.push(FieldError::new("priority", "is required"));
            }
        }
        FormStep::Vitals => {
            let vitals = &form.vitals;
            in_range(&mut errors, "heartRate", vitals.heart_rate, 20, 250);
            in_range(&mut errors, "respiratoryRate", vitals.respiratory_rate, 4, 60);
            in_range(&mut errors, "systolicPressure", vitals.systolic_pressure, 50, 260);
            in_range(&mut errors, "diastolicPressure", vitals.diastolic_pressure, 30, 160);
            in_range(&mut errors, "temperature", vitals.temperature, 30.0, 45.0);
            in_range(&mut errors, "oxygenSaturation", vitals.oxygen_saturation, 50, 100);
            in_range(&mut errors, "glasgowScore", vitals.glasgow_score, 3, 15);
            in_range(&mut errors, "weightKg", vitals.weight_kg, 0.5, 400.0);
            in_range(&mut errors, "heightCm", vitals.height_cm, 30.0, 250.0);

            if let (Some(systolic), Some(diastolic)) =
                (vitals.systolic_pressure, vitals.diastolic_pressure)
            {
                if diastolic >= systolic {
                    errors.push(FieldError::new(
                        "diastolicPressure",
                        "must be lower than systolic pressure",
                    ));
                }
            }
        }
        FormStep::Documents => {
            if form.documents.attachments.is_empty() {
                errors.push(FieldError::new("attachments", "at least one document is required"));
            }
        }
    }

    errors
}

/// 验证全部步骤
pub fn validate_form(form: &ReferralForm) -> Vec<FieldError> {
    FormStep::ALL
        .iter()
        .flat_map(|step| validate_step(form, *step))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormAction, VitalsUpdate};

    #[test]
    fn test_empty_form_reports_required_fields() {
        let form = ReferralForm::new();
        let errors = validate_step(&form, FormStep::Patient);
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"identificationNumber"));
        assert!(fields.contains(&"birthDate"));
        assert!(fields.contains(&"eps"));
    }

    #[test]
    fn test_vitals_ranges() {
        let mut form = ReferralForm::new();
        assert!(validate_step(&form, FormStep::Vitals).is_empty());

        form.dispatch(FormAction::UpdateVitals(VitalsUpdate {
            heart_rate: Some(Some(300)),
            systolic_pressure: Some(Some(80)),
            diastolic_pressure: Some(Some(90)),
            ..Default::default()
        }))
        .unwrap();

        let errors = validate_step(&form, FormStep::Vitals);
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["heartRate", "diastolicPressure"]);
    }
}
