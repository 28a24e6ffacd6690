//! 转诊表单演示程序
//!
//! 逐步填写EPS转诊表单，展示派生字段、分步验证和提交

use std::sync::Arc;

use chrono::NaiveDate;
use vitalred::core::{IdentificationType, Priority, Sex};
use vitalred::referral::{
    validate_step, Attachment, FormAction, FormRepository, FormStep, PatientUpdate,
    ReferralForm, ReferralUpdate, VitalsUpdate,
};
use vitalred::store::MemoryStorage;

fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("📝 VITAL RED 转诊表单演示\n");

    let repository = FormRepository::new(Arc::new(MemoryStorage::new()));
    let mut form = ReferralForm::new();

    // 1. 未填写时尝试前进
    if let Err(e) = form.dispatch(FormAction::NextStep) {
        println!("⚠️  无法离开患者步骤: {}", e);
    }

    // 2. 患者信息
    form.dispatch(FormAction::UpdatePatient(PatientUpdate {
        identification_type: Some(Some(IdentificationType::CC)),
        identification_number: Some("1094567890".to_string()),
        first_name: Some("María".to_string()),
        last_name: Some("Londoño".to_string()),
        birth_date: Some(NaiveDate::from_ymd_opt(1958, 9, 14)),
        sex: Some(Some(Sex::Female)),
        eps: Some("Coomeva EPS".to_string()),
        ..Default::default()
    }))?;
    println!("✅ 患者: {} ({} 岁)", form.patient.full_name(), form.patient.age.unwrap_or_default());
    form.dispatch(FormAction::NextStep)?;

    // 3. 转诊信息
    form.dispatch(FormAction::UpdateReferral(ReferralUpdate {
        referring_institution: Some("Hospital San Jorge de Pereira".to_string()),
        referring_doctor: Some("Dr. Ospina".to_string()),
        specialty: Some("Neurocirugía".to_string()),
        diagnosis: Some("Hemorragia subaracnoidea".to_string()),
        cie10_code: Some("I60.9".to_string()),
        reason: Some("Requiere valoración por neurocirugía".to_string()),
        priority: Some(Some(Priority::Critical)),
        ..Default::default()
    }))?;
    form.dispatch(FormAction::NextStep)?;

    // 4. 生命体征
    form.dispatch(FormAction::UpdateVitals(VitalsUpdate {
        heart_rate: Some(Some(58)),
        systolic_pressure: Some(Some(185)),
        diastolic_pressure: Some(Some(100)),
        glasgow_score: Some(Some(11)),
        weight_kg: Some(Some(64.0)),
        height_cm: Some(Some(158.0)),
        ..Default::default()
    }))?;
    println!("✅ BMI: {:.2} ({:?})", form.vitals.bmi.unwrap_or_default(), form.vitals.bmi_category());
    form.dispatch(FormAction::NextStep)?;

    // 5. 文件
    println!("📎 文件步骤错误: {:?}", validate_step(&form, FormStep::Documents));
    form.dispatch(FormAction::AddAttachment(Attachment::new(
        "tac_cerebral.pdf",
        "application/pdf",
        vec![0u8; 512 * 1024],
    )?))?;
    form.dispatch(FormAction::SetNotes("Paciente con deterioro neurológico".to_string()))?;
    println!("✅ 进度: {}%", form.progress());

    // 6. 提交
    let submission = form.submit(&repository)?;
    println!("\n🚑 已提交转诊 {}", submission.id);
    println!("   附件: {:?}", submission.attachments);
    println!("   已保存: {}", repository.load().is_some());

    form.dispatch(FormAction::Reset)?;
    println!("🔄 表单已重置，当前步骤: {:?}", form.current_step);

    Ok(())
}
