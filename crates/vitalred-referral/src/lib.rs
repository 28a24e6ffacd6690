//! # VITAL RED 转诊表单模块
//!
//! EPS转诊的分步表单：
//! - 表单状态：患者、转诊、生命体征、文件四个步骤，通过动作合并局部数据
//! - 派生字段：年龄、BMI
//! - 分步验证
//! - 提交：附件只保留引用，完成的表单写入独立存储键

pub mod attachments;
pub mod form;
pub mod submission;
pub mod validation;

pub use attachments::{Attachment, AttachmentRef, MAX_ATTACHMENT_BYTES};
pub use form::{
    DocumentsSection, FormAction, FormStep, PatientSection, PatientUpdate, ReferralForm,
    ReferralSection, ReferralUpdate, VitalsSection, VitalsUpdate,
};
pub use submission::{FormRepository, ReferralSubmission};
pub use validation::{validate_form, validate_step, FieldError};
