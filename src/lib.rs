//! # VITAL RED
//!
//! 转诊与病例管理系统的统一入口，重新导出各子模块。

pub use vitalred_core as core;
pub use vitalred_referral as referral;
pub use vitalred_store as store;
pub use vitalred_views as views;
