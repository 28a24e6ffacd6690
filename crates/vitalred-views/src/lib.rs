//! # VITAL RED 视图绑定模块
//!
//! 界面组件与数据存储之间的薄适配层：
//! - 视图绑定：记录访问、订阅变更并维护本地快照
//! - 临床数据视图：在快照上计算患者、床位、急诊等关联查询

pub mod binding;
pub mod medical;
pub mod queries;
mod snapshot;

pub use binding::ViewBinding;
pub use medical::MedicalDataView;
pub use queries::{
    ActiveEmergency, BedOccupancy, DataStats, PatientDetails, PriorityBreakdown,
};
