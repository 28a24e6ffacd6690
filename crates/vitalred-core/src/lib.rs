//! # VITAL RED Core
//!
//! 系统的核心模块，提供临床数据模型、视图切片模型、错误定义和派生字段计算。

pub mod error;
pub mod models;
pub mod utils;
pub mod views;

pub use error::{Result, VitalRedError};
pub use models::*;
pub use views::*;
