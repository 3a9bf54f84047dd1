//! # ECG Core
//!
//! ECG转换系统的核心模块，提供数据模型、错误定义、输出表结构和通用工具。

pub mod error;
pub mod models;
pub mod tables;
pub mod utils;

pub use error::{ConverterError, RecordError, Result};
pub use models::*;
pub use tables::*;
