//! # ECG存储模块
//!
//! 负责输入文件发现、批次表格输出和已处理文件归档。

pub mod archive;
pub mod csv_sink;
pub mod scanner;
pub mod sink;

pub use archive::*;
pub use csv_sink::*;
pub use scanner::*;
pub use sink::*;
