//! # ECG转换流程模块
//!
//! 协调记录组装、批次累积、输出和归档。

pub mod assembler;
pub mod batch;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::RecordAssembler;
pub use batch::{BatchAccumulator, FlushedBatch, ProcessedInput};
pub use runner::{ConversionRunner, RunSummary};
