//! 批次输出接口

use ecg_core::{Batch, Result};

/// 批次中的输出表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTable {
    Error,
    GeneralInfo,
    MedianBeat,
    Rhythm,
}

impl OutputTable {
    /// 按输出顺序排列的所有表
    pub const ALL: [OutputTable; 4] = [
        OutputTable::Error,
        OutputTable::GeneralInfo,
        OutputTable::MedianBeat,
        OutputTable::Rhythm,
    ];

    /// 文件名主干
    pub fn stem(&self) -> &'static str {
        match self {
            OutputTable::Error => "DICOM_error",
            OutputTable::GeneralInfo => "DICOM_ECG_GENERALINFO",
            OutputTable::MedianBeat => "DICOM_ECG_WAVEFORM_MEDIANBEAT",
            OutputTable::Rhythm => "DICOM_ECG_WAVEFORM_RHYTHM",
        }
    }

    /// 是否同时写入日志目录
    pub fn mirrored_to_log(&self) -> bool {
        matches!(self, OutputTable::Error | OutputTable::GeneralInfo)
    }
}

/// 批次表格的输出目标
///
/// 写入失败时调用方保留批次内容，不会丢失任何行。
pub trait TableSink {
    fn write_batch(&mut self, batch: &Batch) -> Result<()>;
}

impl<T: TableSink + ?Sized> TableSink for Box<T> {
    fn write_batch(&mut self, batch: &Batch) -> Result<()> {
        (**self).write_batch(batch)
    }
}

/// 内存输出，保存所有写入的批次
#[derive(Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<Batch>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有已写入批次的标记
    pub fn tokens(&self) -> Vec<String> {
        self.batches.iter().map(|b| b.range.token()).collect()
    }
}

impl TableSink for MemorySink {
    fn write_batch(&mut self, batch: &Batch) -> Result<()> {
        self.batches.push(batch.clone());
        Ok(())
    }
}
