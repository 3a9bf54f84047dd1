//! 批次累积
//!
//! 逐条消费记录结果，写入四张表；累计记录数达到批次大小或流结束时输出。

use ecg_core::{
    Batch, BatchRange, ErrorRow, GeneralInfoRow, RecordOutcome, Result, WaveformTable,
};
use ecg_storage::{ScannedFile, TableSink};
use std::mem;
use tracing::{info, warn};

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// 已被某个批次覆盖的输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedInput {
    pub file: ScannedFile,
    pub succeeded: bool,
}

/// 一次成功输出的结果
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedBatch {
    pub range: BatchRange,
    pub inputs: Vec<ProcessedInput>,
}

/// 批次累积器
pub struct BatchAccumulator<S: TableSink> {
    sink: S,
    batch_size: usize,
    index_offset: usize,
    batch: Batch,
    pending: Vec<ProcessedInput>,
}

impl<S: TableSink> BatchAccumulator<S> {
    /// 创建累积器，批次大小至少为1
    pub fn new(sink: S, batch_size: usize, index_offset: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
            index_offset,
            batch: Batch::starting_at(index_offset),
            pending: Vec::new(),
        }
    }

    /// 当前未输出的批次
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// 消费一条记录结果
    ///
    /// 达到批次大小时输出并返回该批次覆盖的输入。
    pub fn push(&mut self, file: ScannedFile, outcome: RecordOutcome) -> Result<Option<FlushedBatch>> {
        let file_no = self.batch.range.end;

        let succeeded = match outcome {
            Ok(record) => {
                // 波形矩阵整体移入批次，输出时再展开为长格式行
                self.batch.general_info.push(GeneralInfoRow::from(&record));
                let record_id = record.header.sop_instance_uid;
                if !record.rhythm.leads.is_empty() {
                    self.batch
                        .rhythm
                        .push(WaveformTable::new(record_id.clone(), record.rhythm));
                }
                if let Some(median) = record.median_beat {
                    self.batch.median_beat.push(WaveformTable::new(record_id, median));
                }
                true
            }
            Err(failure) => {
                warn!("文件 {} ({}) 转换失败: {}", file_no, file.display_name(), failure.error);
                self.batch
                    .errors
                    .push(ErrorRow::new(file_no, file.display_name(), &failure));
                false
            }
        };

        self.batch.range.end += 1;
        self.pending.push(ProcessedInput { file, succeeded });

        if self.batch.record_count() >= self.batch_size {
            return self.flush().map(Some);
        }
        Ok(None)
    }

    /// 输出剩余记录
    pub fn finish(&mut self) -> Result<Option<FlushedBatch>> {
        if self.batch.range.is_empty() {
            return Ok(None);
        }
        self.flush().map(Some)
    }

    /// 输出失败时保留当前批次
    fn flush(&mut self) -> Result<FlushedBatch> {
        self.sink.write_batch(&self.batch)?;

        let range = self.batch.range;
        info!(
            "批次 {} 已输出: {} 条记录, {} 条错误",
            range.token(),
            range.len(),
            self.batch.errors.len()
        );

        self.batch = Batch::starting_at(range.end);
        Ok(FlushedBatch {
            range,
            inputs: mem::take(&mut self.pending),
        })
    }
}
