//! 转换运行器
//!
//! 扫描 → 解析 → 组装 → 累积 → 输出 → 归档

use crate::assembler::RecordAssembler;
use crate::batch::{BatchAccumulator, FlushedBatch};
use ecg_core::{RecordFailure, Result};
use ecg_dicom::DicomRecording;
use ecg_storage::{Archiver, InputScanner, TableSink};
use tracing::{debug, info};

/// 一次运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 扫描到的输入文件数
    pub scanned: usize,
    pub converted: usize,
    pub failed: usize,
    /// 输出的批次数
    pub batches: usize,
    /// 已归档的文件数
    pub archived: usize,
}

/// 转换运行器
pub struct ConversionRunner<S: TableSink> {
    scanner: InputScanner,
    assembler: RecordAssembler,
    accumulator: BatchAccumulator<S>,
    archiver: Option<Archiver>,
    archive_failures: bool,
}

impl<S: TableSink> ConversionRunner<S> {
    pub fn new(
        scanner: InputScanner,
        assembler: RecordAssembler,
        accumulator: BatchAccumulator<S>,
    ) -> Self {
        Self {
            scanner,
            assembler,
            accumulator,
            archiver: None,
            archive_failures: false,
        }
    }

    /// 设置归档目录；`archive_failures` 为真时失败的输入也会被归档
    pub fn with_archive(mut self, archiver: Option<Archiver>, archive_failures: bool) -> Self {
        self.archiver = archiver;
        self.archive_failures = archive_failures;
        self
    }

    pub fn accumulator(&self) -> &BatchAccumulator<S> {
        &self.accumulator
    }

    /// 执行一次完整转换
    ///
    /// 单条记录的失败写入错误表；输出或归档失败会中止运行。
    pub fn run(&mut self) -> Result<RunSummary> {
        let files = self.scanner.scan()?;
        let mut summary = RunSummary {
            scanned: files.len(),
            ..Default::default()
        };
        info!(
            "开始转换 {}: {} 个输入文件",
            self.scanner.root().display(),
            files.len()
        );

        for file in files {
            debug!("处理文件: {}", file.display_name());

            let outcome = match DicomRecording::open(&file.path) {
                Ok(recording) => self.assembler.assemble(&recording),
                Err(error) => Err(RecordFailure::new(error)),
            };
            match &outcome {
                Ok(_) => summary.converted += 1,
                Err(_) => summary.failed += 1,
            }

            if let Some(flushed) = self.accumulator.push(file, outcome)? {
                self.after_flush(flushed, &mut summary)?;
            }
        }

        if let Some(flushed) = self.accumulator.finish()? {
            self.after_flush(flushed, &mut summary)?;
        }

        info!(
            "转换完成: 成功 {}, 失败 {}, 批次 {}, 归档 {}",
            summary.converted, summary.failed, summary.batches, summary.archived
        );
        Ok(summary)
    }

    /// 批次输出后归档其覆盖的输入
    fn after_flush(&self, flushed: FlushedBatch, summary: &mut RunSummary) -> Result<()> {
        summary.batches += 1;

        let archiver = match &self.archiver {
            Some(archiver) => archiver,
            None => return Ok(()),
        };

        for input in flushed.inputs {
            if input.succeeded || self.archive_failures {
                archiver.archive(&input.file)?;
                summary.archived += 1;
            }
        }
        Ok(())
    }
}
