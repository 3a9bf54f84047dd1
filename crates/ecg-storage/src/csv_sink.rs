//! CSV批次输出

use crate::sink::{OutputTable, TableSink};
use chrono::NaiveDate;
use ecg_core::{Batch, ConverterError, ErrorRow, GeneralInfoRow, LongFormRow, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 将每个批次写为四个CSV文件
#[derive(Debug, Clone)]
pub struct CsvTableSink {
    output_dir: PathBuf,
    log_dir: Option<PathBuf>,
    date_prefix: Option<NaiveDate>,
}

impl CsvTableSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            log_dir: None,
            date_prefix: None,
        }
    }

    /// 错误表和基本信息表另写一份到日志目录
    pub fn with_log_dir(mut self, log_dir: Option<PathBuf>) -> Self {
        self.log_dir = log_dir;
        self
    }

    /// 文件名前缀日期，`None` 表示不加前缀
    pub fn with_date_prefix(mut self, date: Option<NaiveDate>) -> Self {
        self.date_prefix = date;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `[YYYYMMDD_]<stem>_<token>.csv`
    pub fn file_name(&self, table: OutputTable, token: &str) -> String {
        match self.date_prefix {
            Some(date) => format!("{}_{}_{}.csv", date.format("%Y%m%d"), table.stem(), token),
            None => format!("{}_{}.csv", table.stem(), token),
        }
    }

    fn write_table(&self, dir: &Path, table: OutputTable, batch: &Batch) -> Result<PathBuf> {
        let path = dir.join(self.file_name(table, &batch.range.token()));
        match table {
            OutputTable::Error => write_csv(&path, &ErrorRow::COLUMNS, &batch.errors)?,
            OutputTable::GeneralInfo => {
                write_csv(&path, &GeneralInfoRow::COLUMNS, &batch.general_info)?
            }
            OutputTable::MedianBeat => {
                write_csv(&path, &LongFormRow::COLUMNS, batch.median_beat_rows())?
            }
            OutputTable::Rhythm => write_csv(&path, &LongFormRow::COLUMNS, batch.rhythm_rows())?,
        }
        debug!("已写入: {}", path.display());
        Ok(path)
    }
}

impl TableSink for CsvTableSink {
    fn write_batch(&mut self, batch: &Batch) -> Result<()> {
        create_dir(&self.output_dir)?;
        for table in OutputTable::ALL {
            self.write_table(&self.output_dir, table, batch)?;
        }

        if let Some(log_dir) = &self.log_dir {
            create_dir(log_dir)?;
            for table in OutputTable::ALL.into_iter().filter(OutputTable::mirrored_to_log) {
                self.write_table(log_dir, table, batch)?;
            }
        }

        info!(
            "批次 {} 已输出到 {}: {} 条基本信息, {} 条错误",
            batch.range.token(),
            self.output_dir.display(),
            batch.general_info.len(),
            batch.errors.len()
        );
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| ConverterError::Sink(format!("无法创建目录 {}: {}", dir.display(), e)))
}

/// 先写列名再写数据行，保证空表也有表头
fn write_csv<I>(path: &Path, columns: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let sink_error =
        |e: &dyn std::fmt::Display| ConverterError::Sink(format!("{}: {}", path.display(), e));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| sink_error(&e))?;

    writer.write_record(columns).map_err(|e| sink_error(&e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| sink_error(&e))?;
    }
    writer.flush().map_err(|e| sink_error(&e))?;
    Ok(())
}
