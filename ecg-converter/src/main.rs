//! ECG DICOM 转换器主程序

mod config;

use crate::config::{ConfigValidator, ConverterConfig};
use anyhow::Context;
use chrono::Local;
use clap::Parser;
use ecg_pipeline::{BatchAccumulator, ConversionRunner, RecordAssembler, RunSummary};
use ecg_storage::{Archiver, CsvTableSink, InputScanner};
use std::path::PathBuf;
use tracing::{error, info};

/// 转换器命令行参数
#[derive(Parser, Debug)]
#[command(name = "ecg-converter")]
#[command(about = "将DICOM ECG波形文件批量转换为CSV表格")]
struct Args {
    /// 输入根目录
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 归档目录
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// 日志目录
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// 批次大小
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// 批次编号偏移
    #[arg(long)]
    index_offset: Option<usize>,

    /// 8通道记录推导肢体导联
    #[arg(long)]
    augment_leads: bool,

    /// 保持原始采样频率
    #[arg(long)]
    no_resample: bool,

    /// 输出文件名不加日期前缀
    #[arg(long)]
    no_date_prefix: bool,

    /// 失败的输入也归档
    #[arg(long)]
    archive_failures: bool,
}

impl Args {
    /// 命令行参数覆盖配置
    fn apply_to(&self, config: &mut ConverterConfig) {
        if let Some(input) = &self.input {
            config.input.root = input.clone();
        }
        if let Some(output) = &self.output {
            config.output.dir = output.clone();
        }
        if let Some(archive_dir) = &self.archive_dir {
            config.input.archive_dir = Some(archive_dir.clone());
        }
        if let Some(log_dir) = &self.log_dir {
            config.output.log_dir = Some(log_dir.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config.conversion.batch_size = batch_size;
        }
        if let Some(index_offset) = self.index_offset {
            config.conversion.index_offset = index_offset;
        }
        if self.augment_leads {
            config.conversion.augment_leads = true;
        }
        if self.no_resample {
            config.conversion.resample = false;
        }
        if self.no_date_prefix {
            config.output.date_prefix = false;
        }
        if self.archive_failures {
            config.input.archive_failures = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    info!("启动ECG转换器...");

    let mut config =
        ConverterConfig::load(args.config.as_deref()).context("加载配置失败")?;
    args.apply_to(&mut config);
    ConfigValidator::new().validate(&config)?;

    info!("转换器配置:");
    info!("  输入目录: {}", config.input.root.display());
    info!("  输出目录: {}", config.output.dir.display());
    info!("  批次大小: {}", config.conversion.batch_size);

    match run(&config) {
        Ok(summary) => {
            info!(
                "共处理 {} 个文件: 成功 {}, 失败 {}",
                summary.scanned, summary.converted, summary.failed
            );
            Ok(())
        }
        Err(e) => {
            error!("转换中止: {:#}", e);
            Err(e)
        }
    }
}

/// 按配置组装并执行转换
fn run(config: &ConverterConfig) -> anyhow::Result<RunSummary> {
    let mut scanner = InputScanner::new(&config.input.root).exclude(&config.output.dir);
    if let Some(archive_dir) = &config.input.archive_dir {
        scanner = scanner.exclude(archive_dir);
    }
    if let Some(log_dir) = &config.output.log_dir {
        scanner = scanner.exclude(log_dir);
    }

    let date_prefix = config.output.date_prefix.then(|| Local::now().date_naive());
    let sink = CsvTableSink::new(&config.output.dir)
        .with_log_dir(config.output.log_dir.clone())
        .with_date_prefix(date_prefix);

    let accumulator = BatchAccumulator::new(
        sink,
        config.conversion.batch_size,
        config.conversion.index_offset,
    );
    let assembler =
        RecordAssembler::new(config.conversion.augment_leads, config.conversion.resample);
    let archiver = config.input.archive_dir.as_ref().map(|dir| Archiver::new(dir));

    let mut runner = ConversionRunner::new(scanner, assembler, accumulator)
        .with_archive(archiver, config.input.archive_failures);

    runner
        .run()
        .with_context(|| format!("转换 {} 失败", config.input.root.display()))
}
