//! 转换器配置
//!
//! 默认值 → 配置文件（可选） → `ECG_` 环境变量，命令行参数最后覆盖。

use config::{Config, Environment, File};
use ecg_core::{ConverterError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

/// 转换器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub conversion: ConversionConfig,
}

/// 输入配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// 输入根目录
    pub root: PathBuf,
    /// 归档目录，未设置时不归档
    pub archive_dir: Option<PathBuf>,
    /// 失败的输入是否也归档
    pub archive_failures: bool,
}

/// 输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 输出目录
    pub dir: PathBuf,
    /// 日志目录，错误表和基本信息表另写一份
    pub log_dir: Option<PathBuf>,
    /// 文件名是否加日期前缀
    pub date_prefix: bool,
}

/// 转换参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub batch_size: usize,
    /// 批次标记和文件编号的起始偏移
    pub index_offset: usize,
    /// 8通道记录是否推导肢体导联
    pub augment_leads: bool,
    /// 是否重采样到 500 Hz
    pub resample: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            log_dir: None,
            date_prefix: true,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            index_offset: 0,
            augment_leads: false,
            resample: true,
        }
    }
}

impl ConverterConfig {
    /// 加载配置
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&ConverterConfig::default()).map_err(config_error)?,
        );
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("ECG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        let config: ConverterConfig = settings.try_deserialize().map_err(config_error)?;

        match config_path {
            Some(path) => info!("已从 {} 加载配置", path),
            None => info!("未指定配置文件，使用默认配置和环境变量"),
        }
        Ok(config)
    }
}

fn config_error(e: config::ConfigError) -> ConverterError {
    ConverterError::Config(e.to_string())
}

/// 验证规则
struct ValidationRule {
    field_path: &'static str,
    validator: fn(&ConverterConfig) -> std::result::Result<(), String>,
}

/// 配置验证器
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "input.root",
                validator: |config| {
                    if config.input.root.as_os_str().is_empty() {
                        Err("input root is required".to_string())
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "output.dir",
                validator: |config| {
                    if config.output.dir.as_os_str().is_empty() {
                        Err("output directory is required".to_string())
                    } else if config.output.dir == config.input.root {
                        Err("output directory must differ from the input root".to_string())
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "output.log_dir",
                validator: |config| match &config.output.log_dir {
                    Some(dir) if dir.as_os_str().is_empty() => {
                        Err("log directory must not be empty".to_string())
                    }
                    Some(dir) if *dir == config.input.root => {
                        Err("log directory must differ from the input root".to_string())
                    }
                    _ => Ok(()),
                },
            },
            ValidationRule {
                field_path: "conversion.batch_size",
                validator: |config| {
                    if config.conversion.batch_size == 0 {
                        Err("batch size must be at least 1".to_string())
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "input.archive_dir",
                validator: |config| match &config.input.archive_dir {
                    Some(dir) if dir.as_os_str().is_empty() => {
                        Err("archive directory must not be empty".to_string())
                    }
                    Some(dir) if *dir == config.input.root => {
                        Err("archive directory must differ from the input root".to_string())
                    }
                    _ => Ok(()),
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ConverterConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("配置验证失败 {}: {}", rule.field_path, e);
                return Err(ConverterError::Config(format!("{}: {}", rule.field_path, e)));
            }
        }

        info!("配置验证通过");
        Ok(())
    }
}
