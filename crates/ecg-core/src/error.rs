//! 错误定义模块
//!
//! 分为两类：单条记录的处理错误（写入错误表，不中断批处理）和
//! 整个运行级别的错误（终止运行，返回非零退出码）。

use thiserror::Error;

/// 单条ECG记录的处理错误
///
/// 错误描述会原样写入错误表的 `error_reason` 列。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Essential DICOM tags missing: {0}")]
    MissingRequiredMetadata(String),

    #[error("Malformed date or time in {field}: {value:?}")]
    MalformedDateOrTime { field: String, value: String },

    #[error("No ECG waveform present")]
    NoWaveformPresent,

    #[error("No median waveform present")]
    MedianWaveformAbsent,

    #[error("Unexpected fault: {0}")]
    UnexpectedFault(String),
}

impl RecordError {
    /// 是否导致整条记录失败
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RecordError::MedianWaveformAbsent)
    }

    /// 错误分类名称
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::MissingRequiredMetadata(_) => "MissingRequiredMetadata",
            RecordError::MalformedDateOrTime { .. } => "MalformedDateOrTime",
            RecordError::NoWaveformPresent => "NoWaveformPresent",
            RecordError::MedianWaveformAbsent => "MedianWaveformAbsent",
            RecordError::UnexpectedFault(_) => "UnexpectedFault",
        }
    }

    pub fn malformed(field: impl Into<String>, value: impl Into<String>) -> Self {
        RecordError::MalformedDateOrTime {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn unexpected(message: impl ToString) -> Self {
        RecordError::UnexpectedFault(message.to_string())
    }
}

/// 运行级别错误
#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("输入目录不存在: {0}")]
    InputNotFound(String),

    #[error("输入路径不是目录: {0}")]
    NotADirectory(String),

    #[error("输出写入失败: {0}")]
    Sink(String),

    #[error("归档失败: {0}")]
    Archive(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 运行级别结果类型
pub type Result<T> = std::result::Result<T, ConverterError>;
