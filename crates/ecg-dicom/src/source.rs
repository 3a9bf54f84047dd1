//! 记录数据源抽象
//!
//! 转换流程只通过 [`RecordingSource`] 访问已解析的记录，
//! 便于替换为DICOM以外的实现或测试用的内存实现。

use ecg_core::{HeaderField, RecordError};

/// 已解析记录的能力查询接口
pub trait RecordingSource {
    /// 读取头部字段，标签不存在时返回 `None`
    fn header_value(&self, field: HeaderField) -> Result<Option<String>, RecordError>;

    /// 按索引读取波形多路复用组，组不存在时返回 `None`
    fn waveform_group(&self, index: usize) -> Result<Option<MultiplexGroup>, RecordError>;

    /// 读取波形注释序列，序列不存在时返回 `None`
    fn annotations(&self) -> Result<Option<Vec<AnnotationItem>>, RecordError>;

    /// 标签是否存在
    fn has_header(&self, field: HeaderField) -> Result<bool, RecordError> {
        Ok(self.header_value(field)?.is_some())
    }
}

/// 一个波形多路复用组
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplexGroup {
    pub sampling_frequency: f64,
    pub channel_count: usize,
    pub sample_count: usize,
    pub time_offset: Option<f64>,
    pub channels: Vec<ChannelDefinition>,
    /// 原始采样值，按采样点交织存储（s0c0, s0c1, ..., s1c0, ...）
    pub data: Vec<i32>,
}

/// 通道定义
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelDefinition {
    /// 通道来源代码含义，如 "Lead I"
    pub source: Option<String>,
    pub sensitivity: Option<f64>,
    pub sensitivity_correction_factor: Option<f64>,
    pub baseline: Option<f64>,
    pub sample_skew: Option<f64>,
    pub filter_low_frequency: Option<f64>,
    pub filter_high_frequency: Option<f64>,
    pub notch_filter_frequency: Option<f64>,
}

/// 波形注释条目
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationItem {
    pub unformatted_text: Option<String>,
    /// ConceptNameCodeSequence 第一项的 CodeMeaning
    pub concept_meaning: Option<String>,
    pub numeric_value: Option<f64>,
    pub referenced_sample_positions: Option<Vec<u32>>,
}
