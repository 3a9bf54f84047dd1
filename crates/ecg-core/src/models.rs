//! 核心数据模型定义

use crate::error::RecordError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// 从记录中读取的头部字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    SopInstanceUid,
    SeriesInstanceUid,
    StudyInstanceUid,
    PatientId,
    AccessionNumber,
    StudyDate,
    StudyTime,
    PatientBirthDate,
    PatientName,
    PatientSex,
    StudyDescription,
    AcquisitionDateTime,
    TimezoneOffsetFromUtc,
    Manufacturer,
    ManufacturerModelName,
    SoftwareVersions,
    IssuerOfPatientId,
    SopClassUid,
}

impl HeaderField {
    /// 必需字段集合，任一缺失则整条记录失败
    pub const REQUIRED: [HeaderField; 7] = [
        HeaderField::SopInstanceUid,
        HeaderField::SeriesInstanceUid,
        HeaderField::StudyInstanceUid,
        HeaderField::PatientId,
        HeaderField::AccessionNumber,
        HeaderField::StudyDate,
        HeaderField::StudyTime,
    ];

    /// DICOM关键字
    pub fn keyword(&self) -> &'static str {
        match self {
            HeaderField::SopInstanceUid => "SOPInstanceUID",
            HeaderField::SeriesInstanceUid => "SeriesInstanceUID",
            HeaderField::StudyInstanceUid => "StudyInstanceUID",
            HeaderField::PatientId => "PatientID",
            HeaderField::AccessionNumber => "AccessionNumber",
            HeaderField::StudyDate => "StudyDate",
            HeaderField::StudyTime => "StudyTime",
            HeaderField::PatientBirthDate => "PatientBirthDate",
            HeaderField::PatientName => "PatientName",
            HeaderField::PatientSex => "PatientSex",
            HeaderField::StudyDescription => "StudyDescription",
            HeaderField::AcquisitionDateTime => "AcquisitionDateTime",
            HeaderField::TimezoneOffsetFromUtc => "TimezoneOffsetFromUTC",
            HeaderField::Manufacturer => "Manufacturer",
            HeaderField::ManufacturerModelName => "ManufacturerModelName",
            HeaderField::SoftwareVersions => "SoftwareVersions",
            HeaderField::IssuerOfPatientId => "IssuerOfPatientID",
            HeaderField::SopClassUid => "SOPClassUID",
        }
    }
}

/// 记录头部元数据
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMetadata {
    // === 必需字段 ===
    pub sop_instance_uid: String,
    pub series_instance_uid: String,
    pub study_instance_uid: String,
    pub patient_id: String,
    pub accession_number: String,
    pub study_date: NaiveDate,
    pub study_time: NaiveTime,

    // === 可选字段，缺失时为空字符串 ===
    pub patient_birth_date: String,
    pub patient_name: String,
    pub patient_sex: String,
    pub study_description: String,
    /// 采集日期时间，缺失时为 None
    pub acquisition_date_time: Option<NaiveDateTime>,
    pub acquisition_time_zone: String,
    pub manufacturer: String,
    pub manufacturer_model_name: String,
    pub software_versions: String,
    /// 数据导出方（IssuerOfPatientID）
    pub data_exported_by: String,
}

/// 通道设置，取自节律波形组的第一个通道
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSettings {
    /// 原始通道数
    pub channel_count: u32,
    pub sensitivity: Option<f64>,
    pub baseline: Option<f64>,
    pub sample_skew: Option<f64>,
    pub filter_low_frequency: Option<f64>,
    pub filter_high_frequency: Option<f64>,
    pub notch_filter_frequency: Option<f64>,
}

/// 波形类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformKind {
    Rhythm,
    MedianBeat,
}

impl WaveformKind {
    /// 对应的多路复用组索引
    pub fn group_index(&self) -> usize {
        match self {
            WaveformKind::Rhythm => 0,
            WaveformKind::MedianBeat => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WaveformKind::Rhythm => "rhythm",
            WaveformKind::MedianBeat => "median_beat",
        }
    }
}

impl std::fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 导联名到电压序列的映射
///
/// 保持插入顺序。同名导联后写入者覆盖先写入者，位置保持不变。
/// 所有导联的序列长度相同。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadMap {
    leads: Vec<(String, Vec<f64>)>,
}

impl LeadMap {
    pub fn new() -> Self {
        Self { leads: Vec::new() }
    }

    /// 插入导联，同名时覆盖并返回旧序列
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        samples: Vec<f64>,
    ) -> std::result::Result<Option<Vec<f64>>, RecordError> {
        let name = name.into();

        if let Some((other, existing)) = self.leads.iter().find(|(n, _)| *n != name) {
            if existing.len() != samples.len() {
                return Err(RecordError::UnexpectedFault(format!(
                    "lead {} has {} samples but {} has {}",
                    name,
                    samples.len(),
                    other,
                    existing.len()
                )));
            }
        }

        match self.leads.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Ok(Some(std::mem::replace(existing, samples))),
            None => {
                self.leads.push((name, samples));
                Ok(None)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.leads
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, samples)| samples.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 导联数量
    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// 每个导联的采样点数
    pub fn sample_count(&self) -> usize {
        self.leads.first().map(|(_, s)| s.len()).unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.leads.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.leads.iter().map(|(n, s)| (n.as_str(), s.as_slice()))
    }

    /// 对每个导联应用变换，返回新的映射
    pub fn map_samples<F>(&self, mut f: F) -> LeadMap
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        LeadMap {
            leads: self
                .leads
                .iter()
                .map(|(name, samples)| (name.clone(), f(samples)))
                .collect(),
        }
    }
}

/// 单组波形矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformMatrix {
    pub kind: WaveformKind,
    /// 生成该矩阵时的采样频率
    pub sampling_frequency: f64,
    pub leads: LeadMap,
}

impl WaveformMatrix {
    pub fn new(kind: WaveformKind, sampling_frequency: f64, leads: LeadMap) -> Self {
        Self {
            kind,
            sampling_frequency,
            leads,
        }
    }

    pub fn empty(kind: WaveformKind, sampling_frequency: f64) -> Self {
        Self::new(kind, sampling_frequency, LeadMap::new())
    }
}

/// 波形注释摘要
pub type AnnotationSummary = serde_json::Map<String, serde_json::Value>;

/// 一条成功转换的ECG记录
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub header: HeaderMetadata,
    pub channels: ChannelSettings,
    /// 节律波形，原始通道数少于8时为空
    pub rhythm: WaveformMatrix,
    /// 中位心搏波形
    pub median_beat: Option<WaveformMatrix>,
    pub original_frequency: f64,
    pub sampling_frequency: f64,
    pub summary: AnnotationSummary,
}

impl Record {
    /// 记录ID（SOP Instance UID）
    pub fn record_id(&self) -> &str {
        &self.header.sop_instance_uid
    }

    pub fn median_waveform_present(&self) -> bool {
        self.median_beat.is_some()
    }
}

/// 失败记录：分类错误加上已读取到的部分元数据
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub error: RecordError,
    /// SOP Class UID（如可读取）
    pub sop_class_uid: Option<String>,
}

impl RecordFailure {
    pub fn new(error: RecordError) -> Self {
        Self {
            error,
            sop_class_uid: None,
        }
    }

    pub fn with_sop_class_uid(mut self, sop_class_uid: Option<String>) -> Self {
        self.sop_class_uid = sop_class_uid;
        self
    }
}

/// 单条记录的处理结果
pub type RecordOutcome = std::result::Result<Record, RecordFailure>;
