//! 输出表结构
//!
//! 每个批次输出四张表：基本信息表、中位心搏长表、节律长表和错误表。
//! 列名和列顺序是下游兼容接口，不可随意更改。

use crate::models::{Record, RecordFailure, WaveformKind, WaveformMatrix};
use crate::utils::batch_token;
use serde::Serialize;

/// 长格式波形行：每个 (记录, 导联, 采样点) 一行
///
/// 借用所属记录的波形数据，只在输出时生成。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LongFormRow<'a> {
    pub record_id: &'a str,
    pub waveform: WaveformKind,
    pub lead: &'a str,
    pub sample_id: usize,
    pub voltage: f64,
}

impl LongFormRow<'_> {
    pub const COLUMNS: [&'static str; 5] = ["record_id", "waveform", "lead", "sample_id", "voltage"];
}

/// 将波形矩阵展开为长格式行
///
/// 按采样点索引递增输出，同一采样点内按导联顺序。
pub fn flatten_waveform<'a>(
    record_id: &'a str,
    matrix: &'a WaveformMatrix,
) -> impl Iterator<Item = LongFormRow<'a>> + 'a {
    let waveform = matrix.kind;
    (0..matrix.leads.sample_count()).flat_map(move |sample_id| {
        matrix.leads.iter().filter_map(move |(lead, samples)| {
            samples.get(sample_id).map(|&voltage| LongFormRow {
                record_id,
                waveform,
                lead,
                sample_id,
                voltage,
            })
        })
    })
}

/// 一条记录的一组波形，批次中按原样保存
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformTable {
    pub record_id: String,
    pub matrix: WaveformMatrix,
}

impl WaveformTable {
    pub fn new(record_id: impl Into<String>, matrix: WaveformMatrix) -> Self {
        Self {
            record_id: record_id.into(),
            matrix,
        }
    }

    /// 展开后的行数
    pub fn row_count(&self) -> usize {
        self.matrix.leads.len() * self.matrix.leads.sample_count()
    }

    pub fn rows(&self) -> impl Iterator<Item = LongFormRow<'_>> {
        flatten_waveform(&self.record_id, &self.matrix)
    }
}

/// 基本信息表的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralInfoRow {
    #[serde(rename = "SOPinstanceUID")]
    pub sop_instance_uid: String,
    #[serde(rename = "SERIESinstanceUID")]
    pub series_instance_uid: String,
    #[serde(rename = "STUDYinstanceUID")]
    pub study_instance_uid: String,
    #[serde(rename = "PatientID")]
    pub patient_id: String,
    #[serde(rename = "PatientBirthDate")]
    pub patient_birth_date: String,
    #[serde(rename = "PatientName")]
    pub patient_name: String,
    #[serde(rename = "PatientSex")]
    pub patient_sex: String,
    #[serde(rename = "StudyDate")]
    pub study_date: String,
    #[serde(rename = "StudyTime")]
    pub study_time: String,
    #[serde(rename = "StudyDescription")]
    pub study_description: String,
    #[serde(rename = "AcquisitionDateTime")]
    pub acquisition_date_time: String,
    #[serde(rename = "AcquisitionTimeZone")]
    pub acquisition_time_zone: String,
    #[serde(rename = "AccessionNumber")]
    pub accession_number: String,
    #[serde(rename = "SamplingFrequency")]
    pub sampling_frequency: f64,
    #[serde(rename = "OriginalSamplingFrequency")]
    pub original_sampling_frequency: f64,
    #[serde(rename = "ChannelNumber")]
    pub channel_number: u32,
    #[serde(rename = "ChannelSensitivity")]
    pub channel_sensitivity: Option<f64>,
    #[serde(rename = "ChannelBaseline")]
    pub channel_baseline: Option<f64>,
    #[serde(rename = "ChannelSampleSkew")]
    pub channel_sample_skew: Option<f64>,
    #[serde(rename = "FilterLowFrequency")]
    pub filter_low_frequency: Option<f64>,
    #[serde(rename = "FilterHighFrequency")]
    pub filter_high_frequency: Option<f64>,
    #[serde(rename = "NotchFilterFrequency")]
    pub notch_filter_frequency: Option<f64>,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "ManufacturerModelName")]
    pub manufacturer_model_name: String,
    #[serde(rename = "SoftwareVersions")]
    pub software_versions: String,
    #[serde(rename = "DataExportedBy")]
    pub data_exported_by: String,
    #[serde(rename = "MedianWaveformPresent")]
    pub median_waveform_present: String,
    #[serde(rename = "Summary")]
    pub summary: String,
}

impl GeneralInfoRow {
    pub const COLUMNS: [&'static str; 28] = [
        "SOPinstanceUID",
        "SERIESinstanceUID",
        "STUDYinstanceUID",
        "PatientID",
        "PatientBirthDate",
        "PatientName",
        "PatientSex",
        "StudyDate",
        "StudyTime",
        "StudyDescription",
        "AcquisitionDateTime",
        "AcquisitionTimeZone",
        "AccessionNumber",
        "SamplingFrequency",
        "OriginalSamplingFrequency",
        "ChannelNumber",
        "ChannelSensitivity",
        "ChannelBaseline",
        "ChannelSampleSkew",
        "FilterLowFrequency",
        "FilterHighFrequency",
        "NotchFilterFrequency",
        "Manufacturer",
        "ManufacturerModelName",
        "SoftwareVersions",
        "DataExportedBy",
        "MedianWaveformPresent",
        "Summary",
    ];
}

impl From<&Record> for GeneralInfoRow {
    fn from(record: &Record) -> Self {
        let header = &record.header;
        let channels = &record.channels;

        Self {
            sop_instance_uid: header.sop_instance_uid.clone(),
            series_instance_uid: header.series_instance_uid.clone(),
            study_instance_uid: header.study_instance_uid.clone(),
            patient_id: header.patient_id.clone(),
            patient_birth_date: header.patient_birth_date.clone(),
            patient_name: header.patient_name.clone(),
            patient_sex: header.patient_sex.clone(),
            study_date: header.study_date.format("%Y-%m-%d").to_string(),
            study_time: header.study_time.format("%H:%M:%S").to_string(),
            study_description: header.study_description.clone(),
            acquisition_date_time: header
                .acquisition_date_time
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            acquisition_time_zone: header.acquisition_time_zone.clone(),
            accession_number: header.accession_number.clone(),
            sampling_frequency: record.sampling_frequency,
            original_sampling_frequency: record.original_frequency,
            channel_number: channels.channel_count,
            channel_sensitivity: channels.sensitivity,
            channel_baseline: channels.baseline,
            channel_sample_skew: channels.sample_skew,
            filter_low_frequency: channels.filter_low_frequency,
            filter_high_frequency: channels.filter_high_frequency,
            notch_filter_frequency: channels.notch_filter_frequency,
            manufacturer: header.manufacturer.clone(),
            manufacturer_model_name: header.manufacturer_model_name.clone(),
            software_versions: header.software_versions.clone(),
            data_exported_by: header.data_exported_by.clone(),
            median_waveform_present: if record.median_waveform_present() { "Yes" } else { "No" }
                .to_string(),
            summary: serde_json::Value::Object(record.summary.clone()).to_string(),
        }
    }
}

/// 错误表的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRow {
    pub file_no: usize,
    pub filename: String,
    pub error_reason: String,
    /// SOP Class UID，未能读取时为空
    pub filetype: String,
}

impl ErrorRow {
    pub const COLUMNS: [&'static str; 4] = ["file_no", "filename", "error_reason", "filetype"];

    pub fn new(file_no: usize, filename: impl Into<String>, failure: &RecordFailure) -> Self {
        Self {
            file_no,
            filename: filename.into(),
            error_reason: failure.error.to_string(),
            filetype: failure.sop_class_uid.clone().unwrap_or_default(),
        }
    }
}

/// 批次覆盖的记录索引范围，左闭右开
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 文件名标记 `<start>_<end>`
    pub fn token(&self) -> String {
        batch_token(self.start, self.end)
    }
}

/// 一个批次的四张表
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub range: BatchRange,
    pub general_info: Vec<GeneralInfoRow>,
    pub median_beat: Vec<WaveformTable>,
    pub rhythm: Vec<WaveformTable>,
    pub errors: Vec<ErrorRow>,
}

impl Batch {
    /// 从指定索引开始的空批次
    pub fn starting_at(start: usize) -> Self {
        Self {
            range: BatchRange::new(start, start),
            general_info: Vec::new(),
            median_beat: Vec::new(),
            rhythm: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// 记录数（成功 + 失败）
    pub fn record_count(&self) -> usize {
        self.range.len()
    }

    pub fn has_rows(&self) -> bool {
        !(self.general_info.is_empty()
            && self.median_beat_row_count() == 0
            && self.rhythm_row_count() == 0
            && self.errors.is_empty())
    }

    pub fn rhythm_rows(&self) -> impl Iterator<Item = LongFormRow<'_>> {
        self.rhythm.iter().flat_map(|table| table.rows())
    }

    pub fn median_beat_rows(&self) -> impl Iterator<Item = LongFormRow<'_>> {
        self.median_beat.iter().flat_map(|table| table.rows())
    }

    pub fn rhythm_row_count(&self) -> usize {
        self.rhythm.iter().map(WaveformTable::row_count).sum()
    }

    pub fn median_beat_row_count(&self) -> usize {
        self.median_beat.iter().map(WaveformTable::row_count).sum()
    }
}
