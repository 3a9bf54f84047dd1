//! DICOM波形文件解析器
//!
//! 基于dicom-rs的 [`RecordingSource`] 实现

use crate::source::{AnnotationItem, ChannelDefinition, MultiplexGroup, RecordingSource};
use dicom::core::value::{DicomValueType, PrimitiveValue, Value};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, InMemDicomObject};
use ecg_core::{HeaderField, RecordError};
use std::path::Path;
use tracing::{debug, error};

/// 已解析的DICOM ECG记录
#[derive(Debug, Clone)]
pub struct DicomRecording {
    obj: InMemDicomObject,
}

impl DicomRecording {
    /// 解析DICOM文件
    pub fn open<P: AsRef<Path>>(file_path: P) -> Result<Self, RecordError> {
        let file_path = file_path.as_ref();
        debug!("开始解析DICOM文件: {:?}", file_path);

        let obj = open_file(file_path).map_err(|e| {
            error!("DICOM文件解析失败: {:?}, 错误: {}", file_path, e);
            RecordError::UnexpectedFault(format!("cannot read DICOM file: {}", e))
        })?;

        Ok(Self::from_object(obj.into_inner()))
    }

    /// 由内存中的DICOM数据集创建
    pub fn from_object(obj: InMemDicomObject) -> Self {
        Self { obj }
    }

    fn header_tag(field: HeaderField) -> Tag {
        match field {
            HeaderField::SopInstanceUid => tags::SOP_INSTANCE_UID,
            HeaderField::SeriesInstanceUid => tags::SERIES_INSTANCE_UID,
            HeaderField::StudyInstanceUid => tags::STUDY_INSTANCE_UID,
            HeaderField::PatientId => tags::PATIENT_ID,
            HeaderField::AccessionNumber => tags::ACCESSION_NUMBER,
            HeaderField::StudyDate => tags::STUDY_DATE,
            HeaderField::StudyTime => tags::STUDY_TIME,
            HeaderField::PatientBirthDate => tags::PATIENT_BIRTH_DATE,
            HeaderField::PatientName => tags::PATIENT_NAME,
            HeaderField::PatientSex => tags::PATIENT_SEX,
            HeaderField::StudyDescription => tags::STUDY_DESCRIPTION,
            HeaderField::AcquisitionDateTime => tags::ACQUISITION_DATE_TIME,
            HeaderField::TimezoneOffsetFromUtc => tags::TIMEZONE_OFFSET_FROM_UTC,
            HeaderField::Manufacturer => tags::MANUFACTURER,
            HeaderField::ManufacturerModelName => tags::MANUFACTURER_MODEL_NAME,
            HeaderField::SoftwareVersions => tags::SOFTWARE_VERSIONS,
            HeaderField::IssuerOfPatientId => tags::ISSUER_OF_PATIENT_ID,
            HeaderField::SopClassUid => tags::SOP_CLASS_UID,
        }
    }

    /// 读取字符串类型元素的值
    fn get_string_element(obj: &InMemDicomObject, tag: Tag) -> Result<Option<String>, RecordError> {
        match obj.element(tag) {
            Ok(element) => {
                let value = element
                    .to_str()
                    .map_err(|e| RecordError::UnexpectedFault(format!("tag {}: {}", tag, e)))?;
                Ok(Some(value.trim_end_matches(['\0', ' ']).to_string()))
            }
            Err(_) => {
                debug!("未找到标签: {:?}", tag);
                Ok(None)
            }
        }
    }

    /// 读取浮点类型元素的值
    fn get_float_element(obj: &InMemDicomObject, tag: Tag) -> Result<Option<f64>, RecordError> {
        match obj.element(tag) {
            Ok(element) => element
                .to_float64()
                .map(Some)
                .map_err(|e| RecordError::UnexpectedFault(format!("tag {}: {}", tag, e))),
            Err(_) => Ok(None),
        }
    }

    /// 读取整数类型元素的值
    fn get_integer_element(obj: &InMemDicomObject, tag: Tag) -> Result<Option<usize>, RecordError> {
        match obj.element(tag) {
            Ok(element) => element
                .to_int::<usize>()
                .map(Some)
                .map_err(|e| RecordError::UnexpectedFault(format!("tag {}: {}", tag, e))),
            Err(_) => Ok(None),
        }
    }

    /// 读取序列元素的条目
    fn get_items(obj: &InMemDicomObject, tag: Tag) -> Option<&[InMemDicomObject]> {
        obj.element(tag).ok().and_then(|element| element.items())
    }

    /// 序列第一项中的 CodeMeaning
    fn first_code_meaning(obj: &InMemDicomObject, tag: Tag) -> Result<Option<String>, RecordError> {
        match Self::get_items(obj, tag).and_then(|items| items.first()) {
            Some(item) => Self::get_string_element(item, tags::CODE_MEANING),
            None => Ok(None),
        }
    }

    fn parse_channel(item: &InMemDicomObject) -> Result<ChannelDefinition, RecordError> {
        Ok(ChannelDefinition {
            source: Self::first_code_meaning(item, tags::CHANNEL_SOURCE_SEQUENCE)?,
            sensitivity: Self::get_float_element(item, tags::CHANNEL_SENSITIVITY)?,
            sensitivity_correction_factor: Self::get_float_element(
                item,
                tags::CHANNEL_SENSITIVITY_CORRECTION_FACTOR,
            )?,
            baseline: Self::get_float_element(item, tags::CHANNEL_BASELINE)?,
            sample_skew: Self::get_float_element(item, tags::CHANNEL_SAMPLE_SKEW)?,
            filter_low_frequency: Self::get_float_element(item, tags::FILTER_LOW_FREQUENCY)?,
            filter_high_frequency: Self::get_float_element(item, tags::FILTER_HIGH_FREQUENCY)?,
            notch_filter_frequency: Self::get_float_element(item, tags::NOTCH_FILTER_FREQUENCY)?,
        })
    }

    fn parse_group(item: &InMemDicomObject) -> Result<MultiplexGroup, RecordError> {
        let channels = Self::get_items(item, tags::CHANNEL_DEFINITION_SEQUENCE)
            .unwrap_or(&[])
            .iter()
            .map(Self::parse_channel)
            .collect::<Result<Vec<_>, _>>()?;

        let sampling_frequency = Self::get_float_element(item, tags::SAMPLING_FREQUENCY)?
            .ok_or_else(|| RecordError::unexpected("waveform group has no SamplingFrequency"))?;
        let channel_count =
            Self::get_integer_element(item, tags::NUMBER_OF_WAVEFORM_CHANNELS)?.unwrap_or(channels.len());
        let bits_allocated = Self::get_integer_element(item, tags::WAVEFORM_BITS_ALLOCATED)?.unwrap_or(16);
        let interpretation = Self::get_string_element(item, tags::WAVEFORM_SAMPLE_INTERPRETATION)?
            .unwrap_or_else(|| "SS".to_string());

        let data = match item.element(tags::WAVEFORM_DATA) {
            Ok(element) => Self::decode_samples(element.value(), bits_allocated, &interpretation)?,
            Err(_) => return Err(RecordError::unexpected("waveform group has no WaveformData")),
        };

        let sample_count = match Self::get_integer_element(item, tags::NUMBER_OF_WAVEFORM_SAMPLES)? {
            Some(count) => count,
            None if channel_count > 0 => data.len() / channel_count,
            None => 0,
        };

        Ok(MultiplexGroup {
            sampling_frequency,
            channel_count,
            sample_count,
            time_offset: Self::get_float_element(item, tags::MULTIPLEX_GROUP_TIME_OFFSET)?,
            channels,
            data,
        })
    }

    /// 按位数和采样解释解码波形数据
    fn decode_samples(
        value: &Value<InMemDicomObject>,
        bits_allocated: usize,
        interpretation: &str,
    ) -> Result<Vec<i32>, RecordError> {
        let signed = matches!(interpretation.trim(), "SS" | "SB");
        let primitive = value
            .primitive()
            .ok_or_else(|| RecordError::unexpected("WaveformData is not a primitive value"))?;

        let samples = match (bits_allocated, primitive) {
            (16, PrimitiveValue::U16(values)) if signed => values.iter().map(|&v| v as i16 as i32).collect(),
            (16, PrimitiveValue::U16(values)) => values.iter().map(|&v| v as i32).collect(),
            (16, PrimitiveValue::I16(values)) => values.iter().map(|&v| v as i32).collect(),
            (16, PrimitiveValue::U8(bytes)) => bytes
                .chunks_exact(2)
                .map(|pair| {
                    let raw = u16::from_le_bytes([pair[0], pair[1]]);
                    if signed {
                        raw as i16 as i32
                    } else {
                        raw as i32
                    }
                })
                .collect(),
            (8, PrimitiveValue::U8(bytes)) if signed => bytes.iter().map(|&b| b as i8 as i32).collect(),
            (8, PrimitiveValue::U8(bytes)) => bytes.iter().map(|&b| b as i32).collect(),
            (bits, other) => {
                return Err(RecordError::UnexpectedFault(format!(
                    "unsupported WaveformData encoding: {} bits as {:?}",
                    bits,
                    other.value_type()
                )))
            }
        };

        Ok(samples)
    }

    fn parse_annotation(item: &InMemDicomObject) -> Result<AnnotationItem, RecordError> {
        let referenced_sample_positions = match item.element(tags::REFERENCED_SAMPLE_POSITIONS) {
            Ok(element) => Some(
                element
                    .to_multi_int::<u32>()
                    .map_err(|e| RecordError::UnexpectedFault(format!("ReferencedSamplePositions: {}", e)))?,
            ),
            Err(_) => None,
        };

        Ok(AnnotationItem {
            unformatted_text: Self::get_string_element(item, tags::UNFORMATTED_TEXT_VALUE)?,
            concept_meaning: Self::first_code_meaning(item, tags::CONCEPT_NAME_CODE_SEQUENCE)?,
            numeric_value: Self::get_float_element(item, tags::NUMERIC_VALUE)?,
            referenced_sample_positions,
        })
    }
}

impl RecordingSource for DicomRecording {
    fn header_value(&self, field: HeaderField) -> Result<Option<String>, RecordError> {
        Self::get_string_element(&self.obj, Self::header_tag(field))
    }

    fn waveform_group(&self, index: usize) -> Result<Option<MultiplexGroup>, RecordError> {
        match Self::get_items(&self.obj, tags::WAVEFORM_SEQUENCE).and_then(|items| items.get(index)) {
            Some(item) => Self::parse_group(item).map(Some),
            None => {
                debug!("未找到波形组: {}", index);
                Ok(None)
            }
        }
    }

    fn annotations(&self) -> Result<Option<Vec<AnnotationItem>>, RecordError> {
        match Self::get_items(&self.obj, tags::WAVEFORM_ANNOTATION_SEQUENCE) {
            Some(items) => items
                .iter()
                .map(Self::parse_annotation)
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            None => Ok(None),
        }
    }
}
