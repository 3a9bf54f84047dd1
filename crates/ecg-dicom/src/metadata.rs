//! 头部元数据提取
//!
//! 先一次性校验7个必需字段，再读取可选字段并解析日期时间。

use crate::source::RecordingSource;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ecg_core::{HeaderField, HeaderMetadata, RecordError};
use std::collections::HashMap;
use tracing::debug;

/// 元数据提取器
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// 提取头部元数据
    ///
    /// 任一必需字段缺失时返回 `MissingRequiredMetadata`，此时不会读取其他字段。
    pub fn extract<S: RecordingSource + ?Sized>(source: &S) -> Result<HeaderMetadata, RecordError> {
        let mut required = HashMap::with_capacity(HeaderField::REQUIRED.len());
        for field in HeaderField::REQUIRED {
            match source.header_value(field)? {
                Some(value) => {
                    required.insert(field, value);
                }
                None => {
                    debug!("缺少必需标签: {}", field.keyword());
                    return Err(RecordError::MissingRequiredMetadata(field.keyword().to_string()));
                }
            }
        }

        let mut take = |field: HeaderField| required.remove(&field).unwrap_or_default();
        let sop_instance_uid = take(HeaderField::SopInstanceUid);
        let series_instance_uid = take(HeaderField::SeriesInstanceUid);
        let study_instance_uid = take(HeaderField::StudyInstanceUid);
        let patient_id = take(HeaderField::PatientId);
        let accession_number = take(HeaderField::AccessionNumber);
        let study_date = take(HeaderField::StudyDate);
        let study_time = take(HeaderField::StudyTime);

        let optional = |field: HeaderField| -> Result<String, RecordError> {
            Ok(source.header_value(field)?.unwrap_or_default())
        };

        let acquisition = optional(HeaderField::AcquisitionDateTime)?;
        let acquisition_date_time = if acquisition.trim().is_empty() {
            None
        } else {
            Some(Self::parse_date_time(HeaderField::AcquisitionDateTime, &acquisition)?)
        };

        Ok(HeaderMetadata {
            study_date: Self::parse_date(HeaderField::StudyDate, &study_date)?,
            study_time: Self::parse_time(HeaderField::StudyTime, &study_time)?,
            sop_instance_uid,
            series_instance_uid,
            study_instance_uid,
            patient_id,
            accession_number,
            patient_birth_date: optional(HeaderField::PatientBirthDate)?,
            patient_name: optional(HeaderField::PatientName)?,
            patient_sex: optional(HeaderField::PatientSex)?,
            study_description: optional(HeaderField::StudyDescription)?,
            acquisition_date_time,
            acquisition_time_zone: optional(HeaderField::TimezoneOffsetFromUtc)?,
            manufacturer: optional(HeaderField::Manufacturer)?,
            manufacturer_model_name: optional(HeaderField::ManufacturerModelName)?,
            software_versions: optional(HeaderField::SoftwareVersions)?,
            data_exported_by: optional(HeaderField::IssuerOfPatientId)?,
        })
    }

    /// 解析 `YYYYMMDD` 日期
    pub fn parse_date(field: HeaderField, value: &str) -> Result<NaiveDate, RecordError> {
        let digits = value.trim();
        let malformed = || RecordError::malformed(field.keyword(), value);

        if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let (year, month, day) = (
            digits[0..4].parse::<i32>().map_err(|_| malformed())?,
            digits[4..6].parse::<u32>().map_err(|_| malformed())?,
            digits[6..8].parse::<u32>().map_err(|_| malformed())?,
        );
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
    }

    /// 解析时间：取前6个字符，左侧补零到6位，按 `HHMMSS` 解析
    pub fn parse_time(field: HeaderField, value: &str) -> Result<NaiveTime, RecordError> {
        let head: String = value.trim().chars().take(6).collect();
        let padded = format!("{:0>6}", head);
        Self::parse_hms(&padded).ok_or_else(|| RecordError::malformed(field.keyword(), value))
    }

    /// 解析日期时间：取前14个字符，按 `YYYYMMDDHHMMSS` 解析
    pub fn parse_date_time(field: HeaderField, value: &str) -> Result<NaiveDateTime, RecordError> {
        let head: String = value.trim().chars().take(14).collect();
        let malformed = || RecordError::malformed(field.keyword(), value);

        if head.len() != 14 || !head.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let date = Self::parse_date(field, &head[0..8]).map_err(|_| malformed())?;
        let time = Self::parse_hms(&head[8..14]).ok_or_else(malformed)?;
        Ok(date.and_time(time))
    }

    fn parse_hms(digits: &str) -> Option<NaiveTime> {
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let hour = digits[0..2].parse::<u32>().ok()?;
        let minute = digits[2..4].parse::<u32>().ok()?;
        let second = digits[4..6].parse::<u32>().ok()?;
        NaiveTime::from_hms_opt(hour, minute, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::header_object;
    use crate::parser::DicomRecording;
    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::dictionary_std::tags;

    #[test]
    fn test_extract_header() {
        let recording = DicomRecording::from_object(header_object());
        let header = MetadataExtractor::extract(&recording).unwrap();

        assert_eq!(header.sop_instance_uid, "1.2.3.4.1");
        assert_eq!(header.study_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(header.study_time, NaiveTime::from_hms_opt(9, 30, 15).unwrap());
        assert_eq!(header.patient_name, "Doe^Jane");
        assert_eq!(header.patient_sex, "");
        assert_eq!(
            header.acquisition_date_time,
            Some(
                NaiveDate::from_ymd_opt(2024, 1, 31)
                    .unwrap()
                    .and_hms_opt(9, 30, 15)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_missing_required_field_is_reported_by_name() {
        let mut obj = header_object();
        obj.remove_element(tags::ACCESSION_NUMBER);
        let recording = DicomRecording::from_object(obj);

        assert_eq!(
            MetadataExtractor::extract(&recording),
            Err(RecordError::MissingRequiredMetadata("AccessionNumber".to_string()))
        );
    }

    #[test]
    fn test_malformed_study_date() {
        let mut obj = header_object();
        obj.put(DataElement::new(tags::STUDY_DATE, VR::DA, PrimitiveValue::from("2024-01-31")));
        let recording = DicomRecording::from_object(obj);

        assert!(matches!(
            MetadataExtractor::extract(&recording),
            Err(RecordError::MalformedDateOrTime { ref field, .. }) if field == "StudyDate"
        ));
    }

    #[test]
    fn test_absent_acquisition_date_time_is_empty() {
        let mut obj = header_object();
        obj.remove_element(tags::ACQUISITION_DATE_TIME);
        let header = MetadataExtractor::extract(&DicomRecording::from_object(obj)).unwrap();
        assert_eq!(header.acquisition_date_time, None);
    }

    #[test]
    fn test_parse_time_pads_and_truncates() {
        let field = HeaderField::StudyTime;
        assert_eq!(
            MetadataExtractor::parse_time(field, "123045.123").unwrap(),
            NaiveTime::from_hms_opt(12, 30, 45).unwrap()
        );
        assert_eq!(
            MetadataExtractor::parse_time(field, "5").unwrap(),
            NaiveTime::from_hms_opt(0, 0, 5).unwrap()
        );
        assert!(MetadataExtractor::parse_time(field, "256000").is_err());
        assert!(MetadataExtractor::parse_time(field, "12:30").is_err());
    }

    #[test]
    fn test_parse_date() {
        let field = HeaderField::StudyDate;
        assert!(MetadataExtractor::parse_date(field, "20240229").is_ok());
        assert!(MetadataExtractor::parse_date(field, "20230229").is_err());
        assert!(MetadataExtractor::parse_date(field, "2023011").is_err());
    }

    #[test]
    fn test_parse_date_time_needs_fourteen_digits() {
        let field = HeaderField::AcquisitionDateTime;
        assert!(MetadataExtractor::parse_date_time(field, "20240131").is_err());
        assert!(MetadataExtractor::parse_date_time(field, "20240131120000+0100").is_ok());
    }

    #[test]
    fn test_parse_date_time_rejects_non_ascii() {
        let field = HeaderField::AcquisitionDateTime;
        for value in ["2024013é120000", "2024013é12000", "202401311200é0"] {
            assert!(
                matches!(
                    MetadataExtractor::parse_date_time(field, value),
                    Err(RecordError::MalformedDateOrTime { .. })
                ),
                "{}",
                value
            );
        }
    }

    #[test]
    fn test_malformed_acquisition_date_time_fails_the_record() {
        let mut obj = header_object();
        obj.put(DataElement::new(
            tags::ACQUISITION_DATE_TIME,
            VR::DT,
            PrimitiveValue::from("2024013é12000"),
        ));
        let recording = DicomRecording::from_object(obj);

        assert!(matches!(
            MetadataExtractor::extract(&recording),
            Err(RecordError::MalformedDateOrTime { ref field, .. }) if field == "AcquisitionDateTime"
        ));
    }
}
