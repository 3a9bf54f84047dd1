//! 测试用内存记录

use ecg_core::{HeaderField, RecordError};
use ecg_dicom::{AnnotationItem, ChannelDefinition, MultiplexGroup, RecordingSource};
use std::collections::HashMap;

pub(crate) const TWELVE_LEADS: [&str; 12] = [
    "Lead I", "Lead II", "Lead III", "Lead aVR", "Lead aVL", "Lead aVF", "Lead V1", "Lead V2",
    "Lead V3", "Lead V4", "Lead V5", "Lead V6",
];

pub(crate) const EIGHT_LEADS: [&str; 8] = [
    "Lead I", "Lead II", "Lead V1", "Lead V2", "Lead V3", "Lead V4", "Lead V5", "Lead V6",
];

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRecording {
    pub header: HashMap<HeaderField, String>,
    pub groups: Vec<MultiplexGroup>,
    pub annotations: Option<Vec<AnnotationItem>>,
    pub panic_on_annotations: bool,
    /// 注释序列返回读取错误
    pub annotation_error: bool,
}

impl FakeRecording {
    /// 仅含头部字段的记录
    pub fn header_only(sop_instance_uid: &str) -> Self {
        let mut header = HashMap::new();
        header.insert(HeaderField::SopClassUid, "1.2.840.10008.5.1.4.1.1.9.1.1".to_string());
        header.insert(HeaderField::SopInstanceUid, sop_instance_uid.to_string());
        header.insert(HeaderField::SeriesInstanceUid, "1.2.3.4".to_string());
        header.insert(HeaderField::StudyInstanceUid, "1.2.3".to_string());
        header.insert(HeaderField::PatientId, "P0001".to_string());
        header.insert(HeaderField::AccessionNumber, "ACC42".to_string());
        header.insert(HeaderField::StudyDate, "20240131".to_string());
        header.insert(HeaderField::StudyTime, "093015".to_string());
        Self {
            header,
            ..Default::default()
        }
    }

    /// 含节律波形的记录，第 c 个通道第 s 个采样点为 `c + s`
    pub fn ecg(sop_instance_uid: &str, leads: &[&str], samples: usize, frequency: f64) -> Self {
        let mut recording = Self::header_only(sop_instance_uid);
        recording.groups.push(group(leads, samples, frequency));
        recording
    }

    pub fn with_median(mut self, leads: &[&str], samples: usize, frequency: f64) -> Self {
        self.groups.push(group(leads, samples, frequency));
        self
    }

    pub fn without(mut self, field: HeaderField) -> Self {
        self.header.remove(&field);
        self
    }
}

pub(crate) fn group(leads: &[&str], samples: usize, frequency: f64) -> MultiplexGroup {
    let mut data = Vec::with_capacity(leads.len() * samples);
    for s in 0..samples {
        for c in 0..leads.len() {
            data.push((c + s) as i32);
        }
    }

    MultiplexGroup {
        sampling_frequency: frequency,
        channel_count: leads.len(),
        sample_count: samples,
        time_offset: None,
        channels: leads
            .iter()
            .map(|lead| ChannelDefinition {
                source: Some(lead.to_string()),
                sensitivity: Some(1.0),
                baseline: Some(0.0),
                ..Default::default()
            })
            .collect(),
        data,
    }
}

impl RecordingSource for FakeRecording {
    fn header_value(&self, field: HeaderField) -> Result<Option<String>, RecordError> {
        Ok(self.header.get(&field).cloned())
    }

    fn waveform_group(&self, index: usize) -> Result<Option<MultiplexGroup>, RecordError> {
        Ok(self.groups.get(index).cloned())
    }

    fn annotations(&self) -> Result<Option<Vec<AnnotationItem>>, RecordError> {
        if self.panic_on_annotations {
            panic!("annotation sequence is corrupt");
        }
        if self.annotation_error {
            return Err(RecordError::unexpected("annotation item is unreadable"));
        }
        Ok(self.annotations.clone())
    }
}
