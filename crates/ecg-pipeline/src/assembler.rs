//! 记录组装
//!
//! 依次执行元数据提取、波形提取、导联推导、重采样和注释摘要，
//! 任何未分类的故障都在这里转换为 `UnexpectedFault`。

use ecg_core::{
    HeaderField, LeadMap, Record, RecordError, RecordFailure, RecordOutcome, WaveformKind,
    WaveformMatrix,
};
use ecg_dicom::{summarize_annotations, MetadataExtractor, RecordingSource, WaveformExtractor};
use ecg_signal::{LeadDeriver, Resampler};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// 提取导联映射所需的最少节律通道数
pub const MIN_RHYTHM_CHANNELS: usize = 8;

/// 记录组装器
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    deriver: LeadDeriver,
    resampler: Resampler,
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new(false, true)
    }
}

impl RecordAssembler {
    pub fn new(augment_leads: bool, resample: bool) -> Self {
        Self {
            deriver: LeadDeriver::new(augment_leads),
            resampler: Resampler::new(resample),
        }
    }

    /// 组装一条记录
    ///
    /// 不会返回运行级错误，也不会让 panic 继续传播。
    pub fn assemble<S: RecordingSource + ?Sized>(&self, source: &S) -> RecordOutcome {
        let error = match panic::catch_unwind(AssertUnwindSafe(|| self.try_assemble(source))) {
            Ok(Ok(record)) => return Ok(record),
            Ok(Err(error)) => error,
            Err(payload) => RecordError::UnexpectedFault(panic_message(payload.as_ref())),
        };

        warn!("记录转换失败: {}", error);

        // 尽量带上 SOP Class UID
        let sop_class_uid = panic::catch_unwind(AssertUnwindSafe(|| {
            source.header_value(HeaderField::SopClassUid).ok().flatten()
        }))
        .ok()
        .flatten();

        Err(RecordFailure::new(error).with_sop_class_uid(sop_class_uid))
    }

    fn try_assemble<S: RecordingSource + ?Sized>(&self, source: &S) -> Result<Record, RecordError> {
        // 1. 头部元数据
        let header = MetadataExtractor::extract(source)?;
        debug!("记录 {}: 元数据提取完成", header.sop_instance_uid);

        // 2. 节律波形
        let rhythm = WaveformExtractor::extract(source, WaveformKind::Rhythm)?;
        let original_frequency = rhythm.sampling_frequency;

        // 3. 节律导联，通道不足时为空
        let rhythm_leads = if rhythm.channel_count() >= MIN_RHYTHM_CHANNELS {
            if rhythm.sample_count() == 0 {
                return Err(RecordError::unexpected("rhythm waveform has no samples"));
            }
            self.deriver.derive(rhythm.lead_map()?, rhythm.channel_count())?
        } else {
            debug!(
                "记录 {}: 节律通道数 {} 不足 {}，不输出节律波形",
                header.sop_instance_uid,
                rhythm.channel_count(),
                MIN_RHYTHM_CHANNELS
            );
            LeadMap::new()
        };

        // 4. 中位心搏，缺失或无法读取都不是错误
        let median_leads = self.median_leads(source, &header.sop_instance_uid);

        // 5. 重采样，两组波形共用同一对频率
        let normalized = self
            .resampler
            .normalize(original_frequency, rhythm_leads, median_leads);
        let sampling_frequency = normalized.sampling_frequency;

        // 6. 注释摘要，注释无法读取时按无注释处理
        let summary = match source.annotations() {
            Ok(annotations) => summarize_annotations(annotations.as_deref()),
            Err(error) => {
                warn!("记录 {}: 注释无法读取: {}", header.sop_instance_uid, error);
                summarize_annotations(None)
            }
        };

        // 7. 组装
        Ok(Record {
            header,
            channels: rhythm.settings,
            rhythm: WaveformMatrix::new(WaveformKind::Rhythm, sampling_frequency, normalized.rhythm),
            median_beat: normalized
                .median_beat
                .map(|leads| WaveformMatrix::new(WaveformKind::MedianBeat, sampling_frequency, leads)),
            original_frequency,
            sampling_frequency,
            summary,
        })
    }

    /// 中位心搏导联
    ///
    /// 组缺失、数据损坏或没有采样点时都返回 `None`，记录照常输出。
    fn median_leads<S: RecordingSource + ?Sized>(
        &self,
        source: &S,
        record_id: &str,
    ) -> Option<LeadMap> {
        let leads = WaveformExtractor::extract(source, WaveformKind::MedianBeat).and_then(|median| {
            if median.sample_count() == 0 {
                return Err(RecordError::unexpected("median beat waveform has no samples"));
            }
            self.deriver.derive(median.lead_map()?, median.channel_count())
        });

        match leads {
            Ok(leads) => Some(leads),
            Err(RecordError::MedianWaveformAbsent) => {
                debug!("记录 {}: 无中位心搏波形", record_id);
                None
            }
            Err(error) => {
                warn!("记录 {}: 中位心搏波形无法读取: {}", record_id, error);
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during record conversion".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRecording, EIGHT_LEADS, TWELVE_LEADS};
    use ecg_dicom::NO_ANNOTATIONS;
    use ecg_signal::{MEDIAN_BEAT_SAMPLES, RHYTHM_SAMPLES};

    #[test]
    fn test_assemble_twelve_lead_record() {
        let recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 5000, 500.0)
            .with_median(&TWELVE_LEADS, 600, 500.0);
        let record = RecordAssembler::default().assemble(&recording).unwrap();

        assert_eq!(record.record_id(), "1.2.3.4.1");
        assert_eq!(record.rhythm.leads.len(), 12);
        assert_eq!(record.rhythm.leads.sample_count(), 5000);
        assert!(record.median_waveform_present());
        assert_eq!(record.sampling_frequency, 500.0);
        assert_eq!(record.channels.channel_count, 12);
        assert_eq!(record.summary["Summary"], NO_ANNOTATIONS);
    }

    #[test]
    fn test_resampling_applies_to_both_waveforms() {
        let recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 2500, 250.0)
            .with_median(&TWELVE_LEADS, 300, 250.0);
        let record = RecordAssembler::default().assemble(&recording).unwrap();

        assert_eq!(record.original_frequency, 250.0);
        assert_eq!(record.sampling_frequency, 500.0);
        assert_eq!(record.rhythm.leads.sample_count(), RHYTHM_SAMPLES);
        let median = record.median_beat.unwrap();
        assert_eq!(median.leads.sample_count(), MEDIAN_BEAT_SAMPLES);
        assert_eq!(median.sampling_frequency, 500.0);
    }

    #[test]
    fn test_missing_required_field_fails_with_sop_class() {
        let recording =
            FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 10, 500.0).without(HeaderField::PatientId);
        let failure = RecordAssembler::default().assemble(&recording).unwrap_err();

        assert_eq!(
            failure.error,
            RecordError::MissingRequiredMetadata("PatientID".to_string())
        );
        assert_eq!(
            failure.sop_class_uid.as_deref(),
            Some("1.2.840.10008.5.1.4.1.1.9.1.1")
        );
    }

    #[test]
    fn test_no_waveform_is_fatal() {
        let recording = FakeRecording::header_only("1.2.3.4.1");
        let failure = RecordAssembler::default().assemble(&recording).unwrap_err();
        assert_eq!(failure.error, RecordError::NoWaveformPresent);
    }

    #[test]
    fn test_few_channels_give_empty_rhythm() {
        for count in 1..8 {
            let recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS[..count], 2500, 250.0);
            let record = RecordAssembler::default().assemble(&recording).unwrap();

            assert!(record.rhythm.leads.is_empty());
            assert!(!record.median_waveform_present());
            // 节律为空时不重采样
            assert_eq!(record.sampling_frequency, 250.0);
        }
    }

    #[test]
    fn test_eight_channels_are_augmented() {
        let recording = FakeRecording::ecg("1.2.3.4.1", &EIGHT_LEADS, 10, 500.0)
            .with_median(&EIGHT_LEADS, 4, 500.0);
        let record = RecordAssembler::new(true, true).assemble(&recording).unwrap();

        assert_eq!(record.rhythm.leads.len(), 12);
        assert!(record.rhythm.leads.contains("aVF"));
        assert_eq!(record.median_beat.unwrap().leads.len(), 12);
    }

    #[test]
    fn test_malformed_study_time() {
        let mut recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 10, 500.0);
        recording
            .header
            .insert(HeaderField::StudyTime, "9:30".to_string());
        let failure = RecordAssembler::default().assemble(&recording).unwrap_err();
        assert!(matches!(failure.error, RecordError::MalformedDateOrTime { .. }));
    }

    #[test]
    fn test_panic_becomes_unexpected_fault() {
        let mut recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 10, 500.0);
        recording.panic_on_annotations = true;
        let failure = RecordAssembler::default().assemble(&recording).unwrap_err();

        assert_eq!(
            failure.error,
            RecordError::UnexpectedFault("annotation sequence is corrupt".to_string())
        );
    }

    #[test]
    fn test_rhythm_without_samples_is_unexpected_fault() {
        let recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 0, 500.0);
        let failure = RecordAssembler::default().assemble(&recording).unwrap_err();

        assert_eq!(
            failure.error,
            RecordError::UnexpectedFault("rhythm waveform has no samples".to_string())
        );
    }

    #[test]
    fn test_malformed_median_is_reported_absent() {
        let mut recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 10, 500.0)
            .with_median(&TWELVE_LEADS, 4, 500.0);
        // 数据长度与通道数 x 采样点数不符
        recording.groups[1].data.pop();
        let record = RecordAssembler::default().assemble(&recording).unwrap();

        assert!(!record.median_waveform_present());
        assert_eq!(record.rhythm.leads.len(), 12);
    }

    #[test]
    fn test_median_without_samples_is_reported_absent() {
        let recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 10, 500.0)
            .with_median(&TWELVE_LEADS, 0, 500.0);
        let record = RecordAssembler::default().assemble(&recording).unwrap();
        assert!(!record.median_waveform_present());
    }

    #[test]
    fn test_unreadable_annotations_give_no_annotation_summary() {
        let mut recording = FakeRecording::ecg("1.2.3.4.1", &TWELVE_LEADS, 10, 500.0);
        recording.annotation_error = true;
        let record = RecordAssembler::default().assemble(&recording).unwrap();

        assert_eq!(record.summary["Summary"], NO_ANNOTATIONS);
        assert_eq!(record.rhythm.leads.len(), 12);
    }
}
