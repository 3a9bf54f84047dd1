//! 波形提取
//!
//! 将多路复用组的交织原始数据拆分为按通道排列的电压序列，并生成导联名称。

use crate::source::{MultiplexGroup, RecordingSource};
use ecg_core::{ChannelSettings, LeadMap, RecordError, WaveformKind};
use tracing::debug;

/// 提取出的单组波形
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedWaveform {
    pub kind: WaveformKind,
    pub sampling_frequency: f64,
    /// 按通道排列的电压值，`channels[c][s]`
    pub channels: Vec<Vec<f64>>,
    /// 与 `channels` 对应的通道来源描述
    pub sources: Vec<Option<String>>,
    /// 取自第一个通道的设置
    pub settings: ChannelSettings,
}

impl ExtractedWaveform {
    /// 原始通道数
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 每个通道的采样点数
    pub fn sample_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// 各通道的导联名称
    pub fn lead_labels(&self) -> Result<Vec<String>, RecordError> {
        self.sources
            .iter()
            .enumerate()
            .map(|(index, source)| match source {
                Some(source) => Ok(WaveformExtractor::lead_label(source)),
                None => Err(RecordError::UnexpectedFault(format!(
                    "{} channel {} has no source code meaning",
                    self.kind, index
                ))),
            })
            .collect()
    }

    /// 构建导联映射，同名导联后者覆盖前者
    pub fn lead_map(&self) -> Result<LeadMap, RecordError> {
        let mut leads = LeadMap::new();
        for (label, samples) in self.lead_labels()?.into_iter().zip(&self.channels) {
            if leads.insert(label.clone(), samples.clone())?.is_some() {
                debug!("导联名称重复，覆盖先前通道: {}", label);
            }
        }
        Ok(leads)
    }
}

/// 波形提取器
pub struct WaveformExtractor;

impl WaveformExtractor {
    /// 提取指定类型的波形
    ///
    /// 节律波形缺失返回 `NoWaveformPresent`，中位心搏缺失返回 `MedianWaveformAbsent`。
    pub fn extract<S: RecordingSource + ?Sized>(
        source: &S,
        kind: WaveformKind,
    ) -> Result<ExtractedWaveform, RecordError> {
        let group = match source.waveform_group(kind.group_index())? {
            Some(group) => group,
            None => {
                return Err(match kind {
                    WaveformKind::Rhythm => RecordError::NoWaveformPresent,
                    WaveformKind::MedianBeat => RecordError::MedianWaveformAbsent,
                })
            }
        };

        let extracted = ExtractedWaveform {
            kind,
            sampling_frequency: group.sampling_frequency,
            channels: Self::demultiplex(&group)?,
            sources: group.channels.iter().map(|c| c.source.clone()).collect(),
            settings: Self::channel_settings(&group),
        };

        debug!(
            "提取 {} 波形: {} 通道 x {} 采样点, {} Hz",
            kind,
            extracted.channel_count(),
            extracted.sample_count(),
            extracted.sampling_frequency
        );
        Ok(extracted)
    }

    /// 拆分交织数据并换算为电压：`(raw + baseline) * sensitivity * correction`
    pub fn demultiplex(group: &MultiplexGroup) -> Result<Vec<Vec<f64>>, RecordError> {
        let (channels, samples) = (group.channel_count, group.sample_count);

        if group.data.len() != channels * samples {
            return Err(RecordError::UnexpectedFault(format!(
                "waveform data holds {} values, expected {} channels x {} samples",
                group.data.len(),
                channels,
                samples
            )));
        }
        if group.channels.len() != channels {
            return Err(RecordError::UnexpectedFault(format!(
                "{} channel definitions for {} waveform channels",
                group.channels.len(),
                channels
            )));
        }

        let matrix = group
            .channels
            .iter()
            .enumerate()
            .map(|(c, definition)| {
                let baseline = definition.baseline.unwrap_or(0.0);
                let scale = definition.sensitivity.unwrap_or(1.0)
                    * definition.sensitivity_correction_factor.unwrap_or(1.0);
                (0..samples)
                    .map(|s| (group.data[s * channels + c] as f64 + baseline) * scale)
                    .collect()
            })
            .collect();

        Ok(matrix)
    }

    /// 由通道来源描述得到导联名称
    pub fn lead_label(source: &str) -> String {
        source.replace("Lead", "").trim().to_string()
    }

    /// 通道设置，取自第一个通道
    pub fn channel_settings(group: &MultiplexGroup) -> ChannelSettings {
        let first = group.channels.first().cloned().unwrap_or_default();
        ChannelSettings {
            channel_count: group.channel_count as u32,
            sensitivity: first.sensitivity,
            baseline: first.baseline,
            sample_skew: first.sample_skew,
            filter_low_frequency: first.filter_low_frequency,
            filter_high_frequency: first.filter_high_frequency,
            notch_filter_frequency: first.notch_filter_frequency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::ecg_object;
    use crate::parser::DicomRecording;
    use crate::source::ChannelDefinition;

    #[test]
    fn test_extract_rhythm() {
        let recording = DicomRecording::from_object(ecg_object(&["Lead I", "Lead II", "Lead V1"], None));
        let rhythm = WaveformExtractor::extract(&recording, WaveformKind::Rhythm).unwrap();

        assert_eq!(rhythm.channel_count(), 3);
        assert_eq!(rhythm.sample_count(), 10);
        assert_eq!(rhythm.channels[2][..3], [200.0, 201.0, 202.0]);
        assert_eq!(rhythm.lead_labels().unwrap(), vec!["I", "II", "V1"]);
        assert_eq!(rhythm.settings.channel_count, 3);
        assert_eq!(rhythm.settings.notch_filter_frequency, Some(50.0));
    }

    #[test]
    fn test_missing_groups_are_classified() {
        let recording = DicomRecording::from_object(crate::parser::tests::header_object());
        assert_eq!(
            WaveformExtractor::extract(&recording, WaveformKind::Rhythm),
            Err(RecordError::NoWaveformPresent)
        );

        let recording = DicomRecording::from_object(ecg_object(&["Lead I"], None));
        assert_eq!(
            WaveformExtractor::extract(&recording, WaveformKind::MedianBeat),
            Err(RecordError::MedianWaveformAbsent)
        );
    }

    #[test]
    fn test_lead_label() {
        assert_eq!(WaveformExtractor::lead_label("Lead I"), "I");
        assert_eq!(WaveformExtractor::lead_label(" Lead aVR "), "aVR");
        assert_eq!(WaveformExtractor::lead_label("V6"), "V6");
    }

    #[test]
    fn test_duplicate_lead_names_last_write_wins() {
        let recording = DicomRecording::from_object(ecg_object(&["Lead I", "I", "Lead II"], None));
        let rhythm = WaveformExtractor::extract(&recording, WaveformKind::Rhythm).unwrap();
        let leads = rhythm.lead_map().unwrap();

        assert_eq!(leads.len(), 2);
        assert_eq!(leads.names().collect::<Vec<_>>(), vec!["I", "II"]);
        // 第二个通道的数据从 100 开始
        assert_eq!(leads.get("I").unwrap()[0], 100.0);
    }

    #[test]
    fn test_demultiplex_applies_calibration() {
        let channel = |sensitivity, baseline| ChannelDefinition {
            source: Some("Lead I".to_string()),
            sensitivity: Some(sensitivity),
            baseline: Some(baseline),
            sensitivity_correction_factor: Some(2.0),
            ..Default::default()
        };
        let group = MultiplexGroup {
            sampling_frequency: 500.0,
            channel_count: 2,
            sample_count: 2,
            time_offset: None,
            channels: vec![channel(0.5, 0.0), channel(1.0, -1.0)],
            data: vec![10, 20, -4, 3],
        };

        let matrix = WaveformExtractor::demultiplex(&group).unwrap();
        assert_eq!(matrix, vec![vec![10.0, -4.0], vec![38.0, 4.0]]);
    }

    #[test]
    fn test_demultiplex_rejects_short_data() {
        let group = MultiplexGroup {
            sampling_frequency: 500.0,
            channel_count: 2,
            sample_count: 3,
            time_offset: None,
            channels: vec![ChannelDefinition::default(), ChannelDefinition::default()],
            data: vec![1, 2, 3],
        };
        assert!(matches!(
            WaveformExtractor::demultiplex(&group),
            Err(RecordError::UnexpectedFault(_))
        ));
    }

    #[test]
    fn test_channel_without_source_is_a_fault() {
        let extracted = ExtractedWaveform {
            kind: WaveformKind::Rhythm,
            sampling_frequency: 500.0,
            channels: vec![vec![0.0]],
            sources: vec![None],
            settings: ChannelSettings::default(),
        };
        assert!(matches!(extracted.lead_map(), Err(RecordError::UnexpectedFault(_))));
    }
}
