//! 采样率归一化
//!
//! 使用频域重采样将节律波形统一为 500 Hz / 5000 点，中位心搏统一为 600 点。

use ecg_core::LeadMap;
use num_complex::Complex;
use rustfft::FftPlanner;
use tracing::debug;

/// 目标采样频率 (Hz)
pub const TARGET_FREQUENCY: f64 = 500.0;
/// 节律波形目标长度
pub const RHYTHM_SAMPLES: usize = 5000;
/// 中位心搏目标长度
pub const MEDIAN_BEAT_SAMPLES: usize = 600;

/// 归一化结果
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// 输出波形对应的采样频率
    pub sampling_frequency: f64,
    pub rhythm: LeadMap,
    pub median_beat: Option<LeadMap>,
}

/// 重采样器
#[derive(Debug, Clone, PartialEq)]
pub struct Resampler {
    enabled: bool,
    target_frequency: f64,
    rhythm_samples: usize,
    median_samples: usize,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Resampler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            target_frequency: TARGET_FREQUENCY,
            rhythm_samples: RHYTHM_SAMPLES,
            median_samples: MEDIAN_BEAT_SAMPLES,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn target_frequency(&self) -> f64 {
        self.target_frequency
    }

    /// 归一化节律和中位心搏波形
    ///
    /// 以下情况保持原样并返回原始频率：
    /// - 未启用重采样
    /// - 节律映射为空
    /// - 原始频率整数部分已等于目标频率
    pub fn normalize(
        &self,
        original_frequency: f64,
        rhythm: LeadMap,
        median_beat: Option<LeadMap>,
    ) -> Normalized {
        let unchanged = !self.enabled
            || rhythm.is_empty()
            || original_frequency.trunc() == self.target_frequency.trunc();

        if unchanged {
            return Normalized {
                sampling_frequency: original_frequency,
                rhythm,
                median_beat,
            };
        }

        debug!(
            "重采样: {} Hz -> {} Hz, 节律 {} -> {} 点",
            original_frequency,
            self.target_frequency,
            rhythm.sample_count(),
            self.rhythm_samples
        );

        let mut planner = FftPlanner::new();
        let rhythm =
            rhythm.map_samples(|samples| resample_with(&mut planner, samples, self.rhythm_samples));
        let median_beat = median_beat.map(|median| {
            median.map_samples(|samples| resample_with(&mut planner, samples, self.median_samples))
        });

        Normalized {
            sampling_frequency: self.target_frequency,
            rhythm,
            median_beat,
        }
    }
}

/// 频域重采样到指定点数
///
/// 假定信号是周期的：在频域截断或补零后做逆变换，再按长度比例缩放。
/// 空序列原样返回。
pub fn fourier_resample(samples: &[f64], target_len: usize) -> Vec<f64> {
    let mut planner = FftPlanner::new();
    resample_with(&mut planner, samples, target_len)
}

fn resample_with(planner: &mut FftPlanner<f64>, samples: &[f64], target_len: usize) -> Vec<f64> {
    let input_len = samples.len();
    if input_len == 0 {
        return Vec::new();
    }
    if input_len == target_len {
        return samples.to_vec();
    }

    let mut spectrum: Vec<Complex<f64>> = samples.iter().map(|&v| Complex::new(v, 0.0)).collect();
    planner.plan_fft_forward(input_len).process(&mut spectrum);

    // 保留两者中较短长度的频率分量
    let n = input_len.min(target_len);
    let nyquist = n / 2 + 1;
    let mut output = vec![Complex::new(0.0, 0.0); target_len];
    output[..nyquist].copy_from_slice(&spectrum[..nyquist]);
    if n > 2 {
        let negative = n - nyquist;
        output[target_len - negative..].copy_from_slice(&spectrum[input_len - negative..]);
    }

    // 偶数长度时奈奎斯特分量需要拆分或合并
    if n % 2 == 0 {
        let half = n / 2;
        if target_len < input_len {
            output[target_len - half] += spectrum[input_len - half];
        } else {
            output[half] = output[half].scale(0.5);
            output[target_len - half] = output[half];
        }
    }

    planner.plan_fft_inverse(target_len).process(&mut output);

    // 逆变换未归一化：除以 target_len，再乘以 target_len / input_len
    let scale = 1.0 / input_len as f64;
    output.iter().map(|c| c.re * scale).collect()
}
