//! # ECG信号处理模块
//!
//! 提供肢体导联推导和采样率归一化。

pub mod leads;
pub mod resample;

pub use leads::LeadDeriver;
pub use resample::{
    fourier_resample, Normalized, Resampler, MEDIAN_BEAT_SAMPLES, RHYTHM_SAMPLES, TARGET_FREQUENCY,
};
