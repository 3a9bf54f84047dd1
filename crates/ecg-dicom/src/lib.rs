//! # DICOM ECG读取模块
//!
//! 从DICOM波形对象中读取头部元数据、多路复用波形和注释摘要。

pub mod annotations;
pub mod metadata;
pub mod parser;
pub mod source;
pub mod waveform;

pub use annotations::{summarize_annotations, NO_ANNOTATIONS};
pub use metadata::MetadataExtractor;
pub use parser::DicomRecording;
pub use source::{AnnotationItem, ChannelDefinition, MultiplexGroup, RecordingSource};
pub use waveform::{ExtractedWaveform, WaveformExtractor};
