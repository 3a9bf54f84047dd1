//! 已处理文件归档

use crate::scanner::ScannedFile;
use ecg_core::{ConverterError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 将已处理的输入文件移动到归档目录，保留相对路径
#[derive(Debug, Clone)]
pub struct Archiver {
    archive_root: PathBuf,
}

impl Archiver {
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        Self {
            archive_root: archive_root.into(),
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// 归档单个文件，返回新路径
    pub fn archive(&self, file: &ScannedFile) -> Result<PathBuf> {
        let target = self.archive_root.join(&file.relative);
        let archive_error = |e: std::io::Error| {
            ConverterError::Archive(format!(
                "{} -> {}: {}",
                file.path.display(),
                target.display(),
                e
            ))
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(archive_error)?;
        }

        // 跨文件系统时 rename 会失败，改为复制后删除
        if fs::rename(&file.path, &target).is_err() {
            fs::copy(&file.path, &target).map_err(archive_error)?;
            fs::remove_file(&file.path).map_err(archive_error)?;
        }

        debug!("已归档: {} -> {}", file.path.display(), target.display());
        Ok(target)
    }
}
