//! 输入文件发现

use ecg_core::{ConverterError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// 扫描到的输入文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// 相对输入根目录的路径
    pub relative: PathBuf,
}

impl ScannedFile {
    /// 错误表中使用的文件名
    pub fn display_name(&self) -> String {
        self.relative.to_string_lossy().replace('\\', "/")
    }
}

/// 递归扫描输入根目录
///
/// 排除目录（如归档目录、输出目录）位于输入根目录下时整体跳过。
#[derive(Debug, Clone)]
pub struct InputScanner {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl InputScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded: Vec::new(),
        }
    }

    /// 添加排除目录
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 按路径排序返回所有普通文件
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.exists() {
            return Err(ConverterError::InputNotFound(self.root.display().to_string()));
        }
        if !self.root.is_dir() {
            return Err(ConverterError::NotADirectory(self.root.display().to_string()));
        }

        let root = self.root.canonicalize()?;
        // 尚不存在的排除目录不会出现在扫描结果中
        let excluded: Vec<PathBuf> = self
            .excluded
            .iter()
            .filter_map(|dir| dir.canonicalize().ok())
            .collect();

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_excluded(e, &excluded));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("跳过无法访问的路径: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            files.push(ScannedFile {
                path: entry.into_path(),
                relative,
            });
        }

        debug!("在 {} 中发现 {} 个输入文件", self.root.display(), files.len());
        Ok(files)
    }
}

/// 根目录本身从不排除
fn is_excluded(entry: &DirEntry, excluded: &[PathBuf]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && excluded.iter().any(|dir| entry.path() == dir)
}
