//! 通用工具函数

/// 批次索引在文件名中的固定宽度
pub const BATCH_INDEX_WIDTH: usize = 6;

/// 补零后的批次索引，保证同一次运行中所有文件名按字典序对齐
pub fn pad_batch_index(index: usize) -> String {
    format!("{:0width$}", index, width = BATCH_INDEX_WIDTH)
}

/// 生成批次文件名标记 `<start>_<end>`
pub fn batch_token(start: usize, end: usize) -> String {
    format!("{}_{}", pad_batch_index(start), pad_batch_index(end))
}
