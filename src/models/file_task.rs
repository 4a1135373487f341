use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 文件句柄
///
/// 可以是磁盘路径，也可以是上传后保存在内存中的字节
#[derive(Debug, Clone)]
pub enum FileHandle {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// 单个待处理文件
///
/// `index` 决定所属批次，由 `TaskQueue` 按提交顺序统一编号
#[derive(Debug, Clone)]
pub struct FileTask {
    /// 在本次提交中的位置（从 0 开始）
    pub index: usize,
    /// 显示名称，同时作为结果的键
    pub display_name: String,
    /// 文件大小（字节）
    pub size_bytes: u64,
    pub handle: FileHandle,
}

impl FileTask {
    /// 由磁盘路径创建
    pub fn from_path(index: usize, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self {
            index,
            display_name,
            size_bytes,
            handle: FileHandle::Path(path),
        }
    }

    /// 由内存中的字节创建
    pub fn from_bytes(
        index: usize,
        display_name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            index,
            display_name: display_name.into(),
            size_bytes: bytes.len() as u64,
            handle: FileHandle::Bytes(bytes),
        }
    }

    /// 所属批次编号（从 1 开始）
    pub fn batch_number(&self, batch_size: usize) -> usize {
        self.index / batch_size.max(1) + 1
    }

    /// 小写的扩展名
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.display_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

impl Display for FileTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} ({} 字节)", self.index + 1, self.display_name, self.size_bytes)
    }
}
