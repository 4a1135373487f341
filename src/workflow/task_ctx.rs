//! 文件处理上下文
//!
//! 封装"我正在处理第几批的第几个文件"这一信息

use std::fmt::Display;

use crate::models::FileTask;

/// 文件处理上下文
#[derive(Debug, Clone)]
pub struct TaskCtx {
    /// 文件编号（从1开始，仅用于日志显示）
    pub file_number: usize,

    /// 所属批次（从1开始）
    pub batch_number: usize,

    /// 批内偏移（从0开始）
    pub batch_offset: usize,

    /// 文件显示名称
    pub display_name: String,
}

impl TaskCtx {
    /// 创建新的文件上下文
    pub fn new(task: &FileTask, batch_size: usize) -> Self {
        Self {
            file_number: task.index + 1,
            batch_number: task.batch_number(batch_size),
            batch_offset: task.index % batch_size.max(1),
            display_name: task.display_name.clone(),
        }
    }
}

impl Display for TaskCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文件 {} 批次#{} {}]",
            self.file_number, self.batch_number, self.display_name
        )
    }
}
