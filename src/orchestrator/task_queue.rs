//! 任务队列
//!
//! 构造后只读；批次按需从顺序中切片，不单独保存

use crate::config::SchedulerConfig;
use crate::error::{AppResult, ValidationError};
use crate::models::FileTask;

/// 待处理文件队列
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tasks: Vec<FileTask>,
    batch_size: usize,
}

impl TaskQueue {
    /// 校验并按提交顺序重新编号
    pub fn new(files: Vec<FileTask>, config: &SchedulerConfig) -> AppResult<Self> {
        if config.batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize.into());
        }
        if files.is_empty() {
            return Err(ValidationError::EmptyFileSet.into());
        }
        if files.len() > config.max_files {
            return Err(ValidationError::TooManyFiles {
                count: files.len(),
                max: config.max_files,
            }
            .into());
        }

        let tasks = files
            .into_iter()
            .enumerate()
            .map(|(index, mut task)| {
                task.index = index;
                task
            })
            .collect();

        Ok(Self {
            tasks,
            batch_size: config.batch_size,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn tasks(&self) -> &[FileTask] {
        &self.tasks
    }

    /// ⌈n / batch_size⌉
    pub fn total_batches(&self) -> usize {
        self.tasks.len().div_ceil(self.batch_size)
    }

    /// 第 `batch_number` 批（从 1 开始）
    pub fn batch(&self, batch_number: usize) -> Option<&[FileTask]> {
        if batch_number == 0 {
            return None;
        }
        let start = (batch_number - 1) * self.batch_size;
        if start >= self.tasks.len() {
            return None;
        }
        let end = (start + self.batch_size).min(self.tasks.len());
        Some(&self.tasks[start..end])
    }

    /// 按顺序遍历 (批次编号, 批次)
    pub fn batches(&self) -> impl Iterator<Item = (usize, &[FileTask])> {
        self.tasks
            .chunks(self.batch_size)
            .enumerate()
            .map(|(i, chunk)| (i + 1, chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn files(n: usize) -> Vec<FileTask> {
        (0..n)
            .map(|i| FileTask::from_bytes(99, format!("f{}.txt", i), b"x".to_vec()))
            .collect()
    }

    #[test]
    fn test_batches_cover_all_tasks_in_order() {
        let config = SchedulerConfig::default().with_batch_size(3);
        for n in 1..=20 {
            let queue = TaskQueue::new(files(n), &config).unwrap();
            assert_eq!(queue.total_batches(), (n + 2) / 3);

            let flattened: Vec<usize> = queue
                .batches()
                .flat_map(|(_, batch)| batch.iter().map(|t| t.index))
                .collect();
            assert_eq!(flattened, (0..n).collect::<Vec<_>>());

            for (number, batch) in queue.batches() {
                assert!(batch.iter().all(|t| t.batch_number(3) == number));
                assert_eq!(queue.batch(number).unwrap().len(), batch.len());
            }
            assert!(queue.batch(queue.total_batches() + 1).is_none());
        }
    }

    #[test]
    fn test_validation_errors() {
        let config = SchedulerConfig::default().with_max_files(4);

        let err = TaskQueue::new(Vec::new(), &config).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyFileSet)));

        let err = TaskQueue::new(files(5), &config).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::TooManyFiles { count: 5, max: 4 })
        ));

        let err = TaskQueue::new(files(2), &config.clone().with_batch_size(0)).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidBatchSize)));
    }
}
