//! 单个文件的处理结果以及整次运行的状态

use std::fmt::Display;

use serde::Serialize;

use crate::models::generated_model::GeneratedModel;

/// 单个文件的最终结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        models_produced: Vec<GeneratedModel>,
        duration_seconds: f64,
    },
    Failure {
        reason: String,
    },
}

impl Outcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Outcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn models(&self) -> &[GeneratedModel] {
        match self {
            Outcome::Success { models_produced, .. } => models_produced,
            Outcome::Failure { .. } => &[],
        }
    }
}

/// 以文件为键的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub file_index: usize,
    pub file_name: String,
    pub outcome: Outcome,
}

/// 审阅时展示的单个文件错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file_index: usize,
    pub file_name: String,
    pub reason: String,
}

/// 运行状态：`Idle -> Running -> {Completed | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Cancelled)
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 进度快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunProgress {
    pub processed_count: usize,
    pub total_count: usize,
    pub current_batch: usize,
    pub total_batches: usize,
}

/// 推送给展示层的进度事件
///
/// 每个文件完成时一条，运行结束时再推送一条终态事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub processed_count: usize,
    pub total_count: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    pub last_outcome: Option<FileOutcome>,
    pub status: RunStatus,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 一次运行的状态，运行结束后交给审阅阶段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub status: RunStatus,
    pub total_count: usize,
    pub total_batches: usize,
    pub current_batch: usize,
    /// 按完成顺序记录
    pub outcomes: Vec<FileOutcome>,
    /// 同一文件的模型连续出现
    pub models: Vec<GeneratedModel>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Idle,
            total_count: 0,
            total_batches: 0,
            current_batch: 0,
            outcomes: Vec::new(),
            models: Vec::new(),
        }
    }

    pub fn progress(&self) -> RunProgress {
        RunProgress {
            processed_count: self.outcomes.len(),
            total_count: self.total_count,
            current_batch: self.current_batch,
            total_batches: self.total_batches,
        }
    }

    /// 某个文件的结果
    pub fn outcome_for(&self, file_name: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.file_name == file_name)
            .map(|o| &o.outcome)
    }

    /// 所有失败文件，按文件顺序
    pub fn failures(&self) -> Vec<FileFailure> {
        let mut failures: Vec<FileFailure> = self
            .outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                Outcome::Failure { reason } => Some(FileFailure {
                    file_index: o.file_index,
                    file_name: o.file_name.clone(),
                    reason: reason.clone(),
                }),
                Outcome::Success { .. } => None,
            })
            .collect();
        failures.sort_by_key(|f| f.file_index);
        failures
    }

    pub fn summary(&self) -> RunSummary {
        let succeeded = self.outcomes.iter().filter(|o| o.outcome.is_success()).count();
        RunSummary {
            status: self.status,
            total: self.total_count,
            succeeded,
            failed: self.outcomes.len() - succeeded,
            models: self.models.len(),
            flagged: self.models.iter().filter(|m| m.is_flagged()).count(),
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub models: usize,
    pub flagged: usize,
}

impl RunSummary {
    /// 取消后未开始的文件数
    pub fn pending(&self) -> usize {
        self.total - self.succeeded - self.failed
    }
}
