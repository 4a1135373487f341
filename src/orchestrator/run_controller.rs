//! 运行控制器
//!
//! 持有取消令牌和运行状态，是唯一写入 `RunState` 的地方。
//! 状态机：`Idle -> Running -> {Completed | Cancelled}`
//!
//! 取消是协作式的：`cancel()` 只阻止新的批次/任务启动，
//! 已经开始的任务照常完成并记录结果，全部排空后才进入 `Cancelled`。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{AppResult, RunError};
use crate::models::{FileOutcome, ProgressEvent, RunProgress, RunState, RunStatus};

struct ControllerInner {
    state: Mutex<RunState>,
    cancel: CancellationToken,
    progress_tx: Option<UnboundedSender<ProgressEvent>>,
}

/// 运行控制器，可廉价克隆并在任务间共享
#[derive(Clone)]
pub struct RunController {
    inner: Arc<ControllerInner>,
}

impl RunController {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// 附带进度事件通道
    pub fn with_progress_sink(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self::build(Some(tx))
    }

    fn build(progress_tx: Option<UnboundedSender<ProgressEvent>>) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                state: Mutex::new(RunState::new()),
                cancel: CancellationToken::new(),
                progress_tx,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RunState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 请求取消
    ///
    /// 幂等；只在 `Running` 时生效，`Idle` 和终态下什么也不做
    pub fn cancel(&self) {
        let state = self.state();
        if state.status != RunStatus::Running {
            return;
        }
        if !self.inner.cancel.is_cancelled() {
            info!("🛑 收到取消请求，不再启动新的任务");
            self.inner.cancel.cancel();
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn status(&self) -> RunStatus {
        self.state().status
    }

    pub fn progress(&self) -> RunProgress {
        self.state().progress()
    }

    /// 运行结束后的最终状态，运行中返回 `None`
    pub fn result(&self) -> Option<RunState> {
        let state = self.state();
        state.status.is_terminal().then(|| state.clone())
    }

    /// `Idle -> Running`
    pub fn begin(&self, total_count: usize, total_batches: usize) -> AppResult<()> {
        let mut state = self.state();
        if state.status != RunStatus::Idle {
            return Err(RunError::AlreadyStarted {
                state: state.status.as_str(),
            }
            .into());
        }
        state.status = RunStatus::Running;
        state.total_count = total_count;
        state.total_batches = total_batches;
        state.current_batch = 0;
        Ok(())
    }

    pub fn enter_batch(&self, batch_number: usize) {
        self.state().current_batch = batch_number;
    }

    /// 记录一个文件的结果并推送进度事件
    ///
    /// 同一文件重复记录、或结果数已达总数时忽略，返回 `false`
    pub fn record(&self, file_outcome: FileOutcome) -> bool {
        let mut state = self.state();
        if state.status != RunStatus::Running {
            warn!("运行不在进行中，忽略结果: {}", file_outcome.file_name);
            return false;
        }
        if state.outcomes.len() >= state.total_count
            || state
                .outcomes
                .iter()
                .any(|o| o.file_index == file_outcome.file_index)
        {
            warn!("重复的结果，已忽略: {}", file_outcome.file_name);
            return false;
        }

        state
            .models
            .extend(file_outcome.outcome.models().iter().cloned());
        state.outcomes.push(file_outcome.clone());

        let event = ProgressEvent {
            processed_count: state.outcomes.len(),
            total_count: state.total_count,
            current_batch: state.current_batch,
            total_batches: state.total_batches,
            last_outcome: Some(file_outcome),
            status: state.status,
        };
        self.emit(event);
        true
    }

    /// 运行排空后进入终态，返回最终状态
    pub fn finish(&self) -> RunState {
        let mut state = self.state();
        if state.status == RunStatus::Running {
            state.status = if self.inner.cancel.is_cancelled() {
                RunStatus::Cancelled
            } else {
                RunStatus::Completed
            };

            let progress = state.progress();
            self.emit(ProgressEvent {
                processed_count: progress.processed_count,
                total_count: progress.total_count,
                current_batch: progress.current_batch,
                total_batches: progress.total_batches,
                last_outcome: None,
                status: state.status,
            });
        }
        state.clone()
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.inner.progress_tx {
            // 接收端已关闭时直接丢弃
            let _ = tx.send(event);
        }
    }
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}
