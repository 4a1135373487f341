//! 批次调度器 - 编排层
//!
//! ## 职责
//!
//! 把文件队列切成固定大小的批次，逐批并发处理。
//!
//! ## 核心功能
//!
//! 1. **运行前校验**：空列表、超出上限、批次大小为 0 直接拒绝
//! 2. **批内并发**：每个文件一个 `tokio::spawn` 任务
//! 3. **错峰启动**：批内第 i 个任务在批次开始后 `i * stagger` 启动
//! 4. **批间冷却**：一批全部结束后固定等待，再开始下一批
//! 5. **协作取消**：每批开始前、每个错峰启动前检查取消令牌
//!
//! 批次只是限流边界，不是正确性边界：单个文件失败不影响同批其他文件。

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::AppResult;
use crate::models::{FileOutcome, FileTask, LibraryModel, Outcome, RunState};
use crate::orchestrator::run_controller::RunController;
use crate::orchestrator::task_queue::TaskQueue;
use crate::services::RunCorpus;
use crate::utils::logging::{log_batch_complete, log_batch_start, log_files_loaded};
use crate::workflow::{TaskCtx, TaskFlow};

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}

/// 批次调度器
pub struct BatchScheduler {
    config: SchedulerConfig,
    flow: Arc<TaskFlow>,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig, flow: TaskFlow) -> Self {
        Self {
            config,
            flow: Arc::new(flow),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 处理所有文件，返回终态的 `RunState`
    ///
    /// 校验失败时返回错误，此时运行不会开始，控制器保持 `Idle`
    pub async fn run(
        &self,
        files: Vec<FileTask>,
        library: &[LibraryModel],
        controller: &RunController,
    ) -> AppResult<RunState> {
        let queue = TaskQueue::new(files, &self.config)?;
        let total_files = queue.len();
        let total_batches = queue.total_batches();

        controller.begin(total_files, total_batches)?;
        log_files_loaded(total_files, queue.batch_size(), total_batches);

        let corpus = RunCorpus::new(library);
        let token = controller.cancellation_token();

        for (batch_number, batch) in queue.batches() {
            if token.is_cancelled() {
                warn!(
                    "🛑 运行已取消，第 {}-{} 批不再启动",
                    batch_number, total_batches
                );
                break;
            }

            controller.enter_batch(batch_number);
            let first = batch.first().map(|t| t.index + 1).unwrap_or_default();
            let last = batch.last().map(|t| t.index + 1).unwrap_or_default();
            log_batch_start(batch_number, total_batches, first, last, total_files);

            // 处理本批
            let result = self.process_batch(batch, &corpus, controller).await;
            log_batch_complete(batch_number, result.success, result.success + result.failed);

            // 批间冷却，最后一批之后不需要
            if batch_number < total_batches && !token.is_cancelled() {
                info!("⏳ 冷却 {}ms 后开始下一批", self.config.cooldown.as_millis());
                tokio::select! {
                    _ = sleep(self.config.cooldown) => {}
                    _ = token.cancelled() => {}
                }
            }
        }

        Ok(controller.finish())
    }

    /// 处理单个批次，等待本批已启动的所有任务结束
    async fn process_batch(
        &self,
        batch: &[FileTask],
        corpus: &RunCorpus,
        controller: &RunController,
    ) -> BatchResult {
        let token = controller.cancellation_token();
        let batch_started = Instant::now();
        let mut batch_handles = Vec::with_capacity(batch.len());

        // 为本批创建并发任务
        for (offset, task) in batch.iter().enumerate() {
            if offset > 0 && !self.config.stagger_delay.is_zero() {
                let start_at = stagger_deadline(batch_started, self.config.stagger_delay, offset);
                tokio::select! {
                    _ = sleep_until(start_at) => {}
                    _ = token.cancelled() => {}
                }
            }
            if token.is_cancelled() {
                warn!(
                    "🛑 运行已取消，本批剩余 {} 个文件不再启动",
                    batch.len() - offset
                );
                break;
            }

            let flow = Arc::clone(&self.flow);
            let job = task.clone();
            let ctx = TaskCtx::new(task, self.config.batch_size);
            let corpus = corpus.clone();
            let recorder = controller.clone();

            let handle = tokio::spawn(async move {
                let outcome = flow.run(&job, &ctx, &corpus).await;
                let success = outcome.is_success();
                // 先进入语料，后续任务才能比较到这些模型
                corpus.record(outcome.models());
                recorder.record(FileOutcome {
                    file_index: job.index,
                    file_name: job.display_name,
                    outcome,
                });
                success
            });
            batch_handles.push(((task.index, task.display_name.clone()), handle));
        }

        // 等待本批所有任务完成
        let (labels, handles): (Vec<_>, Vec<_>) = batch_handles.into_iter().unzip();
        let joined = join_all(handles).await;
        let mut result = BatchResult::default();

        for ((file_index, file_name), joined) in labels.into_iter().zip(joined) {
            match joined {
                Ok(true) => result.success += 1,
                Ok(false) => result.failed += 1,
                Err(e) => {
                    // 任务 panic 也要落成一个失败结果
                    error!("[文件 {}] 任务执行失败: {}", file_index + 1, e);
                    controller.record(FileOutcome {
                        file_index,
                        file_name,
                        outcome: Outcome::failure(format!("任务异常退出: {}", e)),
                    });
                    result.failed += 1;
                }
            }
        }

        result
    }
}

/// 批内第 `offset` 个任务的启动时刻，溢出时退化为很远的将来
fn stagger_deadline(batch_started: Instant, stagger: Duration, offset: usize) -> Instant {
    let offset = u32::try_from(offset).unwrap_or(u32::MAX);
    stagger
        .checked_mul(offset)
        .and_then(|delay| batch_started.checked_add(delay))
        .unwrap_or_else(|| batch_started + FAR_FUTURE)
}

const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);
