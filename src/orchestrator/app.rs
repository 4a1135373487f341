//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、组装协作者
//! 2. **批量加载**：扫描输入目录，加载已有模型库
//! 3. **运行**：交给 `BatchScheduler`，Ctrl-C 映射为取消
//! 4. **审阅**：输出模型、相似度提示和文件错误，按配置提交或丢弃
//!
//! 只做组装和调度，不处理单个文件的细节。

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ValidationError};
use crate::infrastructure::{JsonLibraryStore, LibraryStore, PlainTextExtractor, TokenSimilarity};
use crate::models::{self, FileTask, Outcome, ProgressEvent};
use crate::orchestrator::batch_scheduler::BatchScheduler;
use crate::orchestrator::review::ReviewSession;
use crate::orchestrator::run_controller::RunController;
use crate::services::{LlmService, SimilarityDedup};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::utils::truncate_text;
use crate::workflow::TaskFlow;

/// 应用主结构
pub struct App {
    config: Config,
    scheduler: BatchScheduler,
    store: Arc<dyn LibraryStore>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(config.batch_size, config.stagger_delay_ms);

        let settings = models::resolve_generation_settings(&config).await?;
        info!(
            "🤖 生成后端: {} / {}",
            settings.provider, settings.model_name
        );

        let extractor = Arc::new(PlainTextExtractor::new()?);
        let generator = Arc::new(LlmService::new(&config)?);
        let dedup = SimilarityDedup::new(
            Arc::new(TokenSimilarity::new()),
            config.similarity_threshold,
        );
        let flow = TaskFlow::new(extractor, generator, dedup, settings)
            .with_verbose_logging(config.verbose_logging);
        let scheduler = BatchScheduler::new(config.scheduler_config(), flow);
        let store = Arc::new(JsonLibraryStore::new(&config.library_file));

        Ok(Self::from_parts(config, scheduler, store))
    }

    /// 使用现成的调度器和模型库组装
    pub fn from_parts(
        config: Config,
        scheduler: BatchScheduler,
        store: Arc<dyn LibraryStore>,
    ) -> Self {
        Self {
            config,
            scheduler,
            store,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let files = self.load_files().await?;

        if files.is_empty() {
            warn!("⚠️ 没有找到待处理的文件: {}", self.config.input_folder);
            return Err(AppError::from(ValidationError::EmptyFileSet).into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let controller = RunController::with_progress_sink(tx);

        // Ctrl-C 只请求取消，已开始的文件照常完成
        let watcher = {
            let controller = controller.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到 Ctrl-C");
                    controller.cancel();
                }
            })
        };
        let reporter = tokio::spawn(report_progress(rx));

        let result = self.process_files(files, &controller).await;
        watcher.abort();

        match result {
            Ok(_) => {
                let _ = reporter.await;
                Ok(())
            }
            Err(e) => {
                reporter.abort();
                error!("❌ 运行失败: {}", e);
                Err(e.into())
            }
        }
    }

    /// 处理一组文件并完成审阅，返回结束后的审阅会话
    pub async fn process_files(
        &self,
        files: Vec<FileTask>,
        controller: &RunController,
    ) -> AppResult<ReviewSession> {
        let library = self
            .store
            .list()
            .await
            .map_err(|e| {
                AppError::store_load_failed(self.store.location(), format!("{:#}", e))
            })?;
        info!("📚 模型库中已有 {} 个模型", library.len());

        let state = self.scheduler.run(files, &library, controller).await?;
        print_final_stats(&state.summary(), &self.config.output_log_file);

        let mut review = ReviewSession::from_run(state)?;
        log_review(&review);

        if self.config.auto_commit {
            review.commit(self.store.as_ref()).await?;
        } else {
            let dropped = review.discard_all()?;
            info!(
                "💡 未开启 AUTO_COMMIT，已丢弃 {} 个模型（设置 AUTO_COMMIT=true 保存）",
                dropped
            );
        }

        Ok(review)
    }

    /// 加载待处理文件
    async fn load_files(&self) -> Result<Vec<FileTask>> {
        info!("\n📁 正在扫描待处理的文件...");
        models::load_all_files(&self.config.input_folder).await
    }
}

/// 把进度事件打印为日志，收到终态事件后结束
async fn report_progress(mut rx: UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some(last) = &event.last_outcome {
            let mark = match &last.outcome {
                Outcome::Success { .. } => "✅",
                Outcome::Failure { .. } => "❌",
            };
            info!(
                "{} 进度 {}/{} (第 {}/{} 批) {}",
                mark,
                event.processed_count,
                event.total_count,
                event.current_batch,
                event.total_batches,
                last.file_name
            );
        }
        if event.is_terminal() {
            info!("🏁 运行结束: {}", event.status);
            break;
        }
    }
}

fn log_review(review: &ReviewSession) {
    info!("\n{}", "=".repeat(60));
    info!("📝 待审阅模型: {} 个", review.models().len());
    for model in review.models() {
        match &model.similarity_info {
            Some(info) => info!(
                "  ⚠️ [{}] 《{}》 来自 {}，与《{}》相似度 {}%",
                model.id,
                model.title,
                model.source_file,
                info.similar_model.title,
                info.percent()
            ),
            None => info!(
                "  • [{}] 《{}》 来自 {}",
                model.id, model.title, model.source_file
            ),
        }
    }

    if !review.failures().is_empty() {
        info!("❌ 处理失败的文件: {} 个", review.failures().len());
        for failure in review.failures() {
            info!(
                "  • {}: {}",
                failure.file_name,
                truncate_text(&failure.reason, 120)
            );
        }
    }
    info!("{}", "=".repeat(60));
}
