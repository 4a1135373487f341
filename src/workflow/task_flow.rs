//! 文件处理流程 - 流程层
//!
//! 核心职责：定义"一个文件"的完整处理流程
//!
//! 流程顺序：
//! 1. 提取文本（失败即终止，不重试）
//! 2. 调用生成后端（0 个模型也算成功）
//! 3. 逐个候选模型做相似度标注
//!
//! 任何错误都在这里转换为 `Outcome::Failure`，不会向上传播。

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::infrastructure::{ModelGenerator, TextExtractor};
use crate::models::{FileTask, GeneratedModel, GenerationSettings, Outcome};
use crate::services::{RunCorpus, SimilarityDedup};
use crate::utils::truncate_text;
use crate::workflow::task_ctx::TaskCtx;

/// 文件处理流程
///
/// - 编排提取 → 生成 → 标注
/// - 不持有运行状态，只依赖协作者
/// - 每次调用恰好产生一个结果
pub struct TaskFlow {
    extractor: Arc<dyn TextExtractor>,
    generator: Arc<dyn ModelGenerator>,
    dedup: SimilarityDedup,
    settings: GenerationSettings,
    verbose_logging: bool,
}

impl TaskFlow {
    /// 创建新的文件处理流程
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn ModelGenerator>,
        dedup: SimilarityDedup,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            extractor,
            generator,
            dedup,
            settings,
            verbose_logging: false,
        }
    }

    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub async fn run(&self, task: &FileTask, ctx: &TaskCtx, corpus: &RunCorpus) -> Outcome {
        let started = Instant::now();
        info!("{} 开始处理 ({} 字节)", ctx, task.size_bytes);

        // ========== 步骤 1: 提取文本 ==========
        let text = match self.extractor.extract(task).await {
            Ok(text) => text,
            Err(e) => {
                error!("{} ❌ 文本提取失败: {:#}", ctx, e);
                return Outcome::failure(format!("{:#}", e));
            }
        };

        if self.verbose_logging {
            info!("{} 文本预览: {}", ctx, truncate_text(&text, 80));
        }

        // ========== 步骤 2: 生成候选模型 ==========
        info!("{} 🤖 正在生成模型...", ctx);
        let candidates = match self.generator.generate(&text, &self.settings).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("{} ❌ 生成失败: {:#}", ctx, e);
                return Outcome::failure(format!("{:#}", e));
            }
        };
        let duration_seconds = started.elapsed().as_secs_f64();

        if candidates.is_empty() {
            warn!("{} ⚠️ 生成后端没有返回模型", ctx);
        }

        // ========== 步骤 3: 相似度标注 ==========
        let mut run_so_far = corpus.run_snapshot();
        let mut models: Vec<GeneratedModel> = Vec::with_capacity(candidates.len());

        for (k, candidate) in candidates.into_iter().enumerate() {
            let id = format!("gen-{}-{}", ctx.file_number, k + 1);
            let model = GeneratedModel::from_candidate(id, candidate, &task.display_name);
            let model = self
                .dedup
                .annotate(model, corpus.library(), &run_so_far)
                .await;

            if let Some(info) = &model.similarity_info {
                info!(
                    "{} ⚠️ 《{}》与《{}》相似度 {}%",
                    ctx,
                    model.title,
                    info.similar_model.title,
                    info.percent()
                );
            }

            // 同一文件内后生成的模型也要和前面的比较
            run_so_far.push(model.to_corpus_entry());
            models.push(model);
        }

        info!(
            "{} ✓ 完成，生成 {} 个模型，耗时 {:.1}s",
            ctx,
            models.len(),
            duration_seconds
        );

        Outcome::Success {
            models_produced: models,
            duration_seconds,
        }
    }
}
