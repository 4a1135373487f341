//! 相似度去重服务 - 业务能力层
//!
//! 把新生成的模型与模型库、以及本次运行中更早生成的模型比较，
//! 最高分严格大于阈值时附加 `SimilarityInfo`。结果只是提示，
//! 比较失败时记录警告并放行，不影响生成和提交。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tracing::{debug, warn};

use crate::infrastructure::SimilarityComparator;
use crate::models::{CorpusEntry, GeneratedModel, LibraryModel, SimilarityInfo};

/// 默认提示阈值
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.60;

/// 本次运行的比较语料
///
/// 模型库部分在运行开始时固定；运行部分随结果记录不断追加。
#[derive(Clone, Default)]
pub struct RunCorpus {
    library: Arc<Vec<CorpusEntry>>,
    run: Arc<Mutex<Vec<CorpusEntry>>>,
}

impl RunCorpus {
    pub fn new(library: &[LibraryModel]) -> Self {
        Self {
            library: Arc::new(library.iter().map(LibraryModel::to_corpus_entry).collect()),
            run: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn library(&self) -> &[CorpusEntry] {
        &self.library
    }

    /// 当前已记录的本次运行模型
    pub fn run_snapshot(&self) -> Vec<CorpusEntry> {
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 追加一个文件的生成结果
    pub fn record(&self, models: &[GeneratedModel]) {
        if models.is_empty() {
            return;
        }
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(models.iter().map(GeneratedModel::to_corpus_entry));
    }
}

/// 相似度去重
pub struct SimilarityDedup {
    comparator: Arc<dyn SimilarityComparator>,
    threshold: f64,
}

impl SimilarityDedup {
    pub fn new(comparator: Arc<dyn SimilarityComparator>, threshold: f64) -> Self {
        Self {
            comparator,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// 为候选模型附加相似度提示
    ///
    /// 语料顺序为：模型库在前，本次运行在后。分数相同时取靠前的一项。
    pub async fn annotate(
        &self,
        mut candidate: GeneratedModel,
        library: &[CorpusEntry],
        run_so_far: &[CorpusEntry],
    ) -> GeneratedModel {
        let corpus: Vec<CorpusEntry> = library
            .iter()
            .chain(run_so_far.iter())
            .cloned()
            .collect();

        match self.best_match(&candidate.content, &corpus).await {
            Ok(Some(info)) => {
                debug!(
                    "模型 {} 与 {} 相似度 {:.2}",
                    candidate.title, info.similar_model.title, info.similarity
                );
                candidate.similarity_info = Some(info);
            }
            Ok(None) => {
                candidate.similarity_info = None;
            }
            Err(e) => {
                warn!("⚠️ 相似度比较失败，跳过标注 ({}): {:#}", candidate.title, e);
                candidate.similarity_info = None;
            }
        }
        candidate
    }

    /// 在语料中找最相似的一项，超过阈值才返回
    pub async fn best_match(
        &self,
        content: &str,
        corpus: &[CorpusEntry],
    ) -> Result<Option<SimilarityInfo>> {
        if corpus.is_empty() {
            return Ok(None);
        }

        let hits = self.comparator.search_by_similarity(content, corpus).await?;

        // id -> 语料中首次出现的位置
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (pos, entry) in corpus.iter().enumerate() {
            positions.entry(entry.id.as_str()).or_insert(pos);
        }

        let mut best: Option<(usize, f64)> = None;
        for (id, score) in hits {
            let Some(&pos) = positions.get(id.as_str()) else {
                warn!("相似度结果中出现未知 id: {}", id);
                continue;
            };
            if score.is_nan() {
                continue;
            }
            let score = score.clamp(0.0, 1.0);
            best = match best {
                Some((best_pos, best_score))
                    if best_score > score || (best_score == score && best_pos < pos) =>
                {
                    Some((best_pos, best_score))
                }
                _ => Some((pos, score)),
            };
        }

        Ok(best
            .filter(|(_, score)| *score > self.threshold)
            .map(|(pos, score)| SimilarityInfo {
                similarity: score,
                similar_model: corpus[pos].to_ref(),
            }))
    }
}
