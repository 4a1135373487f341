//! 基础设施层（Infrastructure Layer）
//!
//! 定义流水线依赖的外部协作者接口，并提供默认实现。
//! 上层只依赖 trait，测试中可替换为内存实现。
//!
//! - `TextExtractor` - 从文件中提取纯文本
//! - `ModelGenerator` - 调用生成后端，把文本变成候选模型（实现见 `services::LlmService`）
//! - `SimilarityComparator` - 文本相似度，结果必须是确定的
//! - `LibraryStore` - 模型库的读取与提交

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    CandidateModel, CorpusEntry, FileTask, GeneratedModel, GenerationSettings, LibraryModel,
    PersistedModel,
};

pub mod library_store;
pub mod text_extractor;
pub mod token_similarity;

pub use library_store::{InMemoryLibraryStore, JsonLibraryStore};
pub use text_extractor::PlainTextExtractor;
pub use token_similarity::TokenSimilarity;

/// 文本提取，需要支持对不同文件并发调用
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, file: &FileTask) -> Result<String>;
}

/// 生成后端，不做隐式重试
#[async_trait]
pub trait ModelGenerator: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        settings: &GenerationSettings,
    ) -> Result<Vec<CandidateModel>>;
}

/// 相似度比较器，返回 0..=1 的分数
#[async_trait]
pub trait SimilarityComparator: Send + Sync {
    async fn similarity(&self, content_a: &str, content_b: &str) -> Result<f64>;

    /// 批量比较，返回 (id, 分数)
    async fn search_by_similarity(
        &self,
        content: &str,
        corpus: &[CorpusEntry],
    ) -> Result<Vec<(String, f64)>> {
        let mut hits = Vec::with_capacity(corpus.len());
        for entry in corpus {
            let score = self.similarity(content, &entry.content).await?;
            hits.push((entry.id.clone(), score));
        }
        Ok(hits)
    }
}

/// 模型库
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// 用于错误信息的位置描述
    fn location(&self) -> String {
        "内存模型库".to_string()
    }

    /// 当前已保存的模型
    async fn list(&self) -> Result<Vec<LibraryModel>>;

    /// 一次性保存，由模型库分配最终 id
    async fn persist(&self, models: Vec<GeneratedModel>) -> Result<Vec<PersistedModel>>;
}
