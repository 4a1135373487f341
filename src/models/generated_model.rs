use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 生成后端返回的候选模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateModel {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// 相似内容来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    /// 已保存的模型库
    Library,
    /// 本次运行中更早生成的模型
    CurrentRun,
}

/// 最相似模型的引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarModelRef {
    pub id: String,
    pub title: String,
    pub origin: MatchOrigin,
}

/// 相似度提示（仅供审阅参考）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityInfo {
    /// 0..=1
    pub similarity: f64,
    pub similar_model: SimilarModelRef,
}

impl SimilarityInfo {
    /// 百分比形式，便于展示
    pub fn percent(&self) -> u32 {
        (self.similarity * 100.0).round() as u32
    }
}

/// 本次运行生成的模型，提交前归运行所有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModel {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_info: Option<SimilarityInfo>,
}

impl GeneratedModel {
    /// 由候选模型构建，尚未做相似度标注
    pub fn from_candidate(id: String, candidate: CandidateModel, source_file: &str) -> Self {
        Self {
            id,
            title: candidate.title,
            content: candidate.content,
            category: candidate.category,
            keywords: candidate.keywords,
            source_file: source_file.to_string(),
            similarity_info: None,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.similarity_info.is_some()
    }

    /// 作为相似度比较语料
    pub fn to_corpus_entry(&self) -> CorpusEntry {
        CorpusEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            origin: MatchOrigin::CurrentRun,
        }
    }
}

/// 模型库中的已保存模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryModel {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LibraryModel {
    pub fn to_corpus_entry(&self) -> CorpusEntry {
        CorpusEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            origin: MatchOrigin::Library,
        }
    }
}

/// 提交后由模型库分配最终身份的模型
pub type PersistedModel = LibraryModel;

/// 相似度比较语料中的一项
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub origin: MatchOrigin,
}

impl CorpusEntry {
    pub fn to_ref(&self) -> SimilarModelRef {
        SimilarModelRef {
            id: self.id.clone(),
            title: self.title.clone(),
            origin: self.origin,
        }
    }
}
