//! 测试用的协作者替身
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use bulk_model_generate::infrastructure::{
    ModelGenerator, SimilarityComparator, TextExtractor, TokenSimilarity,
};
use bulk_model_generate::models::{
    CandidateModel, FileHandle, FileTask, GenerationSettings,
};
use bulk_model_generate::services::SimilarityDedup;
use bulk_model_generate::workflow::TaskFlow;

/// 内存文件，内容即文本
pub fn text_file(name: &str, text: &str) -> FileTask {
    FileTask::from_bytes(0, name, text.as_bytes().to_vec())
}

/// `f1.txt` .. `fN.txt`，内容为 `文档 N`
pub fn numbered_files(n: usize) -> Vec<FileTask> {
    (1..=n)
        .map(|i| text_file(&format!("f{}.txt", i), &format!("文档 {}", i)))
        .collect()
}

/// 对指定文件名返回错误的提取器
#[derive(Default)]
pub struct ScriptedExtractor {
    failing: HashSet<String>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    async fn extract(&self, file: &FileTask) -> Result<String> {
        if self.failing.contains(&file.display_name) {
            bail!("无法读取文件: {}", file.display_name);
        }
        match &file.handle {
            FileHandle::Bytes(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            FileHandle::Path(path) => bail!("测试中不读取磁盘文件: {}", path.display()),
        }
    }
}

/// 一次生成调用的记录
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub text: String,
    pub started: Instant,
    pub finished: Instant,
}

/// 每段文本生成一个模型，内容即文本
///
/// 支持固定延迟、按文本返回错误或直接 panic
#[derive(Default)]
pub struct ScriptedGenerator {
    delay: Duration,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    extra: HashMap<String, Vec<CandidateModel>>,
    calls: Mutex<Vec<CallRecord>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn panicking_on(mut self, text: &str) -> Self {
        self.panicking.insert(text.to_string());
        self
    }

    /// 为某段文本指定返回的模型，替代默认的单个模型
    pub fn returning(mut self, text: &str, models: Vec<CandidateModel>) -> Self {
        self.extra.insert(text.to_string(), models);
        self
    }

    /// 按开始时间排序的调用记录
    pub fn calls(&self) -> Vec<CallRecord> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort_by_key(|c| c.started);
        calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        text: &str,
        _settings: &GenerationSettings,
    ) -> Result<Vec<CandidateModel>> {
        let started = Instant::now();
        if self.panicking.contains(text) {
            panic!("generator crashed on {}", text);
        }
        sleep(self.delay).await;
        self.calls.lock().unwrap().push(CallRecord {
            text: text.to_string(),
            started,
            finished: Instant::now(),
        });

        if self.failing.contains(text) {
            bail!("429 Too Many Requests");
        }
        if let Some(models) = self.extra.get(text) {
            return Ok(models.clone());
        }
        Ok(vec![candidate(&format!("{} 模型", text), text)])
    }
}

pub fn candidate(title: &str, content: &str) -> CandidateModel {
    CandidateModel {
        title: title.to_string(),
        content: content.to_string(),
        category: "测试".to_string(),
        keywords: vec![],
    }
}

/// 按 (候选内容, 语料内容) 返回固定分数，未配置时为 0
#[derive(Default)]
pub struct FixedComparator {
    scores: HashMap<(String, String), f64>,
}

impl FixedComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, candidate: &str, existing: &str, score: f64) -> Self {
        self.scores
            .insert((candidate.to_string(), existing.to_string()), score);
        self
    }
}

#[async_trait]
impl SimilarityComparator for FixedComparator {
    async fn similarity(&self, content_a: &str, content_b: &str) -> Result<f64> {
        Ok(self
            .scores
            .get(&(content_a.to_string(), content_b.to_string()))
            .copied()
            .unwrap_or(0.0))
    }
}

/// 组装一个处理流程，阈值 0.60
pub fn flow(
    extractor: Arc<dyn TextExtractor>,
    generator: Arc<dyn ModelGenerator>,
    comparator: Arc<dyn SimilarityComparator>,
) -> TaskFlow {
    TaskFlow::new(
        extractor,
        generator,
        SimilarityDedup::new(comparator, 0.60),
        GenerationSettings::default(),
    )
}

/// 使用真实相似度比较器的默认流程
pub fn default_flow(generator: Arc<ScriptedGenerator>) -> TaskFlow {
    flow(
        Arc::new(ScriptedExtractor::new()),
        generator,
        Arc::new(TokenSimilarity::new()),
    )
}
