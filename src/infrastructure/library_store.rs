//! 模型库存储 - 基础设施层
//!
//! `JsonLibraryStore` 把模型库保存在单个 JSON 文件中；
//! `InMemoryLibraryStore` 用于嵌入调用和测试。

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::infrastructure::LibraryStore;
use crate::models::{GeneratedModel, LibraryModel, PersistedModel};

/// 为新模型分配模型库 id（`lib-N`，N 在已有最大值基础上递增）
fn assign_library_ids(
    existing: &[LibraryModel],
    models: Vec<GeneratedModel>,
) -> Vec<PersistedModel> {
    let mut next_id = existing
        .iter()
        .filter_map(|m| m.id.strip_prefix("lib-").and_then(|n| n.parse::<u64>().ok()))
        .max()
        .unwrap_or(0)
        + 1;
    let now = Utc::now();

    models
        .into_iter()
        .map(|model| {
            let persisted = LibraryModel {
                id: format!("lib-{}", next_id),
                title: model.title,
                content: model.content,
                category: model.category,
                keywords: model.keywords,
                source_file: Some(model.source_file),
                created_at: Some(now),
            };
            next_id += 1;
            persisted
        })
        .collect()
}

/// JSON 文件模型库
pub struct JsonLibraryStore {
    path: PathBuf,
    // 串行化读-改-写
    write_lock: Mutex<()>,
}

impl JsonLibraryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Vec<LibraryModel>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("模型库文件不存在，视为空库: {}", self.path.display());
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("无法读取模型库: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let models = serde_json::from_str(&content)
            .with_context(|| format!("无法解析模型库: {}", self.path.display()))?;
        Ok(models)
    }
}

#[async_trait]
impl LibraryStore for JsonLibraryStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn list(&self) -> Result<Vec<LibraryModel>> {
        self.read_all().await
    }

    async fn persist(&self, models: Vec<GeneratedModel>) -> Result<Vec<PersistedModel>> {
        let _guard = self.write_lock.lock().await;

        let mut library = self.read_all().await?;
        let persisted = assign_library_ids(&library, models);
        library.extend(persisted.iter().cloned());

        let json = serde_json::to_string_pretty(&library)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("无法写入模型库: {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("无法替换模型库: {}", self.path.display()))?;

        info!("✓ 已保存 {} 个模型到 {}", persisted.len(), self.path.display());
        Ok(persisted)
    }
}

/// 内存模型库
#[derive(Default)]
pub struct InMemoryLibraryStore {
    models: Mutex<Vec<LibraryModel>>,
    persist_calls: Mutex<Vec<Vec<String>>>,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(models: Vec<LibraryModel>) -> Self {
        Self {
            models: Mutex::new(models),
            persist_calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn models(&self) -> Vec<LibraryModel> {
        self.models.lock().await.clone()
    }

    /// 每次 persist 调用收到的生成模型 id
    pub async fn persist_calls(&self) -> Vec<Vec<String>> {
        self.persist_calls.lock().await.clone()
    }
}

#[async_trait]
impl LibraryStore for InMemoryLibraryStore {
    async fn list(&self) -> Result<Vec<LibraryModel>> {
        Ok(self.models.lock().await.clone())
    }

    async fn persist(&self, models: Vec<GeneratedModel>) -> Result<Vec<PersistedModel>> {
        self.persist_calls
            .lock()
            .await
            .push(models.iter().map(|m| m.id.clone()).collect());

        let mut library = self.models.lock().await;
        let persisted = assign_library_ids(&library, models);
        library.extend(persisted.iter().cloned());
        Ok(persisted)
    }
}
