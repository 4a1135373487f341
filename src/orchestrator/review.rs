//! 审阅与提交
//!
//! 状态机：`Reviewing -> {Discarded | Committed}`
//!
//! - 只能从终态的 `RunState` 进入
//! - 移除单个模型不改变状态
//! - 全部丢弃、提交都是不可逆的
//! - 文件错误列表始终保留，不随模型的移除或丢弃消失

use std::collections::HashSet;

use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, ReviewError};
use crate::infrastructure::LibraryStore;
use crate::models::{FileFailure, GeneratedModel, PersistedModel, RunState, RunStatus};

/// 审阅状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Reviewing,
    Discarded,
    Committed,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Reviewing => "reviewing",
            ReviewState::Discarded => "discarded",
            ReviewState::Committed => "committed",
        }
    }
}

/// 一次运行结束后的审阅会话
#[derive(Debug)]
pub struct ReviewSession {
    state: ReviewState,
    run_status: RunStatus,
    models: Vec<GeneratedModel>,
    failures: Vec<FileFailure>,
    persisted: Vec<PersistedModel>,
}

impl ReviewSession {
    /// 接管终态运行的全部模型和错误
    pub fn from_run(run: RunState) -> AppResult<Self> {
        if !run.status.is_terminal() {
            return Err(ReviewError::RunNotFinished {
                state: run.status.as_str(),
            }
            .into());
        }

        let failures = run.failures();
        Ok(Self {
            state: ReviewState::Reviewing,
            run_status: run.status,
            models: run.models,
            failures,
            persisted: Vec::new(),
        })
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    /// 来源运行是正常完成还是被取消
    pub fn run_status(&self) -> RunStatus {
        self.run_status
    }

    /// 剩余的模型，保持生成顺序
    pub fn models(&self) -> &[GeneratedModel] {
        &self.models
    }

    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    /// 提交后模型库返回的结果
    pub fn persisted(&self) -> &[PersistedModel] {
        &self.persisted
    }

    fn ensure_reviewing(&self, operation: &'static str) -> AppResult<()> {
        if self.state != ReviewState::Reviewing {
            return Err(AppError::illegal_review(self.state.as_str(), operation));
        }
        Ok(())
    }

    /// 移除一个模型
    pub fn remove_model(&mut self, id: &str) -> AppResult<GeneratedModel> {
        self.ensure_reviewing("remove_model")?;

        let pos = self
            .models
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| ReviewError::ModelNotFound { id: id.to_string() })?;
        let removed = self.models.remove(pos);
        info!("🗑️ 已移除模型 {} 《{}》", removed.id, removed.title);
        Ok(removed)
    }

    /// 丢弃全部模型，返回丢弃的数量
    pub fn discard_all(&mut self) -> AppResult<usize> {
        self.ensure_reviewing("discard_all")?;

        let dropped = self.models.len();
        self.models.clear();
        self.state = ReviewState::Discarded;
        info!("🗑️ 已丢弃全部 {} 个模型", dropped);
        Ok(dropped)
    }

    /// 提交剩余的全部模型
    pub async fn commit(&mut self, store: &dyn LibraryStore) -> AppResult<&[PersistedModel]> {
        self.ensure_reviewing("commit")?;
        let selection = self.models.clone();
        self.persist(store, selection).await
    }

    /// 只提交选中的模型，顺序以审阅列表为准
    ///
    /// 未知 id 会被忽略并记录警告
    pub async fn commit_selection(
        &mut self,
        store: &dyn LibraryStore,
        ids: &[&str],
    ) -> AppResult<&[PersistedModel]> {
        self.ensure_reviewing("commit")?;

        let wanted: HashSet<&str> = ids.iter().copied().collect();
        for id in &wanted {
            if !self.models.iter().any(|m| m.id == *id) {
                warn!("⚠️ 选择中包含不存在的模型，已忽略: {}", id);
            }
        }

        let selection: Vec<GeneratedModel> = self
            .models
            .iter()
            .filter(|m| wanted.contains(m.id.as_str()))
            .cloned()
            .collect();
        self.persist(store, selection).await
    }

    async fn persist(
        &mut self,
        store: &dyn LibraryStore,
        selection: Vec<GeneratedModel>,
    ) -> AppResult<&[PersistedModel]> {
        let count = selection.len();
        if count == 0 {
            info!("没有需要保存的模型，仍然完成提交");
        }

        // 空列表也调用一次，失败时保持在审阅状态，可重试
        let persisted = store.persist(selection).await.map_err(|e| {
            error!("❌ 保存到模型库失败: {:#}", e);
            AppError::store_persist_failed(store.location(), format!("{:#}", e))
        })?;

        info!("✅ 已保存 {} 个模型到模型库", count);
        self.state = ReviewState::Committed;
        self.persisted = persisted;
        Ok(&self.persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryLibraryStore;
    use crate::models::{FileOutcome, Outcome};

    fn model(id: &str) -> GeneratedModel {
        GeneratedModel {
            id: id.to_string(),
            title: format!("标题 {}", id),
            content: format!("内容 {}", id),
            category: "合同".to_string(),
            keywords: vec![],
            source_file: "a.txt".to_string(),
            similarity_info: None,
        }
    }

    fn finished_run(models: Vec<GeneratedModel>) -> RunState {
        let mut run = RunState::new();
        run.status = RunStatus::Completed;
        run.total_count = 2;
        run.outcomes = vec![
            FileOutcome {
                file_index: 1,
                file_name: "b.txt".to_string(),
                outcome: Outcome::failure("无法读取"),
            },
            FileOutcome {
                file_index: 0,
                file_name: "a.txt".to_string(),
                outcome: Outcome::Success {
                    models_produced: models.clone(),
                    duration_seconds: 0.5,
                },
            },
        ];
        run.models = models;
        run
    }

    #[test]
    fn test_running_state_is_rejected() {
        let mut run = RunState::new();
        run.status = RunStatus::Running;
        let err = ReviewSession::from_run(run).unwrap_err();
        assert!(matches!(
            err,
            AppError::Review(ReviewError::RunNotFinished { state: "running" })
        ));
    }

    #[tokio::test]
    async fn test_removed_model_is_never_persisted() {
        let store = InMemoryLibraryStore::new();
        let mut session =
            ReviewSession::from_run(finished_run(vec![model("gen-1-1"), model("gen-1-2")]))
                .unwrap();

        session.remove_model("gen-1-1").unwrap();
        let persisted = session.commit(&store).await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].title, "标题 gen-1-2");

        assert_eq!(session.state(), ReviewState::Committed);
        assert_eq!(store.persist_calls().await, vec![vec!["gen-1-2".to_string()]]);
    }

    #[tokio::test]
    async fn test_discard_then_any_operation_is_illegal() {
        let store = InMemoryLibraryStore::new();
        let mut session = ReviewSession::from_run(finished_run(vec![model("gen-1-1")])).unwrap();

        assert_eq!(session.discard_all().unwrap(), 1);
        assert_eq!(session.state(), ReviewState::Discarded);

        for err in [
            session.remove_model("gen-1-1").unwrap_err(),
            session.discard_all().unwrap_err(),
            session.commit(&store).await.unwrap_err(),
        ] {
            assert!(matches!(
                err,
                AppError::Review(ReviewError::IllegalTransition {
                    state: "discarded",
                    ..
                })
            ));
        }
        assert!(store.persist_calls().await.is_empty());
        // 错误列表不随丢弃消失
        assert_eq!(session.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_selection_keeps_review_order() {
        let store = InMemoryLibraryStore::new();
        let mut session = ReviewSession::from_run(finished_run(vec![
            model("gen-1-1"),
            model("gen-1-2"),
            model("gen-1-3"),
        ]))
        .unwrap();

        session
            .commit_selection(&store, &["gen-1-3", "gen-1-1", "gen-9-9"])
            .await
            .unwrap();
        assert_eq!(
            store.persist_calls().await,
            vec![vec!["gen-1-1".to_string(), "gen-1-3".to_string()]]
        );
    }

    #[test]
    fn test_failures_survive_removing_every_model() {
        let mut session = ReviewSession::from_run(finished_run(vec![model("gen-1-1")])).unwrap();
        session.remove_model("gen-1-1").unwrap();

        assert!(session.models().is_empty());
        assert_eq!(session.state(), ReviewState::Reviewing);
        assert_eq!(session.failures()[0].file_name, "b.txt");
        assert!(matches!(
            session.remove_model("gen-1-1").unwrap_err(),
            AppError::Review(ReviewError::ModelNotFound { .. })
        ));
    }
}
