mod common;

use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};

use bulk_model_generate::config::{Config, SchedulerConfig};
use bulk_model_generate::error::{AppError, ReviewError, StoreError, ValidationError};
use bulk_model_generate::infrastructure::{
    InMemoryLibraryStore, JsonLibraryStore, LibraryStore, TokenSimilarity,
};
use bulk_model_generate::models::{LibraryModel, MatchOrigin, Outcome, RunStatus};
use bulk_model_generate::orchestrator::{
    App, BatchScheduler, ReviewSession, ReviewState, RunController,
};
use bulk_model_generate::services::SimilarityDedup;

use common::{
    candidate, default_flow, flow, numbered_files, text_file, FixedComparator, ScriptedExtractor,
    ScriptedGenerator,
};

fn library_model(id: &str, title: &str, content: &str) -> LibraryModel {
    LibraryModel {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        category: "合同".to_string(),
        keywords: vec![],
        source_file: None,
        created_at: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_extraction_failure_is_isolated() {
    let generator = Arc::new(ScriptedGenerator::new());
    let flow = flow(
        Arc::new(ScriptedExtractor::new().failing_on("f2.txt")),
        generator.clone(),
        Arc::new(TokenSimilarity::new()),
    );
    let scheduler = BatchScheduler::new(SchedulerConfig::default(), flow);
    let controller = RunController::new();

    let state = assert_ok!(scheduler.run(numbered_files(4), &[], &controller).await);

    assert_eq!(state.status, RunStatus::Completed);
    let summary = state.summary();
    assert_eq!((summary.succeeded, summary.failed), (3, 1));
    assert!(matches!(
        state.outcome_for("f2.txt"),
        Some(Outcome::Failure { .. })
    ));
    assert_eq!(generator.call_count(), 3);

    let review = assert_ok!(ReviewSession::from_run(state));
    assert_eq!(review.failures().len(), 1);
    assert_eq!(review.failures()[0].file_name, "f2.txt");
    assert!(review.failures()[0].reason.contains("无法读取文件"));

    let mut sources: Vec<&str> = review
        .models()
        .iter()
        .map(|m| m.source_file.as_str())
        .collect();
    sources.sort();
    assert_eq!(sources, vec!["f1.txt", "f3.txt", "f4.txt"]);
}

#[tokio::test]
async fn test_similarity_flags_only_above_threshold() {
    let library = vec![
        library_model("lib-7", "房屋租赁合同", "房屋租赁合同范本"),
        library_model("lib-8", "保密协议", "保密协议范本"),
    ];
    let comparator = FixedComparator::new()
        .with_score("租赁合同", "房屋租赁合同范本", 0.92)
        .with_score("租赁合同", "保密协议范本", 0.70)
        .with_score("劳动合同", "房屋租赁合同范本", 0.40);
    let flow = flow(
        Arc::new(ScriptedExtractor::new()),
        Arc::new(ScriptedGenerator::new()),
        Arc::new(comparator),
    );
    let scheduler = BatchScheduler::new(SchedulerConfig::default(), flow);
    let controller = RunController::new();

    let files = vec![text_file("a.txt", "租赁合同"), text_file("b.txt", "劳动合同")];
    let state = assert_ok!(scheduler.run(files, &library, &controller).await);

    let flagged = state.models.iter().find(|m| m.source_file == "a.txt").unwrap();
    let info = flagged.similarity_info.as_ref().unwrap();
    assert_eq!(info.similarity, 0.92);
    assert_eq!(info.percent(), 92);
    assert_eq!(info.similar_model.id, "lib-7");
    assert_eq!(info.similar_model.title, "房屋租赁合同");
    assert_eq!(info.similar_model.origin, MatchOrigin::Library);

    let clean = state.models.iter().find(|m| m.source_file == "b.txt").unwrap();
    assert!(clean.similarity_info.is_none());
    assert_eq!(state.summary().flagged, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicates_within_one_run_are_flagged() {
    let generator = Arc::new(
        ScriptedGenerator::new().returning(
            "同一份文档",
            vec![
                candidate("甲", "押金在租期结束后退还"),
                candidate("乙", "押金在租期结束后退还"),
            ],
        ),
    );
    // 一次一个文件，保证记录顺序
    let scheduler = BatchScheduler::new(
        SchedulerConfig::default().with_batch_size(1),
        default_flow(generator),
    );
    let controller = RunController::new();

    let files = vec![
        text_file("a.txt", "同一份文档"),
        text_file("b.txt", "押金在租期结束后退还"),
    ];
    let state = assert_ok!(scheduler.run(files, &[], &controller).await);

    let ids: Vec<&str> = state.models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["gen-1-1", "gen-1-2", "gen-2-1"]);

    assert!(state.models[0].similarity_info.is_none());
    // 同一文件内的重复
    let info = state.models[1].similarity_info.as_ref().unwrap();
    assert_eq!(info.similar_model.id, "gen-1-1");
    assert_eq!(info.similar_model.origin, MatchOrigin::CurrentRun);
    // 跨文件的重复，分数相同时取更早的一项
    let info = state.models[2].similarity_info.as_ref().unwrap();
    assert_eq!(info.similar_model.id, "gen-1-1");
}

#[tokio::test]
async fn test_annotation_is_deterministic() {
    let dedup = SimilarityDedup::new(Arc::new(TokenSimilarity::new()), 0.60);
    let library: Vec<_> = [
        library_model("lib-1", "租赁", "房屋租赁 押金 退还 条款"),
        library_model("lib-2", "劳动", "劳动合同 试用期 条款"),
    ]
    .iter()
    .map(LibraryModel::to_corpus_entry)
    .collect();

    let generated = {
        let generator = Arc::new(ScriptedGenerator::new());
        let scheduler = BatchScheduler::new(SchedulerConfig::default(), default_flow(generator));
        let state = scheduler
            .run(
                vec![text_file("a.txt", "房屋租赁 押金 退还")],
                &[],
                &RunController::new(),
            )
            .await
            .unwrap();
        state.models[0].clone()
    };

    let first = dedup.annotate(generated.clone(), &library, &[]).await;
    for _ in 0..5 {
        let again = dedup.annotate(generated.clone(), &library, &[]).await;
        assert_eq!(again.similarity_info, first.similarity_info);
    }
    assert_eq!(first.similarity_info.unwrap().similar_model.id, "lib-1");
}

#[tokio::test]
async fn test_commit_with_nothing_left_still_calls_store_once() {
    let generator = Arc::new(ScriptedGenerator::new());
    let scheduler = BatchScheduler::new(SchedulerConfig::default(), default_flow(generator));
    let state = scheduler
        .run(numbered_files(2), &[], &RunController::new())
        .await
        .unwrap();

    let store = InMemoryLibraryStore::new();
    let mut review = ReviewSession::from_run(state).unwrap();
    let ids: Vec<String> = review.models().iter().map(|m| m.id.clone()).collect();
    for id in &ids {
        assert_ok!(review.remove_model(id));
    }

    let persisted = assert_ok!(review.commit(&store).await);
    assert!(persisted.is_empty());
    assert_eq!(review.state(), ReviewState::Committed);
    assert_eq!(store.persist_calls().await, vec![Vec::<String>::new()]);

    let err = assert_err!(review.commit(&store).await);
    assert!(matches!(
        err,
        AppError::Review(ReviewError::IllegalTransition {
            state: "committed",
            operation: "commit"
        })
    ));
    assert_eq!(store.persist_calls().await.len(), 1);
}

#[tokio::test]
async fn test_app_auto_commit_persists_to_json_library() {
    let dir = tempfile::tempdir().unwrap();
    let library_path = dir.path().join("library.json");
    // 文件不存在时视为空库
    let store = Arc::new(JsonLibraryStore::new(&library_path));

    let config = Config {
        auto_commit: true,
        output_log_file: dir.path().join("output.txt").display().to_string(),
        ..Default::default()
    };
    let scheduler = BatchScheduler::new(
        config.scheduler_config(),
        default_flow(Arc::new(ScriptedGenerator::new())),
    );
    let app = App::from_parts(config, scheduler, store.clone());

    let review = assert_ok!(app.process_files(numbered_files(2), &RunController::new()).await);
    assert_eq!(review.state(), ReviewState::Committed);
    assert_eq!(review.persisted().len(), 2);

    let saved = store.list().await.unwrap();
    let mut ids: Vec<&str> = saved.iter().map(|m| m.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["lib-1", "lib-2"]);
    assert!(saved.iter().all(|m| m.created_at.is_some()));
}

#[tokio::test]
async fn test_app_without_auto_commit_discards() {
    let store = Arc::new(InMemoryLibraryStore::with_models(vec![library_model(
        "lib-3",
        "旧模型",
        "文档 1",
    )]));
    let config = Config::default();
    let scheduler = BatchScheduler::new(
        config.scheduler_config(),
        default_flow(Arc::new(ScriptedGenerator::new())),
    );
    let app = App::from_parts(config, scheduler, store.clone());

    let review = assert_ok!(app.process_files(numbered_files(1), &RunController::new()).await);

    assert_eq!(review.state(), ReviewState::Discarded);
    assert!(review.models().is_empty());
    assert!(store.persist_calls().await.is_empty());
    assert_eq!(store.models().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_models_is_success_not_failure() {
    let generator = Arc::new(ScriptedGenerator::new().returning("文档 1", vec![]));
    let scheduler = BatchScheduler::new(SchedulerConfig::default(), default_flow(generator));
    let state = scheduler
        .run(numbered_files(2), &[], &RunController::new())
        .await
        .unwrap();

    let empty = state
        .outcomes
        .iter()
        .find(|o| o.file_name == "f1.txt")
        .unwrap();
    assert!(matches!(
        &empty.outcome,
        Outcome::Success { models_produced, .. } if models_produced.is_empty()
    ));

    let summary = state.summary();
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.models, 1);

    let review = ReviewSession::from_run(state).unwrap();
    assert!(review.failures().is_empty());
    assert_eq!(review.models().len(), 1);
}

#[tokio::test]
async fn test_persist_failure_keeps_session_reviewing() {
    let dir = tempfile::tempdir().unwrap();
    let library_path = dir.path().join("no_such_dir").join("library.json");
    let store = JsonLibraryStore::new(&library_path);

    let scheduler = BatchScheduler::new(
        SchedulerConfig::default(),
        default_flow(Arc::new(ScriptedGenerator::new())),
    );
    let state = scheduler
        .run(numbered_files(1), &[], &RunController::new())
        .await
        .unwrap();
    let mut review = ReviewSession::from_run(state).unwrap();

    let err = assert_err!(review.commit(&store).await);
    match err {
        AppError::Store(StoreError::PersistFailed { path, .. }) => {
            assert_eq!(path, library_path.display().to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(review.state(), ReviewState::Reviewing);
    assert_eq!(review.models().len(), 1);

    // 目录补上后可以重试
    std::fs::create_dir_all(library_path.parent().unwrap()).unwrap();
    assert_ok!(review.commit(&store).await);
    assert_eq!(review.state(), ReviewState::Committed);
}

#[tokio::test]
async fn test_unreadable_library_is_load_failed() {
    let dir = tempfile::tempdir().unwrap();
    let library_path = dir.path().join("library.json");
    std::fs::write(&library_path, "{ not json").unwrap();
    let store = Arc::new(JsonLibraryStore::new(&library_path));

    let config = Config {
        output_log_file: dir.path().join("output.txt").display().to_string(),
        ..Default::default()
    };
    let generator = Arc::new(ScriptedGenerator::new());
    let scheduler = BatchScheduler::new(config.scheduler_config(), default_flow(generator.clone()));
    let app = App::from_parts(config, scheduler, store);

    let err = assert_err!(app.process_files(numbered_files(1), &RunController::new()).await);
    assert!(matches!(err, AppError::Store(StoreError::LoadFailed { .. })));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_app_run_on_empty_folder_is_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        input_folder: dir.path().display().to_string(),
        ..Default::default()
    };
    let scheduler = BatchScheduler::new(
        config.scheduler_config(),
        default_flow(Arc::new(ScriptedGenerator::new())),
    );
    let store = Arc::new(InMemoryLibraryStore::new());
    let app = App::from_parts(config, scheduler, store.clone());

    let err = assert_err!(app.run().await);
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Validation(ValidationError::EmptyFileSet))
    ));
    assert!(store.persist_calls().await.is_empty());
}
