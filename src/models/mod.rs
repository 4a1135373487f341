pub mod file_task;
pub mod generated_model;
pub mod loaders;
pub mod outcome;
pub mod settings;

pub use file_task::{FileHandle, FileTask};
pub use generated_model::{
    CandidateModel, CorpusEntry, GeneratedModel, LibraryModel, MatchOrigin, PersistedModel,
    SimilarModelRef, SimilarityInfo,
};
pub use loaders::{load_all_files, resolve_generation_settings};
pub use outcome::{
    FileFailure, FileOutcome, Outcome, ProgressEvent, RunProgress, RunState, RunStatus, RunSummary,
};
pub use settings::GenerationSettings;
