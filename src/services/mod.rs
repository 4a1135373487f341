pub mod llm_service;
pub mod similarity_service;

pub use llm_service::LlmService;
pub use similarity_service::{RunCorpus, SimilarityDedup, DEFAULT_SIMILARITY_THRESHOLD};
