//! # Bulk Model Generate
//!
//! 批量把文档生成为可复用"模型"的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 外部协作者接口及默认实现，只暴露能力
//! - `PlainTextExtractor` - 文本提取
//! - `TokenSimilarity` - 确定性的文本相似度
//! - `JsonLibraryStore` - 模型库
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文件或单个模型
//! - `LlmService` - 调用生成后端，解析候选模型
//! - `SimilarityDedup` - 相似度标注
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的完整处理流程
//! - `TaskCtx` - 上下文封装（文件编号 + 批次）
//! - `TaskFlow` - 流程编排（extract → generate → annotate）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 分批并发、错峰、冷却
//! - `orchestrator/run_controller` - 运行状态、取消、进度
//! - `orchestrator/review` - 审阅与提交
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, SchedulerConfig, StaggerPreset};
pub use error::{AppError, AppResult};
pub use infrastructure::{LibraryStore, ModelGenerator, SimilarityComparator, TextExtractor};
pub use models::{FileTask, GeneratedModel, Outcome, RunState, RunStatus};
pub use orchestrator::{App, BatchScheduler, ReviewSession, ReviewState, RunController};
pub use workflow::{TaskCtx, TaskFlow};
