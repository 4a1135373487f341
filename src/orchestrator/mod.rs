//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次调度、运行控制和结果审阅，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `task_queue` - 任务队列
//! - 运行前校验（空列表、超出上限、批次大小）
//! - 按提交顺序编号，按批次切片
//!
//! ### `batch_scheduler` - 批次调度器
//! - 批内并发、错峰启动
//! - 批间冷却
//! - 在安全点检查取消
//!
//! ### `run_controller` - 运行控制器
//! - 唯一写入 `RunState` 的地方
//! - 提供 `cancel()` / `progress()` / `result()`
//! - 推送进度事件
//!
//! ### `review` - 审阅与提交
//! - `Reviewing -> {Discarded | Committed}`
//! - 提交时一次性交给模型库
//!
//! ### `app` - 应用入口
//! - 组装协作者、加载文件、处理 Ctrl-C
//!
//! ## 层次关系
//!
//! ```text
//! app (组装 + 审阅)
//!     ↓
//! batch_scheduler (处理 Vec<FileTask>)  ←→  run_controller (RunState)
//!     ↓
//! workflow::TaskFlow (处理单个文件)
//!     ↓
//! services (能力层：llm / similarity)
//!     ↓
//! infrastructure (协作者：extractor / comparator / library store)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：调度器管批次，控制器管状态，审阅管提交
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod app;
pub mod batch_scheduler;
pub mod review;
pub mod run_controller;
pub mod task_queue;

// 重新导出主要类型
pub use app::App;
pub use batch_scheduler::BatchScheduler;
pub use review::{ReviewSession, ReviewState};
pub use run_controller::RunController;
pub use task_queue::TaskQueue;
