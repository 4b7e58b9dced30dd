//! # Article Screener
//!
//! 一个面向系统综述的批量文献筛选引擎
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 领域数据：文献记录、原始行、标准集合、判定结果
//! - `ArticleRecord` - 待筛选记录，身份 = (标题, 摘要)
//! - `OriginalRow` - 导入时逐列原样保留的行数据
//! - `CriteriaSet` - 纳入/排除 标准集合（批次运行期间不可变）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条记录
//! - `LlmService` - 分类判定能力（OpenAI 兼容 / Ollama）
//! - `matching_service` - 按内容身份匹配的能力
//! - `stats_service` - 结果聚合与筛选能力
//! - `import_service` / `export_service` - 导入分路与导出能力
//! - `SessionStore` - 会话状态持久化能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条记录"的完整筛选流程
//! - `RecordCtx` - 上下文封装（记录序号 + 波序号）
//! - `RecordFlow` / `ScreenFlow` - 流程接缝与真实实现（判定 → 回配原始行）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量筛选编排器：
//!   分波派发、并发上限、完成序提交、协作取消、断点续筛
//!
//! 顶层的 `App` 负责装配以上各层并串联 导入 → 批次 → 统计 → 导出。

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{ClassifyError, ImportError};
pub use models::{ArticleRecord, ClassifiedRecord, CriteriaSet, OriginalRow, Verdict};
pub use orchestrator::{BatchOrchestrator, BatchReport, CancelHandle};
pub use services::{ClassificationFilter, ImportOutcome, LlmService, SessionStore};
pub use workflow::{RecordCtx, RecordFlow, ScreenFlow};
