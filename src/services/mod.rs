//! 业务能力层
//!
//! 每个服务只提供一种能力，不关心批次流程：
//! - `llm_service`：单条记录的 纳入/排除 判定
//! - `matching_service`：按内容身份匹配记录与原始行/既有结果
//! - `stats_service`：结果聚合与筛选
//! - `import_service`：导入分路（新记录 / 既往结果）
//! - `export_service`：结果导出
//! - `session_store`：会话状态持久化

pub mod export_service;
pub mod import_service;
pub mod llm_service;
pub mod matching_service;
pub mod session_store;
pub mod stats_service;

pub use export_service::{build_export, write_export_file, ExportDocument};
pub use import_service::{classify_import, ImportOutcome};
pub use llm_service::LlmService;
pub use session_store::{SessionState, SessionStore};
pub use stats_service::{
    criterion_stats, filter_records, overall_stats, unique_criteria, ClassificationFilter,
    CriterionStats, OverallStats,
};
