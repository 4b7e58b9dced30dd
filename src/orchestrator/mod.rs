//! 编排层
//!
//! 持有批次状态，负责派发、并发控制、取消与结果累积。
//! 单条记录的筛选细节向下委托给流程层。

pub mod batch_processor;

pub use batch_processor::{BatchOrchestrator, BatchReport, CancelHandle, RecordFailure};
