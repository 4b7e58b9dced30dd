//! 记录筛选流程 - 流程层
//!
//! 核心职责：定义"一条记录"的完整筛选流程
//!
//! 流程顺序：
//! 1. 调用分类后端获取 纳入/排除 判定
//! 2. 按内容身份找回导入时的原始行
//! 3. 合并为已分类记录交还编排器
//!
//! `RecordFlow` 是编排器与具体流程之间的接缝：
//! 编排器只认识这个 trait，测试用桩流程替换真实后端。

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::ClassifyError;
use crate::models::{ArticleRecord, ClassifiedRecord, CriteriaSet, OriginalRow};
use crate::services::{matching_service, LlmService};
use crate::utils::logging::truncate_text;
use crate::workflow::record_ctx::RecordCtx;

/// 单条记录的筛选流程能力
///
/// 实现方必须做到：
/// - 单次尝试，不在内部重试
/// - 错误按逐条记录粒度返回，绝不影响同波其他任务
pub trait RecordFlow: Send + Sync + 'static {
    /// 筛选一条记录
    fn run(
        &self,
        article: ArticleRecord,
        criteria: Arc<CriteriaSet>,
        ctx: RecordCtx,
    ) -> impl Future<Output = Result<ClassifiedRecord, ClassifyError>> + Send;
}

/// 真实的记录筛选流程
///
/// - 编排完整的单条筛选流程
/// - 不持有批次状态
/// - 只依赖业务能力（services）
pub struct ScreenFlow {
    llm_service: LlmService,
    original_rows: Vec<Arc<OriginalRow>>,
    verbose_logging: bool,
}

impl ScreenFlow {
    /// 创建新的筛选流程
    ///
    /// `original_rows` 是导入时原样保留的行数据，用于判定后回配原始行。
    pub fn new(config: &Config, original_rows: Vec<Arc<OriginalRow>>) -> Self {
        Self {
            llm_service: LlmService::new(config),
            original_rows,
            verbose_logging: config.verbose_logging,
        }
    }

    /// 批次开始前的凭证检查（转发给分类服务）
    pub fn check_credentials(&self) -> Result<(), ClassifyError> {
        self.llm_service.check_credentials()
    }

    /// 显示标题预览
    fn log_title(&self, ctx: &RecordCtx, title: &str) {
        info!("{} 📄 {}", ctx, truncate_text(title, 80));
    }
}

impl RecordFlow for ScreenFlow {
    fn run(
        &self,
        article: ArticleRecord,
        criteria: Arc<CriteriaSet>,
        ctx: RecordCtx,
    ) -> impl Future<Output = Result<ClassifiedRecord, ClassifyError>> + Send {
        async move {
            self.log_title(&ctx, &article.title);
            if self.verbose_logging {
                debug!("{} 摘要: {}", ctx, truncate_text(&article.abstract_text, 160));
            }

            // ========== 流程 1: 分类判定 ==========
            let verdict = self.llm_service.classify(&article, &criteria).await?;

            let label = if verdict.include {
                "✅ 纳入"
            } else {
                "🚫 排除"
            };
            info!(
                "{} {} (标准: {})",
                ctx,
                label,
                truncate_text(&verdict.criterion, 60)
            );

            // ========== 流程 2: 回配原始行 ==========
            let original = matching_service::find_original_row(&article, &self.original_rows);
            if original.is_none() && !self.original_rows.is_empty() {
                debug!("{} 未找到对应的原始行，导出时将合成最小行", ctx);
            }

            Ok(ClassifiedRecord::new(article, verdict, original))
        }
    }
}
