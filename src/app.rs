//! 应用入口 - 顶层装配
//!
//! ## 职责
//!
//! 1. **装配**：根据配置创建会话存储、筛选流程与编排器
//! 2. **导入分路**：输入文件按内容路由到 新记录筛选 / 既往结果重导出
//! 3. **断点续筛**：输出文件已存在时恢复其中的结果作为种子
//! 4. **取消入口**：Ctrl-C 触发协作取消，在途波结束后安全落盘
//! 5. **收尾**：统计汇总、结果导出、会话状态保存

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{load_rows_file, ArticleRecord, ClassifiedRecord, CriteriaSet, OriginalRow};
use crate::orchestrator::BatchOrchestrator;
use crate::services::{
    build_export, classify_import, criterion_stats, overall_stats, write_export_file,
    ExportDocument, ImportOutcome, LlmService, SessionStore,
};
use crate::utils::logging::{log_records_loaded, log_startup, print_final_stats};
use crate::workflow::ScreenFlow;

/// 应用主结构
pub struct App {
    config: Config,
    session: SessionStore,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let model = if config.provider == "ollama" {
            config.ollama_model_name.clone()
        } else {
            config.llm_model_name.clone()
        };
        log_startup(
            &config.provider,
            &model,
            config.max_concurrent_classifications,
        );

        let session = SessionStore::new(&config.session_file);
        Ok(Self { config, session })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在读取输入文件: {}", self.config.input_file);
        let rows = load_rows_file(Path::new(&self.config.input_file)).await?;

        match classify_import(rows)? {
            ImportOutcome::PreviousResults { records, criteria } => {
                self.reexport_previous(records, criteria).await
            }
            ImportOutcome::FreshRecords { records, rows } => {
                self.screen_fresh(records, rows).await
            }
        }
    }

    /// 既往结果路径：重新统计并按当前导出格式落盘
    async fn reexport_previous(
        &self,
        records: Vec<ClassifiedRecord>,
        criteria: Option<CriteriaSet>,
    ) -> Result<()> {
        info!("📂 输入文件为既往结果，重新统计并导出");

        let criteria = match criteria {
            Some(recovered) => {
                self.session.remember_criteria(&recovered).await?;
                recovered
            }
            None => self.session_criteria().await?,
        };

        self.report_and_export(&records, &criteria, 0).await
    }

    /// 新记录路径：（续筛）派发批次后统计导出
    async fn screen_fresh(
        &self,
        records: Vec<ArticleRecord>,
        rows: Vec<Arc<OriginalRow>>,
    ) -> Result<()> {
        if records.is_empty() {
            warn!("⚠️ 输入文件中没有可筛选的记录，程序结束");
            return Ok(());
        }

        let (seed, recovered_criteria) = self.load_seed().await?;
        let criteria = match recovered_criteria {
            Some(recovered) => recovered,
            None => self.session_criteria().await?,
        };
        let criteria = Arc::new(criteria);

        if self.config.verbose_logging {
            let models = LlmService::new(&self.config).list_models().await;
            info!("🤖 可用模型: {}", models.join(", "));
        }

        let flow = ScreenFlow::new(&self.config, rows);
        // 凭证问题在批次开始前暴露，不产生逐条错误
        flow.check_credentials()?;

        let orchestrator =
            BatchOrchestrator::new(flow, self.config.max_concurrent_classifications);

        // Ctrl-C 触发协作取消
        let cancel = orchestrator.cancel_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        log_records_loaded(records.len(), self.config.max_concurrent_classifications);

        let report = orchestrator
            .run(records, Arc::clone(&criteria), seed, |done, total| {
                info!(
                    "📈 进度: {}/{} ({:.0}%)",
                    done,
                    total,
                    done as f64 / total as f64 * 100.0
                );
            })
            .await?;

        for failure in &report.errors {
            warn!("⚠️ 未完成的记录: {} ({})", failure.title, failure.detail);
        }
        if report.cancelled {
            info!(
                "💡 批次已取消，已完成的 {} 条结果照常导出，下次运行将自动续筛",
                report.completed.len()
            );
        }

        self.session.remember_criteria(&criteria).await?;
        self.session
            .remember_backend(&self.config.provider, self.model_name())
            .await?;

        self.report_and_export(&report.completed, &criteria, report.errors.len())
            .await
    }

    /// 输出文件已存在时，恢复其中的结果作为续筛种子
    async fn load_seed(&self) -> Result<(Vec<ClassifiedRecord>, Option<CriteriaSet>)> {
        let path = Path::new(&self.config.output_file);
        if !path.exists() {
            return Ok((Vec::new(), None));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("读取既有结果文件失败: {}", path.display()))?;
        let document: ExportDocument = serde_json::from_str(&content)
            .with_context(|| format!("解析既有结果文件失败: {}", path.display()))?;

        if document.results.is_empty() {
            return Ok((Vec::new(), None));
        }

        match classify_import(document.results)? {
            ImportOutcome::PreviousResults { records, criteria } => {
                info!("🔄 发现既有结果文件，恢复 {} 条结果用于续筛", records.len());
                Ok((records, criteria))
            }
            // 输出文件按理不可能是新记录格式，按无种子处理
            ImportOutcome::FreshRecords { .. } => Ok((Vec::new(), None)),
        }
    }

    /// 统计汇总 + 导出落盘
    async fn report_and_export(
        &self,
        records: &[ClassifiedRecord],
        criteria: &CriteriaSet,
        failed: usize,
    ) -> Result<()> {
        let stats = overall_stats(records);
        print_final_stats(stats.included, stats.excluded, failed, stats.total + failed);

        let by_criterion = criterion_stats(records);
        if !by_criterion.is_empty() {
            info!("\n📋 按标准统计:");
            for entry in &by_criterion {
                info!(
                    "   {} → 纳入 {} / 排除 {} (共 {}, 纳入率 {:.0}%)",
                    entry.criterion,
                    entry.included,
                    entry.excluded,
                    entry.total,
                    entry.inclusion_rate * 100.0
                );
            }
        }

        let document = build_export(records, criteria);
        write_export_file(Path::new(&self.config.output_file), &document).await
    }

    /// 从会话状态解析标准集合
    async fn session_criteria(&self) -> Result<CriteriaSet> {
        self.session
            .load()
            .await?
            .criteria
            .context("未设置筛选标准：请先导入带有标准列的既往结果，或在会话文件中配置 criteria")
    }

    fn model_name(&self) -> &str {
        if self.config.provider == "ollama" {
            &self.config.ollama_model_name
        } else {
            &self.config.llm_model_name
        }
    }
}
