//! 批量筛选编排器 - 编排层
//!
//! ## 职责
//!
//! 本模块是筛选批次的唯一状态持有者，负责批次的派发与结果累积。
//!
//! ## 核心功能
//!
//! 1. **断点续筛**：用已有结果对供给记录做差集，只派发剩余部分
//! 2. **并发控制**：使用 Semaphore 限制同时在途的后端调用数（固定为 K）
//! 3. **分波处理**：将记录按每波 K 条派发，一波结束后再开始下一波
//! 4. **完成序提交**：波内任务按完成顺序提交结果，不保证派发顺序
//! 5. **协作取消**：派发边界与提交边界各检查一次取消标志；
//!    取消后在途任务自然结束但结果被丢弃，续筛时重新视为待处理
//! 6. **逐条容错**：单条记录失败只跳过该条，不中止同波任务或整个批次
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单条记录的细节，向下委托 `RecordFlow`
//! - **单一写入点**：批次状态只在提交边界被本模块修改，无共享可变状态
//! - **无自动重试**：失败记录留待调用方再次发起续筛

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::models::{ArticleRecord, ClassifiedRecord, CriteriaSet};
use crate::services::matching_service;
use crate::utils::logging::{log_wave_complete, log_wave_start};
use crate::workflow::{RecordCtx, RecordFlow};

/// 取消句柄
///
/// 可跨任务克隆；`cancel()` 设置后不再派发新的波，
/// 在途任务的结果在提交边界被丢弃。
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// 请求取消当前批次
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
        info!("🛑 已请求取消，当前在途任务结束后批次将停止");
    }

    /// 是否已请求取消
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 单条记录的失败信息
#[derive(Debug)]
pub struct RecordFailure {
    /// 失败记录的标题
    pub title: String,
    /// 失败原因
    pub detail: String,
}

/// 批次运行报告
#[derive(Debug)]
pub struct BatchReport {
    /// 累积的已分类记录（续筛时包含种子结果，按提交顺序排列）
    pub completed: Vec<ClassifiedRecord>,
    /// 本次运行中逐条失败的记录
    pub errors: Vec<RecordFailure>,
    /// 供给记录中已有结果的条数（身份交集 + 本次提交，不超过 `completed.len()`）
    pub processed_count: usize,
    /// 供给记录总数
    pub total_count: usize,
    /// 批次是否因取消而结束
    pub cancelled: bool,
}

impl BatchReport {
    /// 当前进度（0.0 - 1.0）
    pub fn progress(&self) -> f64 {
        if self.total_count == 0 {
            1.0
        } else {
            self.processed_count as f64 / self.total_count as f64
        }
    }
}

/// 批量筛选编排器
pub struct BatchOrchestrator<F: RecordFlow> {
    flow: Arc<F>,
    max_concurrent: usize,
    cancel: CancelHandle,
}

impl<F: RecordFlow> BatchOrchestrator<F> {
    /// 创建编排器
    pub fn new(flow: F, max_concurrent: usize) -> Self {
        Self {
            flow: Arc::new(flow),
            max_concurrent: max_concurrent.max(1),
            cancel: CancelHandle::new(),
        }
    }

    /// 获取取消句柄
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// 运行批次
    ///
    /// - 全新筛选：`seed` 传空
    /// - 断点续筛：`seed` 传既有结果，供给记录中已有结果的部分不会重跑
    ///
    /// `on_progress` 在每次成功提交后收到 `(已提交数, 总数)`。
    pub async fn run(
        &self,
        supplied: Vec<ArticleRecord>,
        criteria: Arc<CriteriaSet>,
        seed: Vec<ClassifiedRecord>,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<BatchReport> {
        let total_count = supplied.len();
        let pending = matching_service::pending_records(&supplied, &seed);
        // 进度基数是身份交集：种子里与本次供给无关的结果保留但不计入进度
        let overlap = matching_service::completed_overlap(&supplied, &seed);

        let mut completed = seed;
        let mut processed_count = overlap;
        let mut errors: Vec<RecordFailure> = Vec::new();

        if pending.is_empty() {
            info!("✓ 所有 {} 条记录均已有结果，无需派发", total_count);
            return Ok(BatchReport {
                completed,
                errors,
                processed_count,
                total_count,
                cancelled: self.cancel.is_cancelled(),
            });
        }

        if processed_count > 0 {
            info!(
                "🔄 续筛模式: 已有 {} 条结果，剩余 {} 条待处理",
                processed_count,
                pending.len()
            );
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let total_pending = pending.len();
        let total_waves = (total_pending + self.max_concurrent - 1) / self.max_concurrent;

        // 分波处理
        for (wave_idx, wave_records) in pending.chunks(self.max_concurrent).enumerate() {
            // 派发边界取消检查：不再开启新的波
            if self.cancel.is_cancelled() {
                warn!("⚠️ 批次已取消，剩余 {} 条留待续筛", total_pending - wave_idx * self.max_concurrent);
                break;
            }

            let wave_num = wave_idx + 1;
            let wave_start = wave_idx * self.max_concurrent;
            log_wave_start(
                wave_num,
                total_waves,
                wave_start + 1,
                wave_start + wave_records.len(),
                total_pending,
            );

            let mut wave_tasks = FuturesUnordered::new();

            for (idx, article) in wave_records.iter().enumerate() {
                // 每条派发前再检查一次取消
                if self.cancel.is_cancelled() {
                    break;
                }

                let permit = semaphore.clone().acquire_owned().await?;
                let flow = Arc::clone(&self.flow);
                let criteria = Arc::clone(&criteria);
                let article = article.clone();
                let ctx = RecordCtx::new(wave_start + idx + 1, total_pending, wave_num);

                wave_tasks.push(tokio::spawn(async move {
                    let _permit = permit;
                    let title = article.title.clone();
                    let result = flow.run(article, criteria, ctx).await;
                    (title, result)
                }));
            }

            // 完成序提交：谁先结束谁先提交，不保证派发顺序
            let mut wave_classified = 0usize;
            let wave_size = wave_tasks.len();

            while let Some(joined) = wave_tasks.next().await {
                match joined {
                    Ok((title, result)) => {
                        // 提交边界取消检查：取消后丢弃在途结果
                        if self.cancel.is_cancelled() {
                            warn!("⚠️ 批次已取消，丢弃在途结果: {}", title);
                            continue;
                        }
                        match result {
                            Ok(record) => {
                                completed.push(record);
                                processed_count += 1;
                                wave_classified += 1;
                                on_progress(processed_count, total_count);
                            }
                            Err(e) => {
                                error!("❌ 记录分类失败，跳过: {} ({})", title, e);
                                errors.push(RecordFailure {
                                    title,
                                    detail: e.to_string(),
                                });
                            }
                        }
                    }
                    Err(e) => {
                        error!("❌ 任务执行失败: {}", e);
                        errors.push(RecordFailure {
                            title: "<未知记录>".to_string(),
                            detail: e.to_string(),
                        });
                    }
                }
            }

            log_wave_complete(wave_num, wave_classified, wave_size);
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            info!(
                "🛑 批次已取消结束: 已提交 {}/{} 条",
                processed_count, total_count
            );
        }

        Ok(BatchReport {
            completed,
            errors,
            processed_count,
            total_count,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verdict;
    use crate::services::{criterion_stats, overall_stats};
    use std::collections::HashSet;
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    /// 测试桩流程：固定判定 + 可注入延迟/失败，并记录并发水位
    struct StubFlow {
        delay: Duration,
        fail_titles: HashSet<String>,
        in_flight: Arc<AtomicUsize>,
        high_water: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl StubFlow {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                fail_titles: HashSet::new(),
                in_flight: Arc::new(AtomicUsize::new(0)),
                high_water: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing_on(mut self, title: &str) -> Self {
            self.fail_titles.insert(title.to_string());
            self
        }
    }

    impl RecordFlow for StubFlow {
        fn run(
            &self,
            article: ArticleRecord,
            _criteria: Arc<CriteriaSet>,
            _ctx: RecordCtx,
        ) -> impl Future<Output = Result<ClassifiedRecord, crate::error::ClassifyError>> + Send
        {
            let delay = self.delay;
            let fail = self.fail_titles.contains(&article.title);
            let in_flight = Arc::clone(&self.in_flight);
            let high_water = Arc::clone(&self.high_water);
            let seen = Arc::clone(&self.seen);

            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                seen.lock().unwrap().push(article.title.clone());

                if fail {
                    return Err(crate::error::ClassifyError::MalformedResponse {
                        response: "not json".to_string(),
                    });
                }
                Ok(ClassifiedRecord::new(
                    article,
                    Verdict {
                        include: true,
                        reason: "matches".to_string(),
                        criterion: "1. clinical trial".to_string(),
                    },
                    None,
                ))
            }
        }
    }

    fn records(n: usize) -> Vec<ArticleRecord> {
        (1..=n)
            .map(|i| ArticleRecord {
                title: format!("article-{}", i),
                abstract_text: format!("abstract-{}", i),
                doi: None,
                source: None,
            })
            .collect()
    }

    fn criteria() -> Arc<CriteriaSet> {
        Arc::new(
            CriteriaSet::new(
                vec!["clinical trial".to_string()],
                vec!["animal study".to_string()],
            )
            .unwrap(),
        )
    }

    fn titles(completed: &[ClassifiedRecord]) -> HashSet<String> {
        completed.iter().map(|r| r.article.title.clone()).collect()
    }

    #[tokio::test]
    async fn five_records_two_at_a_time_complete() {
        let orchestrator = BatchOrchestrator::new(StubFlow::new(5), 2);
        let mut progress_events = Vec::new();

        let report = orchestrator
            .run(records(5), criteria(), Vec::new(), |done, total| {
                progress_events.push((done, total))
            })
            .await
            .unwrap();

        assert_eq!(report.completed.len(), 5);
        assert_eq!(report.processed_count, 5);
        assert_eq!(report.total_count, 5);
        assert!(report.errors.is_empty());
        assert!(!report.cancelled);
        assert!((report.progress() - 1.0).abs() < 1e-9);

        // 进度单调递增，最后一次为 (5, 5)
        assert_eq!(progress_events.len(), 5);
        assert!(progress_events.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(progress_events.last(), Some(&(5, 5)));

        // 聚合不变式：纳入 + 排除 == 完成总数
        let stats = overall_stats(&report.completed);
        assert_eq!(stats.included, 5);
        assert_eq!(stats.excluded, 0);

        let by_criterion = criterion_stats(&report.completed);
        assert_eq!(by_criterion.len(), 1);
        assert_eq!(by_criterion[0].criterion, "1. clinical trial");
        assert_eq!(by_criterion[0].total, 5);
    }

    #[tokio::test]
    async fn in_flight_never_exceeds_limit() {
        let flow = StubFlow::new(20);
        let high_water = Arc::clone(&flow.high_water);
        let orchestrator = BatchOrchestrator::new(flow, 2);

        let report = orchestrator
            .run(records(7), criteria(), Vec::new(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.completed.len(), 7);
        assert!(high_water.load(Ordering::SeqCst) <= 2);
        assert!(high_water.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn failed_record_is_skipped_not_fatal() {
        let orchestrator = BatchOrchestrator::new(StubFlow::new(5).failing_on("article-3"), 2);

        let report = orchestrator
            .run(records(5), criteria(), Vec::new(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.completed.len(), 4);
        assert_eq!(report.processed_count, 4);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].title, "article-3");
        assert!(!titles(&report.completed).contains("article-3"));
        // 同波的其他任务不受影响
        assert!(titles(&report.completed).contains("article-4"));
    }

    #[tokio::test]
    async fn failed_record_reappears_on_resume() {
        let supplied = records(5);

        let first = BatchOrchestrator::new(StubFlow::new(5).failing_on("article-3"), 2)
            .run(supplied.clone(), criteria(), Vec::new(), |_, _| {})
            .await
            .unwrap();
        assert_eq!(first.completed.len(), 4);

        // 续筛：失败的记录重新成为待处理，其余不重跑
        let flow = StubFlow::new(5);
        let seen = Arc::clone(&flow.seen);
        let second = BatchOrchestrator::new(flow, 2)
            .run(supplied.clone(), criteria(), first.completed, |_, _| {})
            .await
            .unwrap();

        assert_eq!(second.completed.len(), 5);
        assert_eq!(seen.lock().unwrap().as_slice(), ["article-3"]);
        assert_eq!(titles(&second.completed).len(), 5);
    }

    #[tokio::test]
    async fn resume_skips_seeded_records_and_never_duplicates() {
        let supplied = records(5);

        // 模拟上一次运行在完成 2 条后崩溃
        let crashed = BatchOrchestrator::new(StubFlow::new(1), 2)
            .run(supplied[..2].to_vec(), criteria(), Vec::new(), |_, _| {})
            .await
            .unwrap();
        assert_eq!(crashed.completed.len(), 2);

        let flow = StubFlow::new(1);
        let seen = Arc::clone(&flow.seen);
        let resumed = BatchOrchestrator::new(flow, 2)
            .run(supplied.clone(), criteria(), crashed.completed, |_, _| {})
            .await
            .unwrap();

        // 最终结果按身份恰好等于供给集合，无重复
        assert_eq!(resumed.completed.len(), 5);
        assert_eq!(resumed.processed_count, 5);
        let expected: HashSet<String> = supplied.iter().map(|a| a.title.clone()).collect();
        assert_eq!(titles(&resumed.completed), expected);
        // 已有结果的记录绝不重跑
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(!seen.contains(&"article-1".to_string()));
    }

    #[tokio::test]
    async fn foreign_seed_records_do_not_inflate_progress() {
        // 输出文件换了输入源后，种子里可能残留与本次供给无关的结果
        let foreign = ClassifiedRecord::new(
            ArticleRecord {
                title: "stale-article".to_string(),
                abstract_text: "stale-abstract".to_string(),
                doi: None,
                source: None,
            },
            Verdict {
                include: true,
                reason: "matches".to_string(),
                criterion: "1. clinical trial".to_string(),
            },
            None,
        );

        let mut progress_events = Vec::new();
        let report = BatchOrchestrator::new(StubFlow::new(1), 2)
            .run(records(2), criteria(), vec![foreign], |done, total| {
                progress_events.push((done, total))
            })
            .await
            .unwrap();

        // 无关结果保留在累积集中，但进度只统计供给记录
        assert_eq!(report.completed.len(), 3);
        assert_eq!(report.total_count, 2);
        assert_eq!(report.processed_count, 2);
        assert!(report.progress() <= 1.0);
        assert_eq!(progress_events, vec![(1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn all_seeded_means_nothing_dispatched() {
        let supplied = records(3);
        let done = BatchOrchestrator::new(StubFlow::new(1), 2)
            .run(supplied.clone(), criteria(), Vec::new(), |_, _| {})
            .await
            .unwrap();

        let flow = StubFlow::new(1);
        let seen = Arc::clone(&flow.seen);
        let report = BatchOrchestrator::new(flow, 2)
            .run(supplied, criteria(), done.completed, |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.completed.len(), 3);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_drains_and_discards_in_flight() {
        let orchestrator = Arc::new(BatchOrchestrator::new(StubFlow::new(40), 2));
        let handle = orchestrator.cancel_handle();
        let supplied = records(6);

        let run_task = {
            let orchestrator = Arc::clone(&orchestrator);
            let supplied = supplied.clone();
            tokio::spawn(async move {
                orchestrator
                    .run(supplied, criteria(), Vec::new(), |_, _| {})
                    .await
                    .unwrap()
            })
        };

        // 第一波在途时请求取消
        tokio::time::sleep(Duration::from_millis(15)).await;
        handle.cancel();
        let report = run_task.await.unwrap();

        assert!(report.cancelled);
        // 在途结果被丢弃，已提交数不会超过结果数
        assert_eq!(report.processed_count, report.completed.len());
        assert!(report.completed.len() < 6);

        // 续筛把被丢弃的记录重新纳入待处理，最终补齐
        let resumed = BatchOrchestrator::new(StubFlow::new(1), 2)
            .run(supplied.clone(), criteria(), report.completed, |_, _| {})
            .await
            .unwrap();
        assert_eq!(resumed.completed.len(), 6);
        assert_eq!(titles(&resumed.completed).len(), 6);
    }

    #[tokio::test]
    async fn empty_supplied_settles_immediately() {
        let report = BatchOrchestrator::new(StubFlow::new(1), 2)
            .run(Vec::new(), criteria(), Vec::new(), |_, _| {})
            .await
            .unwrap();
        assert_eq!(report.total_count, 0);
        assert!(report.completed.is_empty());
        assert!((report.progress() - 1.0).abs() < 1e-9);
    }
}
