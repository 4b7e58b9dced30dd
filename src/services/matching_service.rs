//! 记录匹配服务
//!
//! 记录没有独立主键，所有关联都靠 `(标题, 摘要)` 内容身份：
//! - 断点续筛时用已完成结果集对候选记录做差集
//! - 导出回写时为每条结果找回导入时的原始行
//!
//! 匹配为线性精确扫描，取第一个命中。同一批次内假定身份唯一，
//! 重复身份会静默匹配到先出现的那条（与差集语义一致的已知局限）。

use std::sync::Arc;

use crate::models::{ArticleRecord, ClassifiedRecord, OriginalRow};

/// 在原始行中找回某条记录对应的行
pub fn find_original_row(
    article: &ArticleRecord,
    rows: &[Arc<OriginalRow>],
) -> Option<Arc<OriginalRow>> {
    rows.iter()
        .find(|row| article.matches_row(row))
        .cloned()
}

/// 判断某条记录是否已存在于结果集中（按内容身份）
pub fn is_completed(article: &ArticleRecord, completed: &[ClassifiedRecord]) -> bool {
    completed
        .iter()
        .any(|record| record.article.same_identity(article))
}

/// 计算待处理差集：候选记录中剔除已有结果的部分，保持供给顺序
pub fn pending_records(
    supplied: &[ArticleRecord],
    completed: &[ClassifiedRecord],
) -> Vec<ArticleRecord> {
    supplied
        .iter()
        .filter(|article| !is_completed(article, completed))
        .cloned()
        .collect()
}

/// 计算身份交集大小：候选记录中已有结果的条数
///
/// 结果集中与候选记录无关的条目（如换了输入文件后残留的旧结果）不计入。
pub fn completed_overlap(supplied: &[ArticleRecord], completed: &[ClassifiedRecord]) -> usize {
    supplied
        .iter()
        .filter(|article| is_completed(article, completed))
        .count()
}
