//! 结果聚合服务
//!
//! 职责：
//! - 整体统计：纳入/排除 计数与总数
//! - 按标准分组统计：按 `verdict.criterion` 裁剪后的原文分组，
//!   计算各组 纳入/排除/总数 与纳入率，按总数降序排列
//! - 去重标准列表：供筛选器展示
//! - 筛选谓词：分类结果 + 标准子串 的组合过滤
//!
//! 所有函数均为只读的纯计算，不触碰批次状态。

use std::collections::BTreeMap;

use crate::models::ClassifiedRecord;

/// 整体统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverallStats {
    /// 纳入数
    pub included: usize,
    /// 排除数
    pub excluded: usize,
    /// 总数（= included + excluded）
    pub total: usize,
}

/// 单条标准的分组统计
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionStats {
    /// 标准原文（裁剪前后空白）
    pub criterion: String,
    /// 该标准下纳入的记录数
    pub included: usize,
    /// 该标准下排除的记录数
    pub excluded: usize,
    /// 该标准下的记录总数
    pub total: usize,
    /// 纳入率（included / total）
    pub inclusion_rate: f64,
}

/// 分类结果过滤条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationFilter {
    /// 不过滤
    All,
    /// 仅纳入
    Include,
    /// 仅排除
    Exclude,
}

/// 计算整体统计
pub fn overall_stats(completed: &[ClassifiedRecord]) -> OverallStats {
    let included = completed.iter().filter(|r| r.verdict.include).count();
    OverallStats {
        included,
        excluded: completed.len() - included,
        total: completed.len(),
    }
}

/// 按标准分组统计
///
/// 分组键是 `verdict.criterion` 裁剪空白后的精确原文；
/// 空白标准的记录不参与分组（但仍计入整体统计）。
/// 输出按 total 降序，total 相同按标准文本升序，保证排序稳定可复现。
pub fn criterion_stats(completed: &[ClassifiedRecord]) -> Vec<CriterionStats> {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

    for record in completed {
        let criterion = record.verdict.criterion.trim();
        if criterion.is_empty() {
            continue;
        }
        let entry = groups.entry(criterion).or_insert((0, 0));
        if record.verdict.include {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let mut stats: Vec<CriterionStats> = groups
        .into_iter()
        .map(|(criterion, (included, excluded))| {
            let total = included + excluded;
            CriterionStats {
                criterion: criterion.to_string(),
                included,
                excluded,
                total,
                inclusion_rate: included as f64 / total as f64,
            }
        })
        .collect();

    // BTreeMap 已按文本升序，稳定排序后 total 相同的组保持文本序
    stats.sort_by(|a, b| b.total.cmp(&a.total));
    stats
}

/// 去重后的标准列表
///
/// 按 裁剪+大小写折叠 去重，但保留每个键第一次出现的原始大小写用于展示；
/// 结果按字典序排列。空白标准不收录。
pub fn unique_criteria(completed: &[ClassifiedRecord]) -> Vec<String> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();

    for record in completed {
        let criterion = record.verdict.criterion.trim();
        if criterion.is_empty() {
            continue;
        }
        seen.entry(criterion.to_lowercase())
            .or_insert_with(|| criterion.to_string());
    }

    let mut criteria: Vec<String> = seen.into_values().collect();
    criteria.sort();
    criteria
}

/// 筛选谓词
///
/// 分类条件命中 且（标准条件为空 或 在 `verdict.criterion` 中
/// 不区分大小写地子串匹配）时返回 true。
pub fn matches_filter(
    record: &ClassifiedRecord,
    classification: ClassificationFilter,
    criterion_filter: &str,
) -> bool {
    let classification_hit = match classification {
        ClassificationFilter::All => true,
        ClassificationFilter::Include => record.verdict.include,
        ClassificationFilter::Exclude => !record.verdict.include,
    };
    if !classification_hit {
        return false;
    }

    let needle = criterion_filter.trim();
    if needle.is_empty() {
        return true;
    }
    record
        .verdict
        .criterion
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

/// 应用筛选条件，返回命中的记录引用
pub fn filter_records<'a>(
    completed: &'a [ClassifiedRecord],
    classification: ClassificationFilter,
    criterion_filter: &str,
) -> Vec<&'a ClassifiedRecord> {
    completed
        .iter()
        .filter(|record| matches_filter(record, classification, criterion_filter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleRecord, Verdict};

    fn record(title: &str, include: bool, criterion: &str) -> ClassifiedRecord {
        ClassifiedRecord::new(
            ArticleRecord {
                title: title.to_string(),
                abstract_text: format!("{} abstract", title),
                doi: None,
                source: None,
            },
            Verdict {
                include,
                reason: "r".to_string(),
                criterion: criterion.to_string(),
            },
            None,
        )
    }

    #[test]
    fn overall_counts_add_up() {
        let completed = vec![
            record("a", true, "1. trial"),
            record("b", false, "1. animal"),
            record("c", true, "1. trial"),
        ];
        let stats = overall_stats(&completed);
        assert_eq!(stats.included, 2);
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.included + stats.excluded, completed.len());
    }

    #[test]
    fn criterion_groups_sorted_by_total_desc() {
        let completed = vec![
            record("a", true, "1. trial"),
            record("b", true, "1. trial"),
            record("c", false, "1. trial"),
            record("d", false, "1. animal"),
        ];
        let stats = criterion_stats(&completed);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].criterion, "1. trial");
        assert_eq!(stats[0].total, 3);
        assert_eq!(stats[0].included, 2);
        assert_eq!(stats[0].excluded, 1);
        assert!((stats[0].inclusion_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats[1].criterion, "1. animal");
    }

    #[test]
    fn criterion_tie_breaks_on_text() {
        let completed = vec![
            record("a", true, "b criterion"),
            record("b", true, "a criterion"),
        ];
        let stats = criterion_stats(&completed);
        assert_eq!(stats[0].criterion, "a criterion");
        assert_eq!(stats[1].criterion, "b criterion");
    }

    #[test]
    fn empty_criterion_skipped_in_groups_but_counted_overall() {
        let completed = vec![
            record("a", true, "1. trial"),
            record("b", false, "   "),
            record("c", false, ""),
        ];
        let stats = criterion_stats(&completed);
        let grouped: usize = stats.iter().map(|s| s.total).sum();
        let with_empty = completed
            .iter()
            .filter(|r| r.verdict.criterion.trim().is_empty())
            .count();
        // 聚合守恒：分组总数 + 空白标准记录数 == 完成总数
        assert_eq!(grouped + with_empty, completed.len());
        assert_eq!(overall_stats(&completed).total, 3);
    }

    #[test]
    fn criterion_keys_are_trimmed() {
        let completed = vec![
            record("a", true, "  1. trial  "),
            record("b", false, "1. trial"),
        ];
        let stats = criterion_stats(&completed);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total, 2);
    }

    #[test]
    fn unique_criteria_case_folds_but_keeps_first_casing() {
        let completed = vec![
            record("a", true, "Clinical Trial"),
            record("b", false, "clinical trial"),
            record("c", false, "Animal Study"),
        ];
        let criteria = unique_criteria(&completed);
        assert_eq!(criteria, vec!["Animal Study", "Clinical Trial"]);
    }

    #[test]
    fn filter_combines_classification_and_substring() {
        let completed = vec![
            record("a", true, "1. clinical trial"),
            record("b", false, "1. animal study"),
            record("c", true, "2. human subjects"),
        ];

        let hits = filter_records(&completed, ClassificationFilter::Include, "trial");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].article.title, "a");

        // 子串匹配不区分大小写
        let hits = filter_records(&completed, ClassificationFilter::All, "ANIMAL");
        assert_eq!(hits.len(), 1);

        let hits = filter_records(&completed, ClassificationFilter::Exclude, "");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].article.title, "b");

        let hits = filter_records(&completed, ClassificationFilter::All, "");
        assert_eq!(hits.len(), 3);
    }
}
