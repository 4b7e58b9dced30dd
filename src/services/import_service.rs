//! 导入分路服务
//!
//! 对解析好的表格行（列名折叠大小写）做纯函数分路：
//! - 首行带任一"结果标记列"→ 按**既往结果**路径恢复已分类记录
//!   （并尝试从首行恢复标准集合）
//! - 否则 → 按**新记录**路径提取待筛选记录
//!
//! 结果标记列固定：`classification`/`reason`/`criterion`
//! 及旧版 `ai_*`/`final_*`/`manual_*` 变体。
//! 导入失败只中止本次导入，不影响既有状态。

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ImportError;
use crate::models::{
    ArticleRecord, ClassifiedRecord, CriteriaSet, OriginalRow, Verdict, PLACEHOLDER_CRITERION,
    PLACEHOLDER_REASON,
};

/// 判定输入为既往结果的标记列
const RESULT_MARKERS: [&str; 12] = [
    "classification",
    "reason",
    "criterion",
    "ai_include",
    "ai_reason",
    "ai_criterion",
    "final_include",
    "final_reason",
    "final_criterion",
    "manual_include",
    "manual_reason",
    "manual_criterion",
];

/// 判定列的解析 schema，按优先级排列：新版导出格式 > final > manual > ai。
/// 取第一个"分类列值非空"的 schema。
const VERDICT_SCHEMAS: [(&str, &str, &str); 4] = [
    ("classification", "reason", "criterion"),
    ("final_include", "final_reason", "final_criterion"),
    ("manual_include", "manual_reason", "manual_criterion"),
    ("ai_include", "ai_reason", "ai_criterion"),
];

/// 导入分路结果
#[derive(Debug)]
pub enum ImportOutcome {
    /// 新记录：待筛选的文献 + 原样保留的行数据
    FreshRecords {
        records: Vec<ArticleRecord>,
        rows: Vec<Arc<OriginalRow>>,
    },
    /// 既往结果：已分类记录（携带原始行引用）+ 恢复出的标准集合（若有）
    PreviousResults {
        records: Vec<ClassifiedRecord>,
        criteria: Option<CriteriaSet>,
    },
}

/// 对导入行做分路
pub fn classify_import(rows: Vec<OriginalRow>) -> Result<ImportOutcome, ImportError> {
    let first = rows.first().ok_or(ImportError::EmptyInput)?;

    let missing: Vec<String> = ["title", "abstract"]
        .iter()
        .filter(|col| !first.has_column(col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns { columns: missing });
    }

    // 标记列只看首行：首行含任一标记即走既往结果路径，
    // 即使同时带有 title/abstract 列也绝不当作新记录
    let is_previous = RESULT_MARKERS
        .iter()
        .any(|marker| first.has_column(marker));

    if is_previous {
        Ok(import_previous_results(rows))
    } else {
        Ok(import_fresh_records(rows))
    }
}

/// 新记录路径
fn import_fresh_records(rows: Vec<OriginalRow>) -> ImportOutcome {
    let rows: Vec<Arc<OriginalRow>> = rows.into_iter().map(Arc::new).collect();
    let mut records = Vec::new();
    let mut dropped = 0usize;

    for row in &rows {
        match ArticleRecord::from_row(row) {
            Some(article) => records.push(article),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("⚠️ 丢弃 {} 行缺少标题或摘要的记录", dropped);
    }
    info!("📥 导入新记录 {} 条", records.len());

    ImportOutcome::FreshRecords { records, rows }
}

/// 既往结果路径
fn import_previous_results(rows: Vec<OriginalRow>) -> ImportOutcome {
    let criteria = recover_criteria(&rows[0]);
    if criteria.is_some() {
        info!("✓ 从导入文件中恢复了筛选标准");
    }

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for row in rows {
        let row = Arc::new(row);
        match ArticleRecord::from_row(&row) {
            Some(article) => {
                let verdict = resolve_verdict(&row);
                records.push(ClassifiedRecord::new(article, verdict, Some(row)));
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("⚠️ 丢弃 {} 行缺少标题或摘要的记录", dropped);
    }
    info!("📥 恢复既往结果 {} 条", records.len());

    ImportOutcome::PreviousResults { records, criteria }
}

/// 从首行的管道分隔列恢复标准集合
fn recover_criteria(first: &OriginalRow) -> Option<CriteriaSet> {
    let inclusion = first.get_str("inclusion_criteria")?;
    let exclusion = first.get_str("exclusion_criteria")?;
    CriteriaSet::from_pipe_strings(&inclusion, &exclusion)
}

/// 按 schema 优先级解析一行的判定
///
/// 取第一个分类列值非空的 schema；该值无法解析为 纳入/排除 时，
/// 以及所有 schema 分类列都为空时，回落为 排除 + 占位理由。
fn resolve_verdict(row: &OriginalRow) -> Verdict {
    for (class_col, reason_col, criterion_col) in VERDICT_SCHEMAS {
        let raw = match row.get_str(class_col) {
            Some(v) if !v.trim().is_empty() => v,
            _ => continue,
        };

        let include = parse_classification(&raw).unwrap_or_else(|| {
            warn!("⚠️ 无法识别的分类值 \"{}\"，按排除处理", raw.trim());
            false
        });

        let reason = row
            .get_str(reason_col)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_REASON.to_string());
        let criterion = row
            .get_str(criterion_col)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_CRITERION.to_string());

        return Verdict {
            include,
            reason,
            criterion,
        };
    }

    Verdict {
        include: false,
        reason: PLACEHOLDER_REASON.to_string(),
        criterion: PLACEHOLDER_CRITERION.to_string(),
    }
}

/// 解析分类值：真值词 → 纳入，假值词 → 排除，其余无法识别
fn parse_classification(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "include" | "included" | "true" | "yes" | "1" => Some(true),
        "exclude" | "excluded" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
