//! 导出服务
//!
//! 产出两部分内容：
//! - 结果表：每行 = 导入时的原始行所有列 + 追加的
//!   `classification`("Include"/"Exclude")/`reason`/`criterion` 三列；
//!   首行另带管道分隔的 `inclusion_criteria`/`exclusion_criteria` 两列，
//!   供再次导入时恢复标准集合
//! - 标准表：当前生效的 纳入/排除 标准逐条编号
//!
//! 导出后再导入（既往结果路径）能为每条记录还原出相同的判定。

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::models::{ClassifiedRecord, CriteriaSet, OriginalRow};

/// 导出文档（结果表 + 标准表）
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    /// 结果表
    pub results: Vec<OriginalRow>,
    /// 标准表
    pub criteria: Vec<CriteriaSheetRow>,
}

/// 标准表中的一行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CriteriaSheetRow {
    /// 标准类别："inclusion" 或 "exclusion"
    pub kind: String,
    /// 组内编号（从 1 开始）
    pub number: usize,
    /// 标准原文
    pub criterion: String,
}

/// 构建导出文档
pub fn build_export(records: &[ClassifiedRecord], criteria: &CriteriaSet) -> ExportDocument {
    let (inclusion_pipe, exclusion_pipe) = criteria.to_pipe_strings();

    let results = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let mut row = export_row(record);
            if index == 0 {
                set_column(&mut row, "inclusion_criteria", Value::String(inclusion_pipe.clone()));
                set_column(&mut row, "exclusion_criteria", Value::String(exclusion_pipe.clone()));
            }
            row
        })
        .collect();

    ExportDocument {
        results,
        criteria: criteria_sheet(criteria),
    }
}

/// 写出导出文档
pub async fn write_export_file(path: &Path, document: &ExportDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(document).context("序列化导出文档失败")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("写入导出文件失败: {}", path.display()))?;
    info!(
        "📤 已导出 {} 条结果到 {}",
        document.results.len(),
        path.display()
    );
    Ok(())
}

/// 单条记录的导出行：原始列原序保留 + 判定三列
fn export_row(record: &ClassifiedRecord) -> OriginalRow {
    let mut row = match &record.original {
        Some(original) => (**original).clone(),
        // 无原始行时（如恢复自会话的记录）从记录本身合成最小行
        None => synthesize_row(record),
    };

    let label = if record.verdict.include {
        "Include"
    } else {
        "Exclude"
    };
    set_column(&mut row, "classification", Value::String(label.to_string()));
    set_column(
        &mut row,
        "reason",
        Value::String(record.verdict.reason.clone()),
    );
    set_column(
        &mut row,
        "criterion",
        Value::String(record.verdict.criterion.clone()),
    );
    row
}

fn synthesize_row(record: &ClassifiedRecord) -> OriginalRow {
    let mut map = serde_json::Map::new();
    map.insert(
        "title".to_string(),
        Value::String(record.article.title.clone()),
    );
    map.insert(
        "abstract".to_string(),
        Value::String(record.article.abstract_text.clone()),
    );
    if let Some(doi) = &record.article.doi {
        map.insert("doi".to_string(), Value::String(doi.clone()));
    }
    if let Some(source) = &record.article.source {
        map.insert("source".to_string(), Value::String(source.clone()));
    }
    OriginalRow::new(map)
}

/// 覆写列值：先移除同名列（折叠大小写），再按当前值追加，避免重复列
fn set_column(row: &mut OriginalRow, column: &str, value: Value) {
    let wanted = column.to_lowercase();
    row.0.retain(|name, _| name.to_lowercase() != wanted);
    row.0.insert(column.to_string(), value);
}

fn criteria_sheet(criteria: &CriteriaSet) -> Vec<CriteriaSheetRow> {
    let numbered = |kind: &str, list: &[String]| {
        list.iter()
            .enumerate()
            .map(|(i, text)| CriteriaSheetRow {
                kind: kind.to_string(),
                number: i + 1,
                criterion: text.clone(),
            })
            .collect::<Vec<_>>()
    };

    let mut sheet = numbered("inclusion", &criteria.inclusion);
    sheet.extend(numbered("exclusion", &criteria.exclusion));
    sheet
}
