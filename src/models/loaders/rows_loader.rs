//! 表格行加载器
//!
//! 电子表格解析属于外部协作方；本模块只消费"已解析的表格行"：
//! 一个 JSON 文件，内容为对象数组，每个对象即一行（列名 → 值）。

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tokio::fs;

use crate::models::article::OriginalRow;

/// 从 JSON 文件加载已解析的表格行
pub async fn load_rows_file(path: &Path) -> Result<Vec<OriginalRow>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取记录文件: {}", path.display()))?;

    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("无法解析记录文件: {}", path.display()))?;

    let Value::Array(entries) = parsed else {
        anyhow::bail!("记录文件顶层必须是 JSON 数组: {}", path.display());
    };

    let mut rows = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match entry {
            Value::Object(columns) => rows.push(OriginalRow::new(columns)),
            other => {
                tracing::warn!("第 {} 行不是对象，已跳过: {}", index + 1, other);
            }
        }
    }

    tracing::info!("成功加载 {} 行记录", rows.len());
    Ok(rows)
}
