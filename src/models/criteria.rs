//! 筛选标准集合
//!
//! 纳入标准与排除标准各为一个有序的非空字符串序列。
//! 顺序仅影响展示给分类后端的编号（"N. 标准文本"）。
//! 批次运行期间标准不可变（以 `Arc<CriteriaSet>` 传递，不提供运行中修改入口）。

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// 导出文件中标准列使用的分隔符
const CRITERIA_SEPARATOR: char = '|';

/// 筛选标准集合
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CriteriaSet {
    /// 纳入标准（有序、非空）
    pub inclusion: Vec<String>,
    /// 排除标准（有序、非空）
    pub exclusion: Vec<String>,
}

impl CriteriaSet {
    /// 创建标准集合（两类标准均不得为空）
    pub fn new(inclusion: Vec<String>, exclusion: Vec<String>) -> Result<Self> {
        if inclusion.is_empty() {
            bail!("纳入标准不能为空");
        }
        if exclusion.is_empty() {
            bail!("排除标准不能为空");
        }
        Ok(Self {
            inclusion,
            exclusion,
        })
    }

    /// 渲染编号后的纳入标准列表（"1. xxx" 每行一条）
    pub fn numbered_inclusion(&self) -> String {
        numbered(&self.inclusion)
    }

    /// 渲染编号后的排除标准列表
    pub fn numbered_exclusion(&self) -> String {
        numbered(&self.exclusion)
    }

    /// 序列化为导出列使用的管道分隔字符串，返回 (纳入, 排除)
    pub fn to_pipe_strings(&self) -> (String, String) {
        (
            self.inclusion.join(&CRITERIA_SEPARATOR.to_string()),
            self.exclusion.join(&CRITERIA_SEPARATOR.to_string()),
        )
    }

    /// 从导出列的管道分隔字符串恢复标准集合
    ///
    /// 任一侧恢复后为空则返回 `None`（无法构成合法集合）。
    pub fn from_pipe_strings(inclusion: &str, exclusion: &str) -> Option<Self> {
        let parse = |raw: &str| -> Vec<String> {
            raw.split(CRITERIA_SEPARATOR)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        };

        let set = Self {
            inclusion: parse(inclusion),
            exclusion: parse(exclusion),
        };
        if set.inclusion.is_empty() || set.exclusion.is_empty() {
            None
        } else {
            Some(set)
        }
    }
}

fn numbered(criteria: &[String]) -> String {
    criteria
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}
