//! 判定结果模型
//!
//! - `Verdict`：分类后端给出的 纳入/排除 判定及理由
//! - `ClassifiedRecord`：文献记录 + 判定 + 原始行引用，批次累积的结果单元

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::article::{ArticleRecord, OriginalRow};

/// 后端响应缺失 `reason` 字段时使用的占位文本
pub const PLACEHOLDER_REASON: &str = "No reason provided";
/// 后端响应缺失 `criterion` 字段时使用的占位文本
pub const PLACEHOLDER_CRITERION: &str = "No criterion provided";

/// 分类判定
///
/// `criterion` 预期为后端援引的单条标准原文（或 "N. 原文"），
/// 也可能是人工改判哨兵值；下游仅做精确/子串文本比较，不与标准集合校验。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    /// 是否纳入
    pub include: bool,
    /// 判定理由
    pub reason: String,
    /// 起决定作用的标准
    pub criterion: String,
}

/// 已分类的文献记录
///
/// 每条记录每个批次谱系只创建一次；之后仅允许显式人工改判修改，
/// 除整体重置会话外不会删除。
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    /// 文献记录
    pub article: ArticleRecord,
    /// 判定结果
    pub verdict: Verdict,
    /// 导入时的原始行（引用共享，导出时回写未知列）
    pub original: Option<Arc<OriginalRow>>,
}

impl ClassifiedRecord {
    /// 创建已分类记录
    pub fn new(
        article: ArticleRecord,
        verdict: Verdict,
        original: Option<Arc<OriginalRow>>,
    ) -> Self {
        Self {
            article,
            verdict,
            original,
        }
    }

    /// 人工改判 纳入/排除
    ///
    /// 覆写 `include`，并合成固定的审计理由与哨兵标准；不发起任何后端调用。
    pub fn set_manual_classification(&mut self, include: bool) {
        self.verdict.include = include;
        let label = if include { "Include" } else { "Exclude" };
        self.verdict.reason = format!("manually changed to {} by user", label);
        self.verdict.criterion = if include {
            "manually included by user".to_string()
        } else {
            "manually excluded by user".to_string()
        };
    }

    /// 人工改判起决定作用的标准
    ///
    /// 覆写 `criterion`，并合成引用新标准的审计理由。
    pub fn set_manual_criterion(&mut self, criterion: &str) {
        self.verdict.criterion = criterion.to_string();
        self.verdict.reason = format!("manually changed criterion to \"{}\" by user", criterion);
    }
}
