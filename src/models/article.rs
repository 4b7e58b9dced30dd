//! 文献记录与原始行模型
//!
//! - `ArticleRecord`：一条待筛选的文献（标题 + 摘要 + 可选元数据），分类的最小单元
//! - `OriginalRow`：导入时逐列原样保留的开放式行数据，供导出时回写未知列
//!
//! 记录没有独立主键，身份即 `(title, abstract)` 内容对。
//! 同一批次内假定该内容对唯一；重复内容对会导致匹配歧义（已知局限）。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `source` 列的别名（按出现优先级排列）
const SOURCE_ALIASES: [&str; 4] = ["source", "journal", "publication", "venue"];

/// 一条待筛选的文献记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleRecord {
    /// 标题（导入过滤后保证非空）
    pub title: String,
    /// 摘要（导入过滤后保证非空）
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// DOI（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// 来源期刊/出版物（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ArticleRecord {
    /// 判断两条记录是否为同一篇文献（身份 = 标题 + 摘要 精确相等）
    pub fn same_identity(&self, other: &ArticleRecord) -> bool {
        self.title == other.title && self.abstract_text == other.abstract_text
    }

    /// 判断本记录是否对应某个原始行（按标题 + 摘要 精确相等）
    pub fn matches_row(&self, row: &OriginalRow) -> bool {
        row.get_str("title").as_deref() == Some(self.title.as_str())
            && row.get_str("abstract").as_deref() == Some(self.abstract_text.as_str())
    }

    /// 从原始行构建记录
    ///
    /// 标题或摘要为空（或缺失）的行返回 `None`，由调用方静默丢弃。
    /// `source` 按别名顺序取第一个非空列。
    pub fn from_row(row: &OriginalRow) -> Option<Self> {
        let title = row.get_str("title").unwrap_or_default();
        let abstract_text = row.get_str("abstract").unwrap_or_default();

        if title.trim().is_empty() || abstract_text.trim().is_empty() {
            return None;
        }

        let doi = row.get_str("doi").filter(|v| !v.trim().is_empty());
        let source = SOURCE_ALIASES
            .iter()
            .filter_map(|alias| row.get_str(alias))
            .find(|v| !v.trim().is_empty());

        Some(Self {
            title,
            abstract_text,
            doi,
            source,
        })
    }
}

/// 导入时原样保留的一行数据
///
/// 列名到值的有序映射。除 `title`/`abstract` 两列外不做任何校验，
/// 未知列完整保留，导出时按原顺序回写。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OriginalRow(pub Map<String, Value>);

impl OriginalRow {
    /// 从有序列映射构建
    pub fn new(columns: Map<String, Value>) -> Self {
        Self(columns)
    }

    /// 按列名取值（列名折叠大小写后匹配）
    pub fn get(&self, column: &str) -> Option<&Value> {
        let wanted = column.to_lowercase();
        self.0
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, value)| value)
    }

    /// 按列名取字符串值（数字/布尔值转为字符串，null 与缺失视为无值）
    pub fn get_str(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// 是否存在某列（列名折叠大小写）
    pub fn has_column(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// 按原顺序遍历所有列
    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> OriginalRow {
        let mut map = Map::new();
        for (name, value) in pairs {
            map.insert(name.to_string(), value.clone());
        }
        OriginalRow::new(map)
    }

    #[test]
    fn from_row_extracts_required_and_optional_fields() {
        let row = row(&[
            ("Title", json!("Aspirin in primary prevention")),
            ("Abstract", json!("A randomized clinical trial of aspirin.")),
            ("DOI", json!("10.1000/xyz")),
            ("Journal", json!("BMJ")),
        ]);

        let article = ArticleRecord::from_row(&row).unwrap();
        assert_eq!(article.title, "Aspirin in primary prevention");
        assert_eq!(article.doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(article.source.as_deref(), Some("BMJ"));
    }

    #[test]
    fn from_row_drops_missing_title_or_abstract() {
        let no_abstract = row(&[("title", json!("Only a title"))]);
        assert!(ArticleRecord::from_row(&no_abstract).is_none());

        let blank_title = row(&[("title", json!("  ")), ("abstract", json!("text"))]);
        assert!(ArticleRecord::from_row(&blank_title).is_none());
    }

    #[test]
    fn source_alias_priority() {
        let row = row(&[
            ("title", json!("t")),
            ("abstract", json!("a")),
            ("venue", json!("NeurIPS")),
            ("journal", json!("Nature")),
        ]);
        // source 本名缺失时按 journal > publication > venue 的别名顺序取值
        let article = ArticleRecord::from_row(&row).unwrap();
        assert_eq!(article.source.as_deref(), Some("Nature"));
    }

    #[test]
    fn identity_is_title_plus_abstract() {
        let a = ArticleRecord {
            title: "T".to_string(),
            abstract_text: "A".to_string(),
            doi: Some("10.1/a".to_string()),
            source: None,
        };
        let mut b = a.clone();
        b.doi = None;
        assert!(a.same_identity(&b));

        b.abstract_text = "B".to_string();
        assert!(!a.same_identity(&b));
    }

    #[test]
    fn row_lookup_is_case_folded() {
        let row = row(&[("TiTlE", json!("X")), ("count", json!(3))]);
        assert_eq!(row.get_str("title").as_deref(), Some("X"));
        assert_eq!(row.get_str("COUNT").as_deref(), Some("3"));
        assert!(row.get_str("missing").is_none());
    }

    #[test]
    fn row_preserves_column_order() {
        let row = row(&[
            ("z_last", json!(1)),
            ("a_first", json!(2)),
            ("m_mid", json!(3)),
        ]);
        let names: Vec<&str> = row.columns().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["z_last", "a_first", "m_mid"]);
    }
}
