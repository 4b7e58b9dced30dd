//! 领域错误类型
//!
//! 按领域划分错误：分类调用错误（逐条记录、非致命）、导入错误（仅中止本次导入）。
//! 应用层的文件/配置等失败直接走 `anyhow`，不再额外包装。

use thiserror::Error;

/// 分类后端调用错误
///
/// 所有变体均为"逐条记录"级别：编排器捕获后跳过该记录，
/// 不会中止整个批次，也不会影响同批次的其他在途任务。
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// 调用超时（本地超时机制已中止在途请求，并发槽位立即释放）
    #[error("分类调用超时 (模型: {model}, 限时: {timeout_secs}秒)")]
    Timeout { model: String, timeout_secs: u64 },

    /// 响应中找不到可解析的 JSON 判定对象
    #[error("无法从响应中解析判定 JSON: {response}")]
    MalformedResponse { response: String },

    /// 网络/HTTP 层失败
    #[error("请求分类后端失败 ({endpoint}): {detail}")]
    Transport { endpoint: String, detail: String },

    /// 后端返回了空结果
    #[error("分类后端返回内容为空 (模型: {model})")]
    EmptyResponse { model: String },

    /// 未配置凭证（在批次开始前暴露，不产生逐条错误）
    #[error("未配置 {provider} 的访问凭证")]
    NoCredentials { provider: String },
}

/// 导入错误
///
/// 仅中止本次导入操作，不影响已有状态。
#[derive(Debug, Error)]
pub enum ImportError {
    /// 输入没有任何数据行
    #[error("导入内容为空，没有任何数据行")]
    EmptyInput,

    /// 缺少必需列
    #[error("导入内容缺少必需列: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
}
