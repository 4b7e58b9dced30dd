//! LLM 分类服务 - 业务能力层
//!
//! 只负责"单条记录的 纳入/排除 判定"能力，不关心批次流程
//!
//! ## 技术栈
//! - 托管服务：使用 `async-openai` crate 调用 OpenAI 兼容 API（单次调用限时 60 秒）
//! - 本地服务：使用 `reqwest` 调用 Ollama `/api/chat`（单次调用限时 120 秒）
//! - 超时由 `tokio::time::timeout` 实现：超时即丢弃在途请求 future，
//!   HTTP 连接随之中止，并发槽位立刻释放
//!
//! 单次尝试，无内部重试；重试语义由调用方通过"继续筛选"实现。

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ClassifyError;
use crate::models::{
    ArticleRecord, CriteriaSet, Verdict, PLACEHOLDER_CRITERION, PLACEHOLDER_REASON,
};
use crate::utils::extract_first_json_object;

/// 托管服务不可用时的静态模型列表
const OPENAI_FALLBACK_MODELS: [&str; 3] = ["gpt-4o", "gpt-4o-mini", "gpt-4.1-mini"];
/// 本地服务不可用时的静态模型列表
const OLLAMA_FALLBACK_MODELS: [&str; 3] = ["llama3.1:8b", "qwen2.5:7b", "mistral:7b"];

/// 分类判定的系统提示词
const CLASSIFY_SYSTEM_PROMPT: &str = "You are a rigorous literature-screening assistant for systematic reviews. \
You judge one article at a time against explicit inclusion and exclusion criteria. \
You always answer with a single JSON object and nothing else.";

/// LLM 分类服务
///
/// 职责：
/// - 构建确定性的判定提示词（编号标准 + 标题/摘要 + 判定规程）
/// - 调用分类后端并在本地强制超时
/// - 从自由文本响应中提取并解析判定 JSON
/// - 只处理单条记录，不出现 Vec<ArticleRecord>
/// - 不触碰批次状态，结果/错误一律交还调用方
pub struct LlmService {
    backend: Backend,
}

/// 具体的后端提供方
enum Backend {
    /// OpenAI 兼容托管服务
    OpenAi {
        client: Client<OpenAIConfig>,
        http: reqwest::Client,
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    },
    /// 本地 Ollama 服务
    Ollama {
        http: reqwest::Client,
        base_url: String,
        model: String,
        timeout: Duration,
    },
}

impl LlmService {
    /// 根据配置创建分类服务
    pub fn new(config: &Config) -> Self {
        match config.provider.as_str() {
            "ollama" => {
                let timeout = Duration::from_secs(config.ollama_timeout_secs);
                Self {
                    backend: Backend::Ollama {
                        http: http_client(timeout),
                        base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
                        model: config.ollama_model_name.clone(),
                        timeout,
                    },
                }
            }
            _ => {
                let openai_config = OpenAIConfig::new()
                    .with_api_key(&config.llm_api_key)
                    .with_api_base(&config.llm_api_base_url);
                let timeout = Duration::from_secs(config.openai_timeout_secs);
                Self {
                    backend: Backend::OpenAi {
                        client: Client::with_config(openai_config),
                        http: http_client(timeout),
                        api_key: config.llm_api_key.clone(),
                        base_url: config.llm_api_base_url.trim_end_matches('/').to_string(),
                        model: config.llm_model_name.clone(),
                        timeout,
                    },
                }
            }
        }
    }

    /// 当前提供方名称
    pub fn provider_name(&self) -> &'static str {
        match &self.backend {
            Backend::OpenAi { .. } => "openai",
            Backend::Ollama { .. } => "ollama",
        }
    }

    /// 当前使用的模型名称
    pub fn model_name(&self) -> &str {
        match &self.backend {
            Backend::OpenAi { model, .. } => model,
            Backend::Ollama { model, .. } => model,
        }
    }

    /// 批次开始前的凭证检查
    ///
    /// 托管服务未配置 API Key 时返回 `NoCredentials`；本地服务无需凭证。
    pub fn check_credentials(&self) -> Result<(), ClassifyError> {
        match &self.backend {
            Backend::OpenAi { api_key, .. } if api_key.is_empty() => {
                Err(ClassifyError::NoCredentials {
                    provider: "openai".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// 对单条记录执行 纳入/排除 判定
    ///
    /// 单次尝试；超时/网络/解析失败均返回错误，由编排器按"跳过该记录"处理。
    pub async fn classify(
        &self,
        article: &ArticleRecord,
        criteria: &CriteriaSet,
    ) -> Result<Verdict, ClassifyError> {
        self.check_credentials()?;

        let prompt = build_classify_prompt(article, criteria);
        debug!(
            "开始分类，模型: {}, 提示词长度: {} 字符",
            self.model_name(),
            prompt.len()
        );

        let timeout = self.call_timeout();
        let raw = match tokio::time::timeout(timeout, self.send(&prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("分类调用超时，已中止在途请求 (模型: {})", self.model_name());
                return Err(ClassifyError::Timeout {
                    model: self.model_name().to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        parse_verdict(&raw)
    }

    /// 列出可用模型
    ///
    /// 凭证缺失或服务不可达时回落到静态列表，不硬性失败。
    pub async fn list_models(&self) -> Vec<String> {
        match &self.backend {
            Backend::OpenAi {
                http,
                api_key,
                base_url,
                ..
            } => {
                if api_key.is_empty() {
                    debug!("未配置 API Key，使用静态模型列表");
                    return fallback(&OPENAI_FALLBACK_MODELS);
                }
                match list_openai_models(http, base_url, api_key).await {
                    Ok(models) if !models.is_empty() => models,
                    Ok(_) => fallback(&OPENAI_FALLBACK_MODELS),
                    Err(e) => {
                        warn!("获取模型列表失败，使用静态列表: {}", e);
                        fallback(&OPENAI_FALLBACK_MODELS)
                    }
                }
            }
            Backend::Ollama { http, base_url, .. } => {
                match list_ollama_models(http, base_url).await {
                    Ok(models) if !models.is_empty() => models,
                    Ok(_) => fallback(&OLLAMA_FALLBACK_MODELS),
                    Err(e) => {
                        warn!("获取模型列表失败，使用静态列表: {}", e);
                        fallback(&OLLAMA_FALLBACK_MODELS)
                    }
                }
            }
        }
    }

    fn call_timeout(&self) -> Duration {
        match &self.backend {
            Backend::OpenAi { timeout, .. } => *timeout,
            Backend::Ollama { timeout, .. } => *timeout,
        }
    }

    /// 发送提示词，返回原始响应文本
    async fn send(&self, prompt: &str) -> Result<String, ClassifyError> {
        match &self.backend {
            Backend::OpenAi {
                client,
                base_url,
                model,
                ..
            } => {
                let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                    .content(CLASSIFY_SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| transport(base_url, e))?;
                let user_msg = ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| transport(base_url, e))?;

                let request = CreateChatCompletionRequestArgs::default()
                    .model(model)
                    .messages(vec![
                        ChatCompletionRequestMessage::System(system_msg),
                        ChatCompletionRequestMessage::User(user_msg),
                    ])
                    .temperature(0.0)
                    .max_tokens(1024u32)
                    .build()
                    .map_err(|e| transport(base_url, e))?;

                let response = client
                    .chat()
                    .create(request)
                    .await
                    .map_err(|e| transport(base_url, e))?;

                let content = response
                    .choices
                    .first()
                    .and_then(|choice| choice.message.content.clone())
                    .ok_or_else(|| ClassifyError::EmptyResponse {
                        model: model.clone(),
                    })?;

                debug!("托管服务调用成功，响应长度: {} 字符", content.len());
                Ok(content)
            }
            Backend::Ollama {
                http,
                base_url,
                model,
                ..
            } => {
                let endpoint = format!("{}/api/chat", base_url);
                let body = serde_json::json!({
                    "model": model,
                    "messages": [
                        {"role": "system", "content": CLASSIFY_SYSTEM_PROMPT},
                        {"role": "user", "content": prompt},
                    ],
                    "stream": false,
                });

                let response = http
                    .post(&endpoint)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| transport(&endpoint, e))?;

                let status = response.status();
                let payload: Value = response
                    .json()
                    .await
                    .map_err(|e| transport(&endpoint, e))?;

                if !status.is_success() {
                    // 非 2xx：带上状态码与响应中的 error 字段
                    let detail = payload
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("无错误详情");
                    return Err(ClassifyError::Transport {
                        endpoint,
                        detail: format!("HTTP {}: {}", status.as_u16(), detail),
                    });
                }

                let content = payload
                    .pointer("/message/content")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ClassifyError::EmptyResponse {
                        model: model.clone(),
                    })?;

                debug!("本地服务调用成功，响应长度: {} 字符", content.len());
                Ok(content)
            }
        }
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

fn transport(endpoint: &str, err: impl std::fmt::Display) -> ClassifyError {
    ClassifyError::Transport {
        endpoint: endpoint.to_string(),
        detail: err.to_string(),
    }
}

fn fallback(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}

/// GET {base}/models（OpenAI 兼容的模型列表接口）
async fn list_openai_models(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
) -> Result<Vec<String>, ClassifyError> {
    let endpoint = format!("{}/models", base_url);
    let response = http
        .get(&endpoint)
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|e| transport(&endpoint, e))?;

    let status = response.status();
    let payload: Value = response.json().await.map_err(|e| transport(&endpoint, e))?;

    if !status.is_success() {
        let detail = payload
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .unwrap_or("无错误详情");
        return Err(ClassifyError::Transport {
            endpoint,
            detail: format!("HTTP {}: {}", status.as_u16(), detail),
        });
    }

    Ok(payload
        .get("data")
        .and_then(|v| v.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("id").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// GET {base}/api/tags（Ollama 本地模型列表）
async fn list_ollama_models(
    http: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<String>, ClassifyError> {
    let endpoint = format!("{}/api/tags", base_url);
    let response = http
        .get(&endpoint)
        .send()
        .await
        .map_err(|e| transport(&endpoint, e))?;

    let payload: Value = response.json().await.map_err(|e| transport(&endpoint, e))?;

    Ok(payload
        .get("models")
        .and_then(|v| v.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// 构建判定提示词
///
/// 对相同的 (记录, 标准集合) 输入产出完全相同的字符串：
/// 编号纳入列表 + 编号排除列表 + 标题/摘要 + 显式判定规程。
pub fn build_classify_prompt(article: &ArticleRecord, criteria: &CriteriaSet) -> String {
    format!(
        r#"You are screening one scientific article for a systematic review.

Inclusion criteria:
{inclusion}

Exclusion criteria:
{exclusion}

Article:
  Title: {title}
  Abstract: {abstract_text}

Decision procedure:
1. Check every exclusion criterion first. If the article violates any exclusion criterion, it must be excluded, and you must cite the violated exclusion criterion.
2. Otherwise the article is included only if it satisfies at least one inclusion criterion AND violates none of the exclusion criteria. When including, cite the inclusion criterion it satisfies.
3. If it satisfies no inclusion criterion, exclude it and cite the inclusion criterion it fails most clearly.

Respond with exactly one JSON object and no other text:
{{"include": true or false, "reason": "<short justification>", "criterion": "<the single criterion most responsible for the decision, as 'N. text'>"}}"#,
        inclusion = criteria.numbered_inclusion(),
        exclusion = criteria.numbered_exclusion(),
        title = article.title,
        abstract_text = article.abstract_text,
    )
}

/// 从原始响应文本解析判定
///
/// 提取第一个花括号配平的 JSON 对象；
/// `include` 做布尔强制转换（无法转换则整体视为 `MalformedResponse`），
/// 缺失的 `reason`/`criterion` 以占位字符串补齐。
pub fn parse_verdict(raw: &str) -> Result<Verdict, ClassifyError> {
    let malformed = || ClassifyError::MalformedResponse {
        response: crate::utils::logging::truncate_text(raw, 200),
    };

    let json_text = extract_first_json_object(raw).ok_or_else(malformed)?;
    let value: Value = serde_json::from_str(json_text).map_err(|_| malformed())?;

    let include = value.get("include").and_then(coerce_bool).ok_or_else(malformed)?;

    let reason = value
        .get("reason")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(PLACEHOLDER_REASON)
        .to_string();

    let criterion = value
        .get("criterion")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(PLACEHOLDER_CRITERION)
        .to_string();

    Ok(Verdict {
        include,
        reason,
        criterion,
    })
}

/// 布尔强制转换：bool 原样；字符串按常见真值词；数字非零为真
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "include" | "1" => Some(true),
            "false" | "no" | "exclude" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}
