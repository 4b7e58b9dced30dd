//! 程序配置
//!
//! 配置优先级：环境变量 > TOML 配置文件 > 默认值

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时进行的分类调用数量（并发窗口 K）
    pub max_concurrent_classifications: usize,
    /// 分类后端提供方："openai"（OpenAI 兼容托管服务）或 "ollama"（本地服务）
    pub provider: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 待筛选记录文件（已解析的表格行，JSON 数组）
    pub input_file: String,
    /// 筛选结果输出文件
    pub output_file: String,
    /// 会话状态文件（上次使用的标准/提供方/模型）
    pub session_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 托管服务单次调用超时（秒）
    pub openai_timeout_secs: u64,
    // --- Ollama 配置 ---
    pub ollama_base_url: String,
    pub ollama_model_name: String,
    /// 本地服务单次调用超时（秒）
    pub ollama_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_classifications: 2,
            provider: "openai".to_string(),
            verbose_logging: false,
            input_file: "records.json".to_string(),
            output_file: "screened.json".to_string(),
            session_file: "session.json".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            openai_timeout_secs: 60,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model_name: "llama3.1:8b".to_string(),
            ollama_timeout_secs: 120,
        }
    }
}

/// TOML 配置文件的可选字段（缺省字段回落到默认值）
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    max_concurrent_classifications: Option<usize>,
    provider: Option<String>,
    verbose_logging: Option<bool>,
    input_file: Option<String>,
    output_file: Option<String>,
    session_file: Option<String>,
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    openai_timeout_secs: Option<u64>,
    ollama_base_url: Option<String>,
    ollama_model_name: Option<String>,
    ollama_timeout_secs: Option<u64>,
}

impl Config {
    /// 从环境变量加载配置（未设置的项使用默认值）
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// 加载完整配置：先读 TOML 文件（若存在），再应用环境变量覆盖
    pub fn load(config_path: &str) -> Result<Self> {
        let base = if Path::new(config_path).exists() {
            Self::from_toml_file(config_path)?
        } else {
            Self::default()
        };
        Ok(base.apply_env())
    }

    /// 从 TOML 配置文件加载
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path))?;

        let default = Self::default();
        Ok(Self {
            max_concurrent_classifications: file
                .max_concurrent_classifications
                .unwrap_or(default.max_concurrent_classifications),
            provider: file.provider.unwrap_or(default.provider),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
            input_file: file.input_file.unwrap_or(default.input_file),
            output_file: file.output_file.unwrap_or(default.output_file),
            session_file: file.session_file.unwrap_or(default.session_file),
            llm_api_key: file.llm_api_key.unwrap_or(default.llm_api_key),
            llm_api_base_url: file.llm_api_base_url.unwrap_or(default.llm_api_base_url),
            llm_model_name: file.llm_model_name.unwrap_or(default.llm_model_name),
            openai_timeout_secs: file.openai_timeout_secs.unwrap_or(default.openai_timeout_secs),
            ollama_base_url: file.ollama_base_url.unwrap_or(default.ollama_base_url),
            ollama_model_name: file.ollama_model_name.unwrap_or(default.ollama_model_name),
            ollama_timeout_secs: file.ollama_timeout_secs.unwrap_or(default.ollama_timeout_secs),
        })
    }

    fn apply_env(self) -> Self {
        Self {
            max_concurrent_classifications: std::env::var("MAX_CONCURRENT_CLASSIFICATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.max_concurrent_classifications),
            provider: std::env::var("SCREENER_PROVIDER").unwrap_or(self.provider),
            verbose_logging: std::env::var("VERBOSE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.verbose_logging),
            input_file: std::env::var("INPUT_FILE").unwrap_or(self.input_file),
            output_file: std::env::var("OUTPUT_FILE").unwrap_or(self.output_file),
            session_file: std::env::var("SESSION_FILE").unwrap_or(self.session_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            openai_timeout_secs: std::env::var("OPENAI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.openai_timeout_secs),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL").unwrap_or(self.ollama_base_url),
            ollama_model_name: std::env::var("OLLAMA_MODEL_NAME")
                .unwrap_or(self.ollama_model_name),
            ollama_timeout_secs: std::env::var("OLLAMA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.ollama_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_concurrency_is_two() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_classifications, 2);
    }

    #[test]
    fn default_timeouts_match_provider_profile() {
        let config = Config::default();
        assert_eq!(config.openai_timeout_secs, 60);
        assert_eq!(config.ollama_timeout_secs, 120);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = std::env::temp_dir().join("article_screener_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "provider = \"ollama\"\nmax_concurrent_classifications = 4\n",
        )
        .unwrap();

        let config = Config::from_toml_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.max_concurrent_classifications, 4);
        // 未出现的字段保持默认
        assert_eq!(config.ollama_timeout_secs, 120);
    }
}
