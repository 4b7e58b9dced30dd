//! 会话存储服务
//!
//! 跨次运行持久化用户的工作现场：上次使用的标准集合、分类后端与模型，
//! 以固定键名存为一个 JSON 文件。文件不存在不算错误，读到的就是未设置的默认值。
//!
//! 核心流程不直接触碰任何全局状态，会话能力由调用方显式注入。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::CriteriaSet;

/// 持久化的会话状态
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    /// 上次使用的标准集合
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<CriteriaSet>,
    /// 上次选择的分类后端
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// 上次选择的模型
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// 基于 JSON 文件的会话存储
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// 创建会话存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 会话文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取会话状态（文件不存在时返回默认值）
    pub async fn load(&self) -> Result<SessionState> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let state: SessionState = serde_json::from_str(&content)
                    .with_context(|| format!("解析会话文件失败: {}", self.path.display()))?;
                debug!("已读取会话状态: {}", self.path.display());
                Ok(state)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("会话文件不存在，使用默认值: {}", self.path.display());
                Ok(SessionState::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("读取会话文件失败: {}", self.path.display()))
            }
        }
    }

    /// 写出完整会话状态
    pub async fn save(&self, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("序列化会话状态失败")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("写入会话文件失败: {}", self.path.display()))?;
        info!("💾 会话状态已保存: {}", self.path.display());
        Ok(())
    }

    /// 记住标准集合
    pub async fn remember_criteria(&self, criteria: &CriteriaSet) -> Result<()> {
        let mut state = self.load().await?;
        state.criteria = Some(criteria.clone());
        self.save(&state).await
    }

    /// 记住后端与模型选择
    pub async fn remember_backend(&self, provider: &str, model: &str) -> Result<()> {
        let mut state = self.load().await?;
        state.provider = Some(provider.to_string());
        state.model = Some(model.to_string());
        self.save(&state).await
    }

    /// 重置会话（删除文件；不存在时视为成功）
    pub async fn reset(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("🗑️ 会话状态已重置");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("删除会话文件失败: {}", self.path.display()))
            }
        }
    }
}
