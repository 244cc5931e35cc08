//! PDF获取：按固定顺序尝试多个下载来源，第一个通过校验的文件胜出

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::AcquisitionConfig;
use crate::utils::{panic_message, sanitize_file_name};

pub mod strategies;
pub mod validator;

pub use validator::validate_pdf;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// 标识符不适用于该来源（例如需要DOI）
    #[error("不适用: {0}")]
    NotApplicable(String),

    #[error("未找到PDF链接")]
    NoPdfLink,

    #[error("HTTP请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("文件写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("响应解析失败: {0}")]
    Parse(String),
}

/// 一个独立的PDF下载来源
#[async_trait]
pub trait PdfStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// 尝试把PDF下载到 `output_dir/{title}.pdf`，`title` 已经过清理
    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError>;
}

/// 单个来源的一次尝试结果
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub source: &'static str,
    pub success: bool,
    pub path: Option<PathBuf>,
    pub reason: Option<String>,
}

impl DownloadOutcome {
    fn succeeded(source: &'static str, path: PathBuf) -> Self {
        Self {
            source,
            success: true,
            path: Some(path),
            reason: None,
        }
    }

    fn failed(source: &'static str, reason: impl Into<String>) -> Self {
        Self {
            source,
            success: false,
            path: None,
            reason: Some(reason.into()),
        }
    }
}

/// 一次 `acquire` 的结果及每个来源的尝试记录
#[derive(Debug, Clone, Default)]
pub struct AcquisitionReport {
    pub path: Option<PathBuf>,
    pub outcomes: Vec<DownloadOutcome>,
}

/// 批量接口的参数，单个值会被包装为长度为1的列表
#[derive(Debug, Clone)]
pub enum BatchInput {
    One(String),
    Many(Vec<String>),
}

impl BatchInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            BatchInput::One(value) => vec![value],
            BatchInput::Many(values) => values,
        }
    }
}

impl From<&str> for BatchInput {
    fn from(value: &str) -> Self {
        BatchInput::One(value.to_string())
    }
}

impl From<String> for BatchInput {
    fn from(value: String) -> Self {
        BatchInput::One(value)
    }
}

impl From<Vec<String>> for BatchInput {
    fn from(values: Vec<String>) -> Self {
        BatchInput::Many(values)
    }
}

impl From<&[String]> for BatchInput {
    fn from(values: &[String]) -> Self {
        BatchInput::Many(values.to_vec())
    }
}

pub struct PdfAcquirer {
    strategies: Vec<Box<dyn PdfStrategy>>,
    download_root: PathBuf,
}

impl PdfAcquirer {
    pub fn new(strategies: Vec<Box<dyn PdfStrategy>>, download_root: impl Into<PathBuf>) -> Self {
        Self {
            strategies,
            download_root: download_root.into(),
        }
    }

    /// 使用全部六个来源：Unpaywall、arXiv、Google Scholar、Sci-Hub、CrossRef、Giiisp
    pub fn from_config(config: &AcquisitionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .context("无法创建下载HTTP客户端")?;
        Ok(Self::new(
            strategies::default_chain(http, config),
            config.download_root.clone(),
        ))
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// 获取单篇论文的PDF，所有来源都失败时返回None
    pub async fn acquire(&self, identifier: &str, title: &str, output_dir: &Path) -> Option<PathBuf> {
        self.acquire_with_report(identifier, title, output_dir)
            .await
            .path
    }

    pub async fn acquire_with_report(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> AcquisitionReport {
        let clean_title = sanitize_file_name(title);
        let mut report = AcquisitionReport::default();

        for strategy in &self.strategies {
            let source = strategy.name();
            tracing::info!(source, identifier, "尝试下载PDF");

            let attempt = AssertUnwindSafe(strategy.attempt(identifier, &clean_title, output_dir))
                .catch_unwind()
                .await;

            let outcome = match attempt {
                Ok(Ok(path)) => {
                    if validate_pdf(&path).await {
                        tracing::info!(source, path = %path.display(), "✅ 成功下载PDF");
                        report.path = Some(path.clone());
                        report.outcomes.push(DownloadOutcome::succeeded(source, path));
                        return report;
                    }
                    tracing::warn!(source, path = %path.display(), "下载的文件未通过PDF校验");
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        tracing::debug!(path = %path.display(), error = %e, "无法删除无效文件");
                    }
                    DownloadOutcome::failed(source, "文件未通过PDF校验")
                }
                Ok(Err(e)) => {
                    tracing::error!(source, error = %e, "下载失败");
                    DownloadOutcome::failed(source, e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(source, panic = %message, "下载来源发生异常");
                    DownloadOutcome::failed(source, format!("panic: {}", message))
                }
            };
            report.outcomes.push(outcome);
        }

        tracing::warn!(identifier, "所有下载方法都失败了");
        report
    }

    /// 批量下载到 `download_root/{topic}`。结果按输入顺序排列，失败项被跳过。
    pub async fn acquire_all(
        &self,
        identifiers: impl Into<BatchInput>,
        titles: impl Into<BatchInput>,
        topic: &str,
    ) -> Vec<PathBuf> {
        let identifiers = identifiers.into().into_vec();
        let titles = titles.into().into_vec();

        let topic_dir = self.download_root.join(sanitize_file_name(topic));
        if let Err(e) = tokio::fs::create_dir_all(&topic_dir).await {
            tracing::error!(dir = %topic_dir.display(), error = %e, "无法创建主题目录");
            return Vec::new();
        }

        let mut downloaded = Vec::new();
        for (i, identifier) in identifiers.iter().enumerate() {
            let title = titles
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("paper_{}", i + 1));
            tracing::info!(index = i + 1, title = %title, "开始下载文献");

            match self.acquire(identifier, &title, &topic_dir).await {
                Some(path) => downloaded.push(path),
                None => tracing::warn!(title = %title, identifier = %identifier, "下载失败"),
            }
        }

        tracing::info!(count = downloaded.len(), "批量下载完成");
        downloaded
    }
}
