//! PDF 到文本/markdown 的转换服务

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConverterConfig, ConverterKind};

/// 把PDF转换为文本文件，失败时返回None
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, pdf_path: &Path, output_dir: &Path) -> Option<PathBuf>;
}

/// 根据配置选择转换器
pub fn from_config(config: &ConverterConfig) -> Result<Arc<dyn DocumentConverter>> {
    let converter: Arc<dyn DocumentConverter> = match config.kind {
        ConverterKind::Mineru => Arc::new(MineruConverter::from_config(config)?),
        ConverterKind::Local => Arc::new(LocalPdfConverter),
    };
    Ok(converter)
}

fn output_file(pdf_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{}.md", stem))
}

/// MinerU 远程转换：上传 → 提交转换 → 轮询状态 → 下载结果
pub struct MineruConverter {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    poll_interval: Duration,
    max_poll_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    download_url: Option<String>,
}

impl MineruConverter {
    pub fn new(
        http: reqwest::Client,
        api_url: &str,
        api_key: &str,
        poll_interval: Duration,
        max_poll_attempts: Option<u32>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            poll_interval,
            max_poll_attempts,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("无法创建MinerU HTTP客户端")?;
        Ok(Self::new(
            http,
            &config.api_url,
            &config.api_key,
            Duration::from_secs(config.poll_interval_seconds),
            config.max_poll_attempts,
        ))
    }

    async fn upload(&self, pdf_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(pdf_path)
            .await
            .with_context(|| format!("读取PDF失败: {}", pdf_path.display()))?;
        let file_name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response: UploadResponse = self
            .http
            .post(format!("{}/upload", self.api_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.file_id.ok_or_else(|| anyhow!("上传失败，未获取到file_id"))
    }

    async fn start_conversion(&self, file_id: &str) -> Result<String> {
        let response: ConvertResponse = self
            .http
            .post(format!("{}/convert", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({"file_id": file_id, "output_format": "markdown"}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.task_id.ok_or_else(|| anyhow!("转换失败，未获取到task_id"))
    }

    /// 轮询直到完成或失败。未设置 `max_poll_attempts` 时没有总时长上限。
    async fn wait_for_download_url(&self, task_id: &str) -> Result<String> {
        let status_url = format!("{}/status/{}", self.api_url, task_id);
        let mut polls = 0u32;

        loop {
            let status: StatusResponse = self
                .http
                .get(&status_url)
                .bearer_auth(&self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            polls += 1;

            match status.status.as_str() {
                "completed" => {
                    return status
                        .download_url
                        .ok_or_else(|| anyhow!("转换完成但未获取到下载链接"));
                }
                "failed" => bail!("转换失败"),
                other => {
                    tracing::debug!(task_id, status = other, polls, "转换中");
                    if let Some(max) = self.max_poll_attempts
                        && polls >= max
                    {
                        bail!("轮询 {} 次后转换仍未完成", polls);
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn convert_inner(&self, pdf_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let file_id = self.upload(pdf_path).await?;
        let task_id = self.start_conversion(&file_id).await?;
        let download_url = self.wait_for_download_url(&task_id).await?;

        let bytes = self
            .http
            .get(&download_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let md_path = output_file(pdf_path, output_dir);
        tokio::fs::write(&md_path, &bytes).await?;
        Ok(md_path)
    }
}

#[async_trait]
impl DocumentConverter for MineruConverter {
    async fn convert(&self, pdf_path: &Path, output_dir: &Path) -> Option<PathBuf> {
        match self.convert_inner(pdf_path, output_dir).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "PDF转Markdown完成");
                Some(path)
            }
            Err(e) => {
                tracing::error!(pdf = %pdf_path.display(), error = %e, "PDF转Markdown失败");
                None
            }
        }
    }
}

/// 本地转换：用lopdf提取文本层，适合没有转换服务时使用
pub struct LocalPdfConverter;

fn extract_text(pdf_path: &Path) -> Result<String> {
    let document = lopdf::Document::load(pdf_path)
        .with_context(|| format!("lopdf无法打开 {}", pdf_path.display()))?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    document
        .extract_text(&pages)
        .with_context(|| format!("lopdf无法提取文本 {}", pdf_path.display()))
}

#[async_trait]
impl DocumentConverter for LocalPdfConverter {
    async fn convert(&self, pdf_path: &Path, output_dir: &Path) -> Option<PathBuf> {
        let source = pdf_path.to_path_buf();
        let text = match tokio::task::spawn_blocking(move || extract_text(&source)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                tracing::warn!(pdf = %pdf_path.display(), "PDF中没有可提取的文本");
                return None;
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "本地PDF转换失败");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "本地PDF转换任务异常");
                return None;
            }
        };

        let md_path = output_file(pdf_path, output_dir);
        match tokio::fs::write(&md_path, text).await {
            Ok(()) => Some(md_path),
            Err(e) => {
                tracing::error!(path = %md_path.display(), error = %e, "写入转换结果失败");
                None
            }
        }
    }
}
