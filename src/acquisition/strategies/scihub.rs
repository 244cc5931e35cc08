use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};

use super::{download_to, pdf_path, require_doi, trim_base};
use crate::acquisition::{AcquisitionError, PdfStrategy};

/// 镜像站点兜底：页面中内嵌的 `embed`/`iframe` 指向PDF
pub struct SciHubStrategy {
    http: reqwest::Client,
    base_url: String,
}

impl SciHubStrategy {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
        }
    }

    /// 提取内嵌PDF地址，补全协议相对和站内相对链接
    fn embedded_pdf_url(&self, html: &str) -> Result<Option<String>, AcquisitionError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("embed[src], iframe[src]")
            .map_err(|e| AcquisitionError::Parse(e.to_string()))?;

        let Some(src) = document
            .select(&selector)
            .filter_map(|el| el.value().attr("src"))
            .next()
        else {
            return Ok(None);
        };

        let src = src.split('#').next().unwrap_or(src);
        let url = if let Some(rest) = src.strip_prefix("//") {
            format!("https://{}", rest)
        } else if src.starts_with('/') {
            format!("{}{}", self.base_url, src)
        } else {
            src.to_string()
        };
        Ok(Some(url))
    }
}

#[async_trait]
impl PdfStrategy for SciHubStrategy {
    fn name(&self) -> &'static str {
        "Sci-Hub"
    }

    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let doi = require_doi(identifier)?;
        let body = self
            .http
            .get(format!("{}/{}", self.base_url, doi))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let pdf_url = self
            .embedded_pdf_url(&body)?
            .ok_or(AcquisitionError::NoPdfLink)?;
        download_to(&self.http, &pdf_url, &pdf_path(output_dir, title)).await
    }
}
