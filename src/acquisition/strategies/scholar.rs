use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};

use super::{download_to, pdf_path, trim_base};
use crate::acquisition::{AcquisitionError, PdfStrategy};

/// 在Google Scholar搜索结果中寻找 `[PDF]` 链接
pub struct ScholarStrategy {
    http: reqwest::Client,
    base_url: String,
}

impl ScholarStrategy {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
        }
    }
}

/// 返回第一个文本包含 `[PDF]` 的链接
pub(crate) fn first_pdf_link(html: &str) -> Result<Option<String>, AcquisitionError> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").map_err(|e| AcquisitionError::Parse(e.to_string()))?;
    Ok(document
        .select(&anchors)
        .find(|a| a.text().collect::<String>().contains("[PDF]"))
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string))
}

#[async_trait]
impl PdfStrategy for ScholarStrategy {
    fn name(&self) -> &'static str {
        "Google Scholar"
    }

    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let body = self
            .http
            .get(format!("{}/scholar", self.base_url))
            .query(&[("q", identifier)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let pdf_url = first_pdf_link(&body)?.ok_or(AcquisitionError::NoPdfLink)?;
        tracing::debug!(url = %pdf_url, "找到PDF链接");
        download_to(&self.http, &pdf_url, &pdf_path(output_dir, title)).await
    }
}
