use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{download_to, pdf_path, require_doi, trim_base};
use crate::acquisition::{AcquisitionError, PdfStrategy};

/// Giiisp 文献聚合接口
pub struct GiiispStrategy {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GiiispSearch {
    #[serde(default)]
    success: bool,
    pdf_url: Option<String>,
}

impl GiiispStrategy {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
        }
    }
}

#[async_trait]
impl PdfStrategy for GiiispStrategy {
    fn name(&self) -> &'static str {
        "Giiisp"
    }

    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let doi = require_doi(identifier)?;
        let search: GiiispSearch = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("doi", doi)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let pdf_url = search
            .pdf_url
            .filter(|url| search.success && !url.is_empty())
            .ok_or(AcquisitionError::NoPdfLink)?;
        download_to(&self.http, &pdf_url, &pdf_path(output_dir, title)).await
    }
}
