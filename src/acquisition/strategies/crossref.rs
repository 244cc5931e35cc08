use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{download_to, pdf_path, require_doi, trim_base};
use crate::acquisition::{AcquisitionError, PdfStrategy};

/// 从CrossRef元数据的 `link` 列表中找 `application/pdf`
pub struct CrossrefStrategy {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WorkEnvelope {
    message: Work,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    link: Vec<WorkLink>,
}

#[derive(Debug, Deserialize)]
struct WorkLink {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "content-type", default)]
    content_type: Option<String>,
}

impl CrossrefStrategy {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
        }
    }
}

#[async_trait]
impl PdfStrategy for CrossrefStrategy {
    fn name(&self) -> &'static str {
        "CrossRef"
    }

    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let doi = require_doi(identifier)?;
        let envelope: WorkEnvelope = self
            .http
            .get(format!("{}/works/{}", self.base_url, doi))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let link = envelope
            .message
            .link
            .into_iter()
            .find(|l| l.content_type.as_deref() == Some("application/pdf"))
            .ok_or(AcquisitionError::NoPdfLink)?;
        download_to(&self.http, &link.url, &pdf_path(output_dir, title)).await
    }
}
