use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{download_to, pdf_path, require_doi, trim_base};
use crate::acquisition::{AcquisitionError, PdfStrategy};

/// 通过Unpaywall查询DOI的开放获取版本
pub struct UnpaywallStrategy {
    http: reqwest::Client,
    base_url: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    #[serde(default)]
    is_oa: bool,
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    url_for_pdf: Option<String>,
}

impl UnpaywallStrategy {
    pub fn new(http: reqwest::Client, base_url: &str, email: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            email: email.to_string(),
        }
    }
}

#[async_trait]
impl PdfStrategy for UnpaywallStrategy {
    fn name(&self) -> &'static str {
        "Unpaywall"
    }

    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let doi = require_doi(identifier)?;
        let response: UnpaywallResponse = self
            .http
            .get(format!("{}/{}", self.base_url, doi))
            .query(&[("email", &self.email)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let pdf_url = response
            .best_oa_location
            .filter(|_| response.is_oa)
            .and_then(|location| location.url_for_pdf)
            .ok_or(AcquisitionError::NoPdfLink)?;

        download_to(&self.http, &pdf_url, &pdf_path(output_dir, title)).await
    }
}
