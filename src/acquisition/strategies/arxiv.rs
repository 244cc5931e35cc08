use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{as_doi, download_to, pdf_path, trim_base};
use crate::acquisition::{AcquisitionError, PdfStrategy};
use crate::search::arxiv::arxiv_id_from_url;
use crate::search::{ArxivSearchEngine, PaperSearchEngine};

/// 从arXiv下载：标识符里带arXiv ID时直接使用，否则按标题检索最相关的一篇
pub struct ArxivStrategy {
    http: reqwest::Client,
    base_url: String,
    search: ArxivSearchEngine,
}

impl ArxivStrategy {
    pub fn new(http: reqwest::Client, base_url: &str, search: ArxivSearchEngine) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            search,
        }
    }

    async fn resolve_id(&self, identifier: &str, title: &str) -> Result<String, AcquisitionError> {
        if let Some(id) = arxiv_id_from_identifier(identifier) {
            return Ok(id.to_string());
        }

        let records = self
            .search
            .fetch_page(title, 0, 1)
            .await
            .map_err(|e| AcquisitionError::Parse(e.to_string()))?;
        let first = records.into_iter().next().ok_or(AcquisitionError::NoPdfLink)?;
        let url = first.pdf_url.ok_or(AcquisitionError::NoPdfLink)?;
        Ok(arxiv_id_from_url(&url).to_string())
    }
}

/// arXiv DOI 前缀，例如 `10.48550/arXiv.1706.03762`
const ARXIV_DOI_PREFIX: &str = "10.48550/arxiv.";

/// 只识别arXiv条目URL和arXiv DOI，其他标识符返回None
fn arxiv_id_from_identifier(identifier: &str) -> Option<&str> {
    let identifier = identifier.trim();
    let lower = identifier.to_ascii_lowercase();
    if lower.contains("arxiv.org/abs/") || lower.contains("arxiv.org/pdf/") {
        return Some(arxiv_id_from_url(identifier));
    }
    let doi = as_doi(identifier)?;
    doi.get(..ARXIV_DOI_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(ARXIV_DOI_PREFIX))
        .map(|_| &doi[ARXIV_DOI_PREFIX.len()..])
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl PdfStrategy for ArxivStrategy {
    fn name(&self) -> &'static str {
        "arXiv"
    }

    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let id = self.resolve_id(identifier, title).await?;
        tracing::debug!(arxiv_id = %id, "解析到arXiv ID");
        let url = format!("{}/pdf/{}", self.base_url, id);
        download_to(&self.http, &url, &pdf_path(output_dir, title)).await
    }
}
