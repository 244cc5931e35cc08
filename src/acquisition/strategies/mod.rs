//! 各下载来源的实现

use std::path::{Path, PathBuf};

use crate::config::AcquisitionConfig;
use crate::search::ArxivSearchEngine;

use super::{AcquisitionError, PdfStrategy};

mod arxiv;
mod crossref;
mod giiisp;
mod scholar;
mod scihub;
mod unpaywall;

pub use arxiv::ArxivStrategy;
pub use crossref::CrossrefStrategy;
pub use giiisp::GiiispStrategy;
pub use scholar::ScholarStrategy;
pub use scihub::SciHubStrategy;
pub use unpaywall::UnpaywallStrategy;

/// 默认的下载顺序
pub fn default_chain(http: reqwest::Client, config: &AcquisitionConfig) -> Vec<Box<dyn PdfStrategy>> {
    vec![
        Box::new(UnpaywallStrategy::new(
            http.clone(),
            &config.unpaywall_base_url,
            &config.unpaywall_email,
        )),
        Box::new(ArxivStrategy::new(
            http.clone(),
            &config.arxiv_base_url,
            ArxivSearchEngine::with_client(http.clone(), &config.arxiv_api_url),
        )),
        Box::new(ScholarStrategy::new(http.clone(), &config.scholar_base_url)),
        Box::new(SciHubStrategy::new(http.clone(), &config.scihub_base_url)),
        Box::new(CrossrefStrategy::new(http.clone(), &config.crossref_base_url)),
        Box::new(GiiispStrategy::new(http, &config.giiisp_base_url)),
    ]
}

/// DOI形如 `10.xxxx/...`，其余标识符（例如arXiv条目URL）返回None
pub(crate) fn as_doi(identifier: &str) -> Option<&str> {
    let trimmed = identifier.trim();
    let trimmed = trimmed
        .strip_prefix("https://doi.org/")
        .or_else(|| trimmed.strip_prefix("doi:"))
        .unwrap_or(trimmed);
    trimmed.starts_with("10.").then_some(trimmed)
}

pub(crate) fn require_doi(identifier: &str) -> Result<&str, AcquisitionError> {
    as_doi(identifier)
        .ok_or_else(|| AcquisitionError::NotApplicable(format!("'{}' 不是DOI", identifier)))
}

pub(crate) fn pdf_path(output_dir: &Path, title: &str) -> PathBuf {
    output_dir.join(format!("{}.pdf", title))
}

/// 下载URL内容并写入 `path`
pub(crate) async fn download_to(
    http: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<PathBuf, AcquisitionError> {
    tracing::debug!(url, path = %path.display(), "下载文件");
    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    tokio::fs::write(path, &bytes).await?;
    Ok(path.to_path_buf())
}

/// 去掉末尾的 `/`
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_doi() {
        assert_eq!(as_doi("10.1088/1674-4527/19/9/133"), Some("10.1088/1674-4527/19/9/133"));
        assert_eq!(as_doi("https://doi.org/10.1000/xyz"), Some("10.1000/xyz"));
        assert_eq!(as_doi("doi:10.1000/xyz"), Some("10.1000/xyz"));
        assert_eq!(as_doi("http://arxiv.org/abs/1906.07403v1"), None);
    }

    #[test]
    fn test_default_chain_order() {
        let chain = default_chain(reqwest::Client::new(), &AcquisitionConfig::default());
        let names: Vec<_> = chain.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["Unpaywall", "arXiv", "Google Scholar", "Sci-Hub", "CrossRef", "Giiisp"]
        );
    }
}
