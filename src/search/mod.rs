//! 论文检索：在单一检索引擎之上提供有界重试、线性退避与整体超时

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::SearchConfig;
use crate::types::PaperRecord;

pub mod arxiv;

pub use arxiv::ArxivSearchEngine;

/// 单次检索的结果上限
pub const MAX_RESULTS_PER_QUERY: usize = 100;
/// 多关键词批量检索时每个关键词的上限
pub const MAX_RESULTS_PER_KEYWORD: usize = 50;

/// 论文元数据检索引擎，按页返回记录
#[async_trait]
pub trait PaperSearchEngine: Send + Sync {
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        page_size: usize,
    ) -> Result<Vec<PaperRecord>>;
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("检索 '{query}' 失败，已尝试 {attempts} 次: {last_error}")]
    SearchExhausted {
        query: String,
        attempts: u32,
        last_error: String,
    },
}

/// 检索适配器
#[derive(Clone)]
pub struct SourceAdapter {
    engine: Arc<dyn PaperSearchEngine>,
    config: SearchConfig,
}

impl SourceAdapter {
    pub fn new(engine: Arc<dyn PaperSearchEngine>, config: SearchConfig) -> Self {
        Self { engine, config }
    }

    /// 检索单个查询。仅当所有尝试都失败时返回 [`SearchError::SearchExhausted`]。
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Vec<PaperRecord>, SearchError> {
        let max_results = if max_results > MAX_RESULTS_PER_QUERY {
            tracing::warn!(
                requested = max_results,
                limit = MAX_RESULTS_PER_QUERY,
                "限制搜索结果数量以避免过载"
            );
            MAX_RESULTS_PER_QUERY
        } else {
            max_results
        };

        let attempts = max_retries.max(1);
        let backoff_unit = Duration::from_millis(self.config.backoff_unit_ms);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            tracing::info!(query, max_results, attempt, attempts, "🔍 开始检索论文");
            match self.run_attempt(query, max_results, timeout).await {
                Ok(papers) => {
                    tracing::info!(query, count = papers.len(), "✅ 成功获取论文");
                    return Ok(papers);
                }
                Err(e) => {
                    tracing::error!(query, attempt, attempts, error = %e, "检索失败");
                    last_error = e.to_string();
                    if attempt < attempts {
                        let wait = backoff_unit * attempt;
                        tracing::info!(wait_ms = wait.as_millis() as u64, "等待后重试");
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        Err(SearchError::SearchExhausted {
            query: query.to_string(),
            attempts,
            last_error,
        })
    }

    /// 单次尝试：逐条收集结果，超时后返回已收集的部分。失败时本次收集的结果全部丢弃。
    async fn run_attempt(
        &self,
        query: &str,
        max_results: usize,
        timeout: Duration,
    ) -> Result<Vec<PaperRecord>> {
        let started = Instant::now();
        let fetch_delay = Duration::from_millis(self.config.fetch_delay_ms);
        let page_size = self.config.page_size.clamp(1, MAX_RESULTS_PER_QUERY);
        let mut papers = Vec::with_capacity(max_results);
        let mut start = 0;

        'pages: while papers.len() < max_results {
            if started.elapsed() > timeout {
                tracing::warn!(query, count = papers.len(), "检索超时，返回已获取的结果");
                break;
            }

            let wanted = page_size.min(max_results - papers.len());
            let page = self.engine.fetch_page(query, start, wanted).await?;
            let fetched = page.len();

            for paper in page {
                if started.elapsed() > timeout {
                    tracing::warn!(query, count = papers.len(), "检索超时，返回已获取的结果");
                    break 'pages;
                }
                papers.push(paper);
                if papers.len() >= max_results {
                    break 'pages;
                }
                tokio::time::sleep(fetch_delay).await;
            }

            if fetched < wanted {
                break;
            }
            start += fetched;
        }

        Ok(papers)
    }

    /// 多关键词批量检索。单个关键词失败只记录日志，不影响其余关键词。
    pub async fn search_paper(&self, keywords: &[String], limit: usize) -> Vec<PaperRecord> {
        let limit = if limit > MAX_RESULTS_PER_KEYWORD {
            tracing::warn!(
                requested = limit,
                limit = MAX_RESULTS_PER_KEYWORD,
                "限制单个关键词的检索数量"
            );
            MAX_RESULTS_PER_KEYWORD
        } else {
            limit
        };

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let mut collected = Vec::new();
        for keyword in keywords {
            match self
                .search(keyword, limit, timeout, self.config.max_retries)
                .await
            {
                Ok(papers) => {
                    tracing::info!(keyword = %keyword, count = papers.len(), "检索到相关论文");
                    collected.extend(papers);
                }
                Err(e) => {
                    tracing::error!(keyword = %keyword, error = %e, "检索关键词失败，跳过");
                }
            }
        }

        tracing::info!(total = collected.len(), "总共检索到论文");
        collected
    }

    /// 使用配置中的超时与重试次数检索
    pub async fn search_with_defaults(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperRecord>, SearchError> {
        self.search(
            query,
            max_results,
            Duration::from_secs(self.config.timeout_seconds),
            self.config.max_retries,
        )
        .await
    }
}
